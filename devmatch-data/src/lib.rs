//! Signature data set of the devmatch device detection engine.
//!
//! A [`DataSet`] owns the read-only reference data the matcher works on:
//! interned strings, properties and their values, profiles, signatures and
//! the node tries built over the signature patterns. It is loaded once from
//! a pattern file and can be shared by any number of threads.
//!
//! # Backends
//!
//! Two storage backends implement the same lookups:
//!
//! - [`BackendKind::Memory`] decodes every entity while loading;
//! - [`BackendKind::Stream`] decodes entities on demand through a bounded
//!   pool of seekable readers over the source.
//!
//! Both sit behind one LRU cache per entity kind, see [`CacheConfig`].
//!
//! # Building
//!
//! Pattern files are produced by the [`DataSetBuilder`](builder::DataSetBuilder)
//! from a declarative [`DataSetSource`](builder::DataSetSource), in the
//! [`PatternV31`](FormatVersion::PatternV31) or
//! [`PatternV32`](FormatVersion::PatternV32) layout.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod builder;
pub mod entity;
pub mod format;
pub mod index;

mod error;
pub use error::{DataFormatError, DataSetError, PoolTimeoutError, UnsupportedVersionError};

mod dataset;
pub use dataset::{BackendKind, DataSet, DataSetConfig};

mod source;
pub use source::{CacheConfig, EntityCacheStats, ReadSeek, ReaderFactory};

#[doc(inline)]
pub use format::FormatVersion;
