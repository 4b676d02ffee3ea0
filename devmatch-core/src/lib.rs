//! Core building blocks of the devmatch device detection engine.
//!
//! This crate holds the pieces shared by every matching path:
//!
//! - the generic [`LruCache`](cache::LruCache) placed in front of entity
//!   lookups and match results;
//! - the scoring primitives in [`algo`]: a bounded edit distance and the
//!   most-frequent filter merging candidate lists;
//! - the [`ComponentKind`] and [`Method`] vocabulary;
//! - property resolution across primary/secondary devices and parent
//!   chains in [`resolve`];
//! - the [`Detector`] seam shared by the trie and the legacy handler paths;
//! - the [`error`] glue types.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod algo;
pub mod cache;
pub mod error;
pub mod resolve;

mod component;
pub use component::ComponentKind;

mod detect;
pub use detect::Detector;

mod method;
pub use method::{Method, MethodCounts};
