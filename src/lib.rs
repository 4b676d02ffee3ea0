//! 🔎 devmatch is a device detection engine for the 🦀 Rust language.
//!
//! It identifies the device, operating system and browser behind a user
//! agent string (or a set of request headers) by matching it against a
//! binary signature data set, and returns the properties of the profiles
//! it resolved to.
//!
//! | crate | what it does |
//! |-|-|
//! | [`core`] | errors, the LRU cache, edit distance and the most-frequent filter |
//! | [`data`] | the data set: entities, binary format, memory and streamed backends, builder |
//! | [`matcher`] | the node trie matcher, the [`Provider`] and its [`Match`] results |
//! | `legacy` | the handler based engine over XML, WURFL and trie corpus device data |
//!
//! Matching never fails on its input. A target nothing can be found for
//! results in a [`Match`] with [`Method::None`] whose properties are all
//! `Unknown`; only reading the data set can fail.
//!
//! ```
//! use devmatch::{
//!     ComponentKind, Method, Provider,
//!     data::{DataSetConfig, FormatVersion, builder::DataSetBuilder},
//! };
//!
//! let data_set = DataSetBuilder::new("readme", jiff::civil::date(2026, 1, 1))
//!     .with_component(ComponentKind::Hardware, 1)
//!     .with_property("HardwareVendor", ComponentKind::Hardware)
//!     .with_profile(1, ComponentKind::Hardware, None, [])
//!     .with_profile(2, ComponentKind::Hardware, None, [("HardwareVendor", "Samsung")])
//!     .with_signature("Mozilla/5.0 (Linux; Android 14; SM-G991B)", [2], 10)
//!     .build_data_set(FormatVersion::PatternV32, &DataSetConfig::default())
//!     .unwrap();
//!
//! let provider = Provider::new(data_set);
//!
//! let found = provider.match_str("Mozilla/5.0 (Linux; Android 14; SM-G991B)").unwrap();
//! assert_eq!(found.method(), Method::Exact);
//! assert_eq!(&*found.value("HardwareVendor").unwrap(), "Samsung");
//!
//! let unknown = provider.match_str("").unwrap();
//! assert_eq!(unknown.method(), Method::None);
//! assert_eq!(&*unknown.value("HardwareVendor").unwrap(), "Unknown");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(inline)]
pub use ::devmatch_core as core;

#[doc(inline)]
pub use ::devmatch_data as data;

#[doc(inline)]
pub use ::devmatch_match as matcher;

#[cfg(feature = "legacy")]
#[cfg_attr(docsrs, doc(cfg(feature = "legacy")))]
#[doc(inline)]
pub use ::devmatch_legacy as legacy;

pub use ::devmatch_core::{ComponentKind, Detector, Method};
pub use ::devmatch_data::{BackendKind, DataSet, DataSetConfig, DataSetError};
pub use ::devmatch_match::{DeviceId, Match, MatchError, Provider, ProviderConfig};
