//! Node trie matching for the devmatch device detection engine.
//!
//! A [`Provider`] wraps a loaded [`DataSet`](devmatch_data::DataSet) and
//! turns target strings, request headers or device ids into a [`Match`].
//! Matching tries the exact, numeric, nearest and closest stages in that
//! order and never fails on its input: a target nothing can be found for produces a match
//! with [`Method::None`](devmatch_core::Method::None) whose properties are
//! all unknown.
//!
//! ```
//! use devmatch_core::{ComponentKind, Method};
//! use devmatch_data::{DataSetConfig, FormatVersion, builder::DataSetBuilder};
//! use devmatch_match::Provider;
//!
//! let data_set = DataSetBuilder::new("doc", jiff::civil::date(2026, 1, 1))
//!     .with_component(ComponentKind::Browser, 1)
//!     .with_property("BrowserName", ComponentKind::Browser)
//!     .with_profile(1, ComponentKind::Browser, None, [])
//!     .with_profile(2, ComponentKind::Browser, None, [("BrowserName", "Chrome")])
//!     .with_signature("Mozilla/5.0 Chrome/120", [2], 1)
//!     .build_data_set(FormatVersion::PatternV32, &DataSetConfig::default())
//!     .unwrap();
//!
//! let provider = Provider::new(data_set);
//! let found = provider.match_str("Mozilla/5.0 Chrome/120").unwrap();
//! assert_eq!(found.method(), Method::Exact);
//! assert_eq!(&*found.value("BrowserName").unwrap(), "Chrome");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

mod config;
pub use config::{DEFAULT_PRIMARY_HEADER, DEFAULT_SECONDARY_HEADERS, ProviderConfig};

mod device_id;
pub use device_id::{DEVICE_ID_SEPARATOR, DeviceId, InvalidDeviceIdError};

mod maintenance;
pub use maintenance::spawn_cache_maintenance;

mod matcher;

mod provider;
pub use provider::{MatchError, Provider};

mod result;
pub use result::{Match, MatchSummary};

mod trie;

#[cfg(test)]
mod test_data;
