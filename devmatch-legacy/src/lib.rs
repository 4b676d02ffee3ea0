//! Handler based device matching for the devmatch device detection engine.
//!
//! The legacy path predates the node trie. Devices come with the target
//! string they were recorded with and inherit capabilities from a parent
//! device. A set of [`Handler`]s each claims the targets its regular
//! expressions accept and scores its devices with one strategy of
//! [`HandlerKind`]. The [`LegacyEngine`] merges the results of every
//! eligible handler.
//!
//! Device data is imported from XML, either in the devmatch layout or in
//! the WURFL layout, see [`xml`], or from a binary trie corpus, see
//! [`corpus`].
//!
//! ```
//! use devmatch_legacy::{DeviceStore, Handler, HandlerKind, LegacyDevice, LegacyEngine, RegexTree};
//!
//! let store = DeviceStore::new([
//!     LegacyDevice::new("generic").with_capability("brand_name", "Unbranded"),
//!     LegacyDevice::new("nokia_6600")
//!         .with_parent("generic")
//!         .with_target("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s"),
//! ])
//! .unwrap();
//! let nokia = Handler::new("nokia", HandlerKind::EditDistance, 5)
//!     .with_can_handle(RegexTree::new("^Nokia").unwrap());
//!
//! let engine = LegacyEngine::new(store, [nokia]);
//! let detection = engine.detect("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s Profile/MIDP-2.0");
//! assert_eq!(detection.device_id(), "nokia_6600");
//! assert_eq!(detection.values("brand_name").first(), "Unbranded");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod corpus;
pub mod device;
pub mod xml;

mod error;
pub use error::LegacyImportError;

#[doc(inline)]
pub use device::{DeviceStore, LegacyDevice};

mod handler;
pub use handler::{Handler, HandlerKind, RegexTree, Segment};

mod engine;
pub use engine::{LegacyDetection, LegacyEngine, LegacyResult, LegacySummary};
