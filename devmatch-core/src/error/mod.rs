//! Error types shared by the devmatch crates.
//!
//! Most of the engine returns concrete, distinguished errors (e.g. the
//! `DataSetError` of `devmatch-data`). The types found here are the glue
//! used where the concrete cause matters less than the fact that
//! something went wrong: [`BoxError`], [`OpaqueError`] and the
//! [`ErrorContext`] extension trait.

use std::error::Error as StdError;

/// Alias for a type-erased error type.
pub type BoxError = Box<dyn StdError + Send + Sync>;

mod opaque;
pub use opaque::OpaqueError;

mod context;
pub use context::ErrorContext;
