//! json configuration shared by the commands

use devmatch_core::error::{BoxError, ErrorContext as _};
use devmatch_data::DataSetConfig;
use devmatch_match::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options read from `--config`, every field is optional.
///
/// ```json
/// {
///   "data_set": { "backend": "stream", "pool_size": 4 },
///   "provider": { "cache_capacity": 5000, "unknown_value": "n/a" }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub data_set: DataSetConfig,
    pub provider: ProviderConfig,
}

impl CliConfig {
    /// Read the config file, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, BoxError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parse config file {}", path.display()))?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }
}
