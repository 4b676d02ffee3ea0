use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header holding the target string.
pub const DEFAULT_PRIMARY_HEADER: &str = "User-Agent";

/// Headers some browsers and proxies use for the user agent of the
/// underlying device, in order of preference.
pub const DEFAULT_SECONDARY_HEADERS: [&str; 3] =
    ["Device-Stock-UA", "X-Device-User-Agent", "X-OperaMini-Phone-UA"];

/// Options of a [`Provider`](crate::Provider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    cache_capacity: usize,
    max_signatures: usize,
    closest_max_distance: Option<usize>,
    unknown_value: Arc<str>,
    primary_header: String,
    secondary_headers: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10_000,
            max_signatures: 200,
            closest_max_distance: None,
            unknown_value: Arc::from("Unknown"),
            primary_header: DEFAULT_PRIMARY_HEADER.to_owned(),
            secondary_headers: DEFAULT_SECONDARY_HEADERS.map(str::to_owned).to_vec(),
        }
    }
}

impl ProviderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the target string to match cache, `0` disables it.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn set_cache_capacity(&mut self, capacity: usize) -> &mut Self {
        self.cache_capacity = capacity;
        self
    }

    /// Maximum amount of candidate signatures kept by the most frequent
    /// filter and scored by the nearest and closest stages.
    #[must_use]
    pub fn max_signatures(&self) -> usize {
        self.max_signatures
    }

    #[must_use]
    pub fn with_max_signatures(mut self, max: usize) -> Self {
        self.max_signatures = max;
        self
    }

    pub fn set_max_signatures(&mut self, max: usize) -> &mut Self {
        self.max_signatures = max;
        self
    }

    /// Largest edit distance accepted by the closest stage.
    #[must_use]
    pub fn closest_max_distance(&self) -> Option<usize> {
        self.closest_max_distance
    }

    #[must_use]
    pub fn with_closest_max_distance(mut self, max: usize) -> Self {
        self.closest_max_distance = Some(max);
        self
    }

    pub fn set_closest_max_distance(&mut self, max: Option<usize>) -> &mut Self {
        self.closest_max_distance = max;
        self
    }

    /// Value reported for properties nothing could be resolved for.
    #[must_use]
    pub fn unknown_value(&self) -> &Arc<str> {
        &self.unknown_value
    }

    #[must_use]
    pub fn with_unknown_value(mut self, value: impl Into<Arc<str>>) -> Self {
        self.unknown_value = value.into();
        self
    }

    pub fn set_unknown_value(&mut self, value: impl Into<Arc<str>>) -> &mut Self {
        self.unknown_value = value.into();
        self
    }

    #[must_use]
    pub fn primary_header(&self) -> &str {
        &self.primary_header
    }

    #[must_use]
    pub fn with_primary_header(mut self, name: impl Into<String>) -> Self {
        self.primary_header = name.into();
        self
    }

    pub fn set_primary_header(&mut self, name: impl Into<String>) -> &mut Self {
        self.primary_header = name.into();
        self
    }

    #[must_use]
    pub fn secondary_headers(&self) -> &[String] {
        &self.secondary_headers
    }

    #[must_use]
    pub fn with_secondary_headers(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.set_secondary_headers(names);
        self
    }

    pub fn set_secondary_headers(
        &mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.secondary_headers = names.into_iter().map(Into::into).collect();
        self
    }
}
