use crate::{
    DeviceId, InvalidDeviceIdError, Match, ProviderConfig,
    matcher::Matcher,
    result::{Profiles, complete_profiles},
};
use devmatch_core::{
    Detector, Method, MethodCounts,
    cache::{CacheStats, LruCache},
};
use devmatch_data::{DataSet, DataSetError};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

/// Error returned by device id lookups.
#[derive(Debug)]
pub enum MatchError {
    DataSet(DataSetError),
    InvalidDeviceId(InvalidDeviceIdError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataSet(err) => write!(f, "data set error: {err}"),
            Self::InvalidDeviceId(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DataSet(err) => Some(err),
            Self::InvalidDeviceId(err) => Some(err),
        }
    }
}

impl From<DataSetError> for MatchError {
    fn from(err: DataSetError) -> Self {
        Self::DataSet(err)
    }
}

impl From<InvalidDeviceIdError> for MatchError {
    fn from(err: InvalidDeviceIdError) -> Self {
        Self::InvalidDeviceId(err)
    }
}

/// Detects devices using the node trie of a [`DataSet`].
///
/// A provider is shared between threads as-is, matching takes `&self`.
/// Results of [`Provider::match_str`] are kept in an LRU cache keyed on the
/// target string when the configured capacity is not zero.
pub struct Provider {
    data_set: Arc<DataSet>,
    config: ProviderConfig,
    cache: Option<LruCache<Arc<str>, Match>>,
    counts: MethodCounts,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("data_set", &self.data_set.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Provider {
    /// Create a [`Provider`] with the default [`ProviderConfig`].
    pub fn new(data_set: impl Into<Arc<DataSet>>) -> Self {
        Self::with_config(data_set, ProviderConfig::default())
    }

    pub fn with_config(data_set: impl Into<Arc<DataSet>>, config: ProviderConfig) -> Self {
        let cache = (config.cache_capacity() > 0).then(|| LruCache::new(config.cache_capacity()));
        Self {
            data_set: data_set.into(),
            config,
            cache,
            counts: MethodCounts::default(),
        }
    }

    #[must_use]
    pub fn data_set(&self) -> &Arc<DataSet> {
        &self.data_set
    }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Match a single target string.
    pub fn match_str(&self, target: &str) -> Result<Match, DataSetError> {
        let result = match &self.cache {
            Some(cache) => cache.get_or_load(&Arc::from(target), |key| self.run(key.clone()))?,
            None => self.run(Arc::from(target))?,
        };
        self.counts.record(result.method());
        Ok(result)
    }

    /// Match raw bytes, replacing invalid UTF-8. Results are not cached.
    pub fn match_bytes(&self, target: &[u8]) -> Result<Match, DataSetError> {
        let result = self.run(Arc::from(String::from_utf8_lossy(target)))?;
        self.counts.record(result.method());
        Ok(result)
    }

    /// Match a set of request headers.
    ///
    /// The primary header identifies the device. The first secondary header
    /// present provides the hardware and software profiles, and stands in
    /// for the primary header when that one is missing. Header names are
    /// compared case-insensitively.
    pub fn match_headers<I, K, V>(&self, headers: I) -> Result<Match, DataSetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let headers: Vec<(K, V)> = headers.into_iter().collect();
        let primary = find_header(&headers, self.config.primary_header());
        let secondary = self
            .config
            .secondary_headers()
            .iter()
            .find_map(|name| find_header(&headers, name));

        match (primary, secondary) {
            (Some(primary), Some(secondary)) => {
                let primary = self.match_str(primary)?;
                let secondary = self.match_str(secondary)?;
                tracing::trace!(
                    "provider: secondary header matched with {}",
                    secondary.method()
                );
                Ok(primary.with_secondary(&secondary))
            }
            (Some(target), None) | (None, Some(target)) => self.match_str(target),
            (None, None) => self.match_str(""),
        }
    }

    /// Look up the profiles of a device id as returned by [`Match::device_id`].
    pub fn match_device_id(&self, device_id: &str) -> Result<Match, MatchError> {
        let device_id: DeviceId = device_id.parse()?;
        self.match_parsed_device_id(&device_id)
    }

    /// Look up the profiles of a device id as returned by
    /// [`Match::device_id_bytes`].
    pub fn match_device_id_bytes(&self, device_id: &[u8]) -> Result<Match, MatchError> {
        let device_id = DeviceId::from_bytes(device_id)?;
        self.match_parsed_device_id(&device_id)
    }

    fn match_parsed_device_id(&self, device_id: &DeviceId) -> Result<Match, MatchError> {
        let start = Instant::now();
        let mut profiles = Profiles::new();
        for id in device_id.profile_ids() {
            let profile = self
                .data_set
                .find_profile(*id)?
                .ok_or_else(|| InvalidDeviceIdError::new(format!("unknown profile id {id}")))?;
            if profiles
                .iter()
                .any(|known| known.component() == profile.component())
            {
                return Err(InvalidDeviceIdError::new(format!(
                    "more than one {} profile",
                    profile.component()
                ))
                .into());
            }
            profiles.push(profile);
        }
        let profiles = complete_profiles(&self.data_set, profiles)?;
        Ok(Match::from_profiles(
            self.data_set.clone(),
            profiles,
            start.elapsed(),
            self.config.unknown_value().clone(),
        )?)
    }

    fn run(&self, target: Arc<str>) -> Result<Match, DataSetError> {
        let start = Instant::now();
        let outcome = Matcher::new(&self.data_set, &self.config).run(target.as_bytes())?;
        let elapsed = start.elapsed();
        tracing::trace!(
            "provider: matched with {} (difference: {}) in {elapsed:?}",
            outcome.method,
            outcome.difference
        );
        Match::from_outcome(
            self.data_set.clone(),
            target,
            outcome,
            elapsed,
            self.config.unknown_value().clone(),
        )
    }

    /// Amount of detections made with `method`.
    #[must_use]
    pub fn method_count(&self, method: Method) -> u64 {
        self.counts.get(method)
    }

    #[must_use]
    pub fn detections(&self) -> u64 {
        self.counts.total()
    }

    /// Statistics of the match cache, `None` when caching is disabled.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(LruCache::stats)
    }

    /// Percentage of cached lookups that had to run the matcher.
    #[must_use]
    pub fn percentage_cache_misses(&self) -> f64 {
        self.cache.as_ref().map_or(0.0, LruCache::percentage_misses)
    }

    /// Clear the match cache and the entity caches of the data set.
    pub fn reset_caches(&self) {
        if let Some(cache) = &self.cache {
            cache.reset();
        }
        self.data_set.reset_caches();
    }

    /// Drop cached matches and entities not used for `max_idle`,
    /// returning how many were dropped.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let matches = self
            .cache
            .as_ref()
            .map_or(0, |cache| cache.purge_idle(max_idle));
        matches + self.data_set.purge_idle(max_idle)
    }
}

fn find_header<'h, K, V>(headers: &'h [(K, V)], name: &str) -> Option<&'h str>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    headers
        .iter()
        .find(|(key, _)| key.as_ref().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_ref())
}

impl Detector for Provider {
    type Detection = Match;
    type Error = DataSetError;

    fn detect(&self, target: &str) -> Result<Match, DataSetError> {
        self.match_str(target)
    }
}
