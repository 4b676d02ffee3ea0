use crate::{DeviceStore, Handler, LegacyDevice};
use devmatch_core::{
    Detector,
    cache::{CacheStats, LruCache},
    resolve::{Values, resolve_inherited},
};
use serde::Serialize;
use std::{collections::BTreeMap, convert::Infallible, fmt, sync::Arc, time::Duration};

/// Device found by one handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyResult {
    #[serde(skip)]
    pub device: usize,
    pub device_id: Arc<str>,
    pub handler: Arc<str>,
    pub score: usize,
    pub confidence: u8,
}

/// All results for a target string, best first.
#[derive(Debug, Clone)]
pub struct LegacyDetection {
    store: Arc<DeviceStore>,
    target: Arc<str>,
    results: Arc<[LegacyResult]>,
    unknown: Arc<str>,
}

impl LegacyDetection {
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Results ordered by score, then confidence, then device id.
    #[must_use]
    pub fn results(&self) -> &[LegacyResult] {
        &self.results
    }

    #[must_use]
    pub fn best(&self) -> Option<&LegacyResult> {
        self.results.first()
    }

    #[must_use]
    pub fn device(&self) -> Option<&Arc<LegacyDevice>> {
        self.best().and_then(|best| self.store.get(best.device))
    }

    /// Id of the best device, the unknown value when nothing was found.
    #[must_use]
    pub fn device_id(&self) -> &str {
        self.best()
            .map_or(&*self.unknown, |best| &*best.device_id)
    }

    /// Values of a capability of the best device, inherited from its
    /// fall back chain when the device does not set it.
    #[must_use]
    pub fn values(&self, capability: &str) -> Values {
        let Some(best) = self.best() else {
            return Values::unknown(self.unknown.clone());
        };
        match resolve_inherited(&*self.store, best.device, capability) {
            Ok(Some(values)) => values,
            Ok(None) => Values::unknown(self.unknown.clone()),
            Err(never) => match never {},
        }
    }

    /// Serializable overview holding every capability of the best device.
    #[must_use]
    pub fn summary(&self) -> LegacySummary {
        let values = match self.best() {
            Some(_) => self
                .store
                .capability_names()
                .iter()
                .map(|name| (name.to_string(), self.values(name)))
                .filter(|(_, values)| !values.is_unknown())
                .collect(),
            None => BTreeMap::new(),
        };
        LegacySummary {
            target: self.target.to_string(),
            device_id: self.device_id().to_owned(),
            results: self.results.to_vec(),
            values,
        }
    }
}

/// Overview of a [`LegacyDetection`].
#[derive(Debug, Clone, Serialize)]
pub struct LegacySummary {
    pub target: String,
    pub device_id: String,
    pub results: Vec<LegacyResult>,
    pub values: BTreeMap<String, Values>,
}

/// The handler based detector.
///
/// Every handler whose expressions accept a target string scores its
/// devices, and all results are merged into one ranking: lower scores
/// first, then higher handler confidence, then lower device id.
pub struct LegacyEngine {
    store: Arc<DeviceStore>,
    handlers: Vec<Handler>,
    cache: Option<LruCache<Arc<str>, LegacyDetection>>,
    unknown: Arc<str>,
}

impl fmt::Debug for LegacyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyEngine")
            .field("devices", &self.store.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl LegacyEngine {
    /// Create the engine, assigning the devices of `store` to handlers.
    pub fn new(store: DeviceStore, handlers: impl IntoIterator<Item = Handler>) -> Self {
        let mut handlers: Vec<Handler> = handlers.into_iter().collect();
        for handler in &mut handlers {
            handler.assign(&store);
        }
        tracing::debug!(
            "legacy engine: {} handlers over {} devices",
            handlers.len(),
            store.len()
        );
        Self {
            store: Arc::new(store),
            handlers,
            cache: None,
            unknown: Arc::from("Unknown"),
        }
    }

    /// Keep up to `capacity` detections in an LRU cache, `0` disables it.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| LruCache::new(capacity));
        self
    }

    #[must_use]
    pub fn with_unknown_value(mut self, value: impl Into<Arc<str>>) -> Self {
        self.unknown = value.into();
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.store
    }

    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Handlers whose expressions accept `target`.
    pub fn eligible<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Handler> + 'a {
        self.handlers
            .iter()
            .filter(move |handler| handler.can_handle(target))
    }

    pub fn detect(&self, target: &str) -> LegacyDetection {
        match &self.cache {
            Some(cache) => match cache.get_or_load(&Arc::from(target), |key| {
                Ok::<_, Infallible>(self.run(key.clone()))
            }) {
                Ok(detection) => detection,
                Err(never) => match never {},
            },
            None => self.run(Arc::from(target)),
        }
    }

    fn run(&self, target: Arc<str>) -> LegacyDetection {
        let mut results: Vec<LegacyResult> = Vec::new();
        for handler in self.eligible(&target) {
            for scored in handler.score(&target) {
                let Some(device) = self.store.get(scored.device) else {
                    continue;
                };
                results.push(LegacyResult {
                    device: scored.device,
                    device_id: Arc::from(device.id()),
                    handler: handler.name().clone(),
                    score: scored.score,
                    confidence: handler.confidence(),
                });
            }
        }
        results.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| b.confidence.cmp(&a.confidence))
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        let mut seen = ahash::HashSet::default();
        results.retain(|result| seen.insert(result.device));
        tracing::trace!("legacy engine: {} results for target", results.len());
        LegacyDetection {
            store: self.store.clone(),
            target,
            results: results.into(),
            unknown: self.unknown.clone(),
        }
    }

    /// Drop cached detections not used for `max_idle`.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |cache| cache.purge_idle(max_idle))
    }

    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(LruCache::stats)
    }
}

impl Detector for LegacyEngine {
    type Detection = LegacyDetection;
    type Error = Infallible;

    fn detect(&self, target: &str) -> Result<LegacyDetection, Infallible> {
        Ok(Self::detect(self, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandlerKind, RegexTree, Segment, device::WURFL_ROOT};

    fn engine() -> LegacyEngine {
        let store = DeviceStore::new([
            LegacyDevice::new("generic")
                .with_parent(WURFL_ROOT)
                .with_capability("is_wireless_device", "false"),
            LegacyDevice::new("nokia_generic")
                .with_parent("generic")
                .with_capability("brand_name", "Nokia")
                .with_capability("is_wireless_device", "true"),
            LegacyDevice::new("nokia_6600")
                .with_parent("nokia_generic")
                .with_target("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s")
                .with_capability("model_name", "6600"),
            LegacyDevice::new("nokia_6630")
                .with_parent("nokia_generic")
                .with_target("Nokia6630/1.0 (2.39.15) SymbianOS/8.0")
                .with_capability("model_name", "6630"),
        ])
        .unwrap();
        let nokia = Handler::new("nokia", HandlerKind::EditDistance, 5)
            .with_can_handle(RegexTree::new("^Nokia").unwrap());
        let symbian = Handler::new(
            "symbian",
            HandlerKind::RegexSegment {
                segments: vec![Segment::new(r"SymbianOS/([\d.]+)", 4).unwrap()],
            },
            9,
        )
        .with_can_handle(RegexTree::new("SymbianOS").unwrap());
        LegacyEngine::new(store, [nokia, symbian])
    }

    #[test]
    fn best_device_inherits_capabilities() {
        let engine = engine();
        let detection = engine.detect("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s");
        assert_eq!(detection.device_id(), "nokia_6600");
        let best = detection.best().unwrap();
        assert_eq!(best.score, 0);
        // both handlers score 0, the more confident one ranks first
        assert_eq!(&*best.handler, "symbian");
        assert_eq!(detection.values("brand_name").first(), "Nokia");
        assert_eq!(detection.values("is_wireless_device").first(), "true");
        assert!(detection.values("resolution_width").is_unknown());
        assert_eq!(detection.results().len(), 1);
    }

    #[test]
    fn results_are_merged_across_handlers() {
        let engine = engine();
        assert_eq!(engine.eligible("Nokia6630/2.0 SymbianOS/8.0").count(), 2);
        let detection = engine.detect("Nokia6630/2.0 SymbianOS/8.0");
        assert_eq!(detection.device_id(), "nokia_6630");
        assert_eq!(detection.values("model_name").first(), "6630");
        let scores: Vec<_> = detection.results().iter().map(|r| r.score).collect();
        assert!(scores.is_sorted());
    }

    #[test]
    fn no_eligible_handler_is_unknown() {
        let engine = engine().with_unknown_value("n/a");
        let detection = engine.detect("Mozilla/5.0 (X11; Linux x86_64)");
        assert!(detection.best().is_none());
        assert_eq!(detection.device_id(), "n/a");
        assert_eq!(detection.values("brand_name").to_string(), "n/a");
        assert!(detection.summary().values.is_empty());
    }

    #[test]
    fn cached_detections() {
        let engine = engine().with_cache_capacity(4);
        for _ in 0..3 {
            let detection = Detector::detect(&engine, "Nokia6600/1.0").unwrap();
            assert_eq!(detection.device_id(), "nokia_6600");
        }
        let stats = engine.cache_stats().unwrap();
        assert_eq!((stats.requests, stats.misses), (3, 1));
    }

    #[test]
    fn summary_serializes() {
        let detection = engine().detect("Nokia6600/1.0 (4.09.1) SymbianOS/7.0s");
        let json = serde_json::to_value(detection.summary()).unwrap();
        assert_eq!(json["device_id"], "nokia_6600");
        assert_eq!(json["values"]["model_name"], "6600");
        assert_eq!(json["results"][0]["handler"], "symbian");
    }
}
