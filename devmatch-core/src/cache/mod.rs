//! Least-recently-used cache placed in front of entity lookups.
//!
//! The [`LruCache`] keeps its values in a hash map behind a read-write lock
//! and its recency order in a separately locked [`RecencyList`]. A hit only
//! takes the shared map lock followed by a short exclusive lock to move the
//! key to the head of the list. A miss runs the loader without holding any
//! lock.
//!
//! Two threads missing on the same key at the same time may both run the
//! loader. Only the first inserted value is retained and returned to both,
//! and both count as a miss. Loaders are expected to be pure functions of
//! immutable data, so this costs duplicate work and never duplicate state.

use ahash::RandomState;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

mod list;
use list::RecencyList;

mod stats;
pub use stats::CacheStats;
use stats::CacheCounters;

#[derive(Debug)]
struct Entry<V> {
    slot: usize,
    value: V,
}

/// Generic LRU cache with loader based population.
///
/// See [the module level documentation](self) for the concurrency contract.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: RwLock<HashMap<K, Entry<V>, RandomState>>,
    recency: Mutex<RecencyList<K>>,
    counters: CacheCounters,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new [`LruCache`] holding at most `capacity` entries.
    ///
    /// A capacity of `0` creates a pass-through cache that loads every request.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: RwLock::new(HashMap::with_capacity_and_hasher(
                capacity,
                RandomState::new(),
            )),
            recency: Mutex::new(RecencyList::with_capacity(capacity)),
            counters: CacheCounters::default(),
        }
    }

    /// Maximum amount of entries retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Amount of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recency.lock().len()
    }

    /// Returns `true` if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key` or load, insert and return it.
    ///
    /// Errors returned by the loader are passed on as-is and leave the
    /// cache untouched.
    pub fn get_or_load<F, E>(&self, key: &K, loader: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        self.counters.request();

        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        self.counters.miss();
        let value = loader(key)?;
        if self.capacity == 0 {
            return Ok(value);
        }
        Ok(self.insert_loaded(key.clone(), value))
    }

    /// Return the cached value for `key`, if any, without loading.
    ///
    /// This counts as a request, and a miss when the key is absent.
    pub fn get(&self, key: &K) -> Option<V> {
        self.counters.request();
        let value = self.lookup(key);
        if value.is_none() {
            self.counters.miss();
        }
        value
    }

    /// Insert a value, replacing a previously cached one.
    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        let mut recency = self.recency.lock();
        let mut map = self.map.write();
        if let Some(entry) = map.get_mut(&key) {
            recency.touch(entry.slot, &key, now);
            entry.value = value;
            return;
        }
        let slot = recency.push_front(key.clone(), now);
        map.insert(key, Entry { slot, value });
        self.evict_overflow(&mut recency, &mut map);
    }

    /// Remove all entries and reset the statistics.
    pub fn reset(&self) {
        let mut recency = self.recency.lock();
        let mut map = self.map.write();
        recency.clear();
        map.clear();
        self.counters.reset();
    }

    /// Remove all entries not accessed within `max_idle`,
    /// returning how many were removed.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut recency = self.recency.lock();
        let mut removed = 0;
        while recency
            .back_touched()
            .is_some_and(|touched| now.saturating_duration_since(touched) > max_idle)
        {
            let Some(key) = recency.pop_back() else {
                break;
            };
            self.map.write().remove(&key);
            removed += 1;
        }
        if removed > 0 {
            tracing::trace!("lru cache: purged {removed} idle entries (max idle: {max_idle:?})");
        }
        removed
    }

    /// Snapshot of the request and miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Percentage of requests that were not served from the cache.
    #[must_use]
    pub fn percentage_misses(&self) -> f64 {
        self.stats().percentage_misses()
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let (slot, value) = {
            let map = self.map.read();
            let entry = map.get(key)?;
            (entry.slot, entry.value.clone())
        };
        self.recency.lock().touch(slot, key, Instant::now());
        Some(value)
    }

    fn insert_loaded(&self, key: K, value: V) -> V {
        let now = Instant::now();
        let mut recency = self.recency.lock();
        let mut map = self.map.write();
        if let Some(entry) = map.get(&key) {
            // lost a load race, keep what is already there
            recency.touch(entry.slot, &key, now);
            return entry.value.clone();
        }
        let slot = recency.push_front(key.clone(), now);
        map.insert(
            key,
            Entry {
                slot,
                value: value.clone(),
            },
        );
        self.evict_overflow(&mut recency, &mut map);
        value
    }

    fn evict_overflow(
        &self,
        recency: &mut RecencyList<K>,
        map: &mut HashMap<K, Entry<V>, RandomState>,
    ) {
        while recency.len() > self.capacity {
            match recency.pop_back() {
                Some(evicted) => {
                    map.remove(&evicted);
                    self.counters.eviction();
                }
                None => break,
            }
        }
    }
}
