use devmatch::core::cache::LruCache;
use std::{
    convert::Infallible,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

#[test]
fn evicted_key_is_loaded_again() {
    let cache = LruCache::new(2);
    let loads = AtomicUsize::new(0);
    let load = |key: &&'static str| {
        loads.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Infallible>(key.to_uppercase())
    };

    for key in ["a", "b", "c"] {
        cache.get_or_load(&key, load).unwrap();
    }
    assert_eq!(loads.load(Ordering::SeqCst), 3);
    assert!(cache.get(&"a").is_none());
    assert_eq!(cache.get(&"b").as_deref(), Some("B"));

    assert_eq!(cache.get_or_load(&"a", load).unwrap(), "A");
    assert_eq!(loads.load(Ordering::SeqCst), 4);
    // "b" was read after "c" was inserted, so "c" made way for "a"
    assert!(cache.get(&"c").is_none());
    assert_eq!(cache.get(&"b").as_deref(), Some("B"));

    let stats = cache.stats();
    assert_eq!(stats.evictions, 2);
    assert_eq!(stats.misses, 6);
}

#[test]
fn loader_errors_leave_other_keys_alone() {
    let cache: LruCache<u32, String> = LruCache::new(4);
    cache.insert(1, "one".to_owned());

    let err = cache
        .get_or_load(&2, |key| Err::<String, _>(format!("no value for {key}")))
        .unwrap_err();
    assert_eq!(err, "no value for 2");
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&1).as_deref(), Some("one"));

    let loaded = cache
        .get_or_load(&2, |key| Ok::<_, String>(key.to_string()))
        .unwrap();
    assert_eq!(loaded, "2");
    assert_eq!(cache.len(), 2);
}

#[test]
fn concurrent_misses_load_at_least_once() {
    let cache: LruCache<u32, u32> = LruCache::new(16);
    let loads = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for key in 0..16 {
                    let value = cache
                        .get_or_load(&key, |key| {
                            loads.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, Infallible>(key * 10)
                        })
                        .unwrap();
                    assert_eq!(value, key * 10);
                }
            });
        }
    });

    // racing misses may each run the loader, but every key is loaded
    let loads = loads.load(Ordering::SeqCst);
    assert!((16..=16 * 8).contains(&loads), "{loads} loads");
    assert_eq!(cache.len(), 16);
    assert_eq!(cache.stats().requests, 16 * 8);
    assert_eq!(cache.stats().misses as usize, loads);
}

#[test]
fn idle_entries_are_purged() {
    let cache: LruCache<u32, u32> = LruCache::new(4);
    cache.insert(1, 1);
    cache.insert(2, 2);
    std::thread::sleep(Duration::from_millis(20));
    cache.insert(3, 3);

    assert_eq!(cache.purge_idle(Duration::from_millis(10)), 2);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&3), Some(3));
}
