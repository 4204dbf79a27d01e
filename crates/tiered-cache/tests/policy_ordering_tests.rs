//! Eviction order tests for the built-in replacement policies

use std::{sync::Arc, time::Duration};

use proptest::prelude::*;
use tiered_cache::{Cache, CacheBuilder, CacheConfig, ManualClock, MemoryStorage, PolicyKind};

type TestCache = Cache<u32, MemoryStorage<Vec<u8>>>;

fn cache_with_clock(capacity: u64, threshold: f64, policy: PolicyKind) -> (TestCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = CacheBuilder::new()
        .storage(MemoryStorage::new())
        .config(CacheConfig::new(capacity, threshold).with_policy(policy))
        .clock(clock.clone())
        .build()
        .expect("Failed to build cache");
    (cache, clock)
}

#[test]
fn test_concrete_lru_scenario() {
    let cache = TestCache::in_memory(CacheConfig::new(100, 0.5)).expect("Failed to build cache");
    assert_eq!(cache.max_size(), 50);

    cache.put(1, vec![b'a'; 30]).unwrap();
    cache.put(2, vec![b'b'; 30]).unwrap();

    assert_eq!(cache.get(&1).unwrap(), None);
    assert_eq!(cache.get(&2).unwrap(), Some(vec![b'b'; 30]));
}

#[test]
fn test_random_replacement_evicts_even_access_counts_first() {
    let (cache, clock) = cache_with_clock(100, 0.5, PolicyKind::Rr);

    cache.put(1, vec![0u8; 20]).unwrap(); // access count 1
    cache.put(2, vec![0u8; 20]).unwrap();
    clock.advance(Duration::from_millis(1));
    cache.get(&2).unwrap(); // access count 2 -> parity 0

    cache.put(3, vec![0u8; 20]).unwrap(); // access count 1

    assert!(cache.contains(&1));
    assert!(!cache.contains(&2));
    assert!(cache.contains(&3));
}

#[test]
fn test_equal_scores_keep_insertion_order() {
    // The clock never moves, so every LRU score ties
    let (cache, _) = cache_with_clock(100, 0.5, PolicyKind::Lru);
    for key in 0..5 {
        cache.put(key, vec![0u8; 10]).unwrap();
    }
    cache.put(5, vec![0u8; 10]).unwrap();

    // 60 > 50: exactly one entry goes, the first one inserted
    assert_eq!(cache.keys(), vec![1, 2, 3, 4, 5]);
}

proptest! {
    /// Property: With distinct access times, LRU evicts every entry with an
    /// older access before any entry with a newer one.
    #[test]
    fn prop_lru_evicts_oldest_first(
        access_order in Just((0u32..10).collect::<Vec<_>>()).prop_shuffle(),
        overflow in 1usize..8,
    ) {
        let (cache, clock) = cache_with_clock(200, 0.5, PolicyKind::Lru);
        for key in 0..10u32 {
            cache.put(key, vec![0u8; 10]).unwrap();
        }
        // Re-touch every key in a random order; the last touched is newest
        for key in &access_order {
            clock.advance(Duration::from_millis(1));
            cache.get(key).unwrap();
        }

        // 100 units resident, target 100: force out `overflow` entries
        cache.trim(overflow as u64 * 10).unwrap();

        let evicted: Vec<u32> = access_order[..overflow].to_vec();
        for key in &access_order {
            prop_assert_eq!(
                cache.contains(key),
                !evicted.contains(key),
                "key {} residency wrong for access order {:?}",
                key,
                access_order
            );
        }
    }
}
