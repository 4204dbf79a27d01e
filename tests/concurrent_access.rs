//! Concurrent access to shared cache tiers

use std::{sync::Arc, thread};

use tiered_cache::{Cache, CacheConfig, MemoryStorage, PolicyKind};
use tracing::info;

type SharedCache = Cache<u64, MemoryStorage<Vec<u8>>>;

const THREADS: u64 = 8;
const OPS_PER_THREAD: u64 = 200;

#[test]
fn test_concurrent_put_get_keeps_size_bounded() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    for policy in [PolicyKind::Lru, PolicyKind::Mru, PolicyKind::Lfu, PolicyKind::Rr] {
        let cache = Arc::new(
            SharedCache::in_memory(CacheConfig::new(4096, 0.5).with_policy(policy))
                .expect("Failed to build cache"),
        );

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..OPS_PER_THREAD {
                        let key = (t * 31 + i) % 64;
                        cache.put(key, vec![t as u8; 64]).unwrap();
                        if let Some(value) = cache.get(&((key + 7) % 64)).unwrap() {
                            assert_eq!(value.len(), 64);
                        }
                        assert!(cache.size() <= cache.max_size());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Worker thread panicked");
        }

        let stats = cache.stats();
        info!("{:?} after concurrent run: {:?}", policy, stats);
        assert!(stats.size <= stats.max_size);
        assert_eq!(stats.size, cache.len() as u64 * 64);
        assert_eq!(stats.stores, THREADS * OPS_PER_THREAD);
    }
}

#[test]
fn test_concurrent_children_share_one_parent() {
    let parent = Arc::new(
        SharedCache::in_memory(CacheConfig::new(1_000_000, 0.9)).expect("Failed to build parent"),
    );

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let parent = Arc::clone(&parent);
            thread::spawn(move || {
                let child = SharedCache::with_parent(
                    MemoryStorage::new(),
                    CacheConfig::new(512, 0.5),
                    parent,
                )
                .expect("Failed to build child");

                // Disjoint key ranges per child
                let base = t * 1000;
                for i in 0..50 {
                    child.put(base + i, vec![i as u8; 32]).unwrap();
                }
                for i in 0..50 {
                    assert_eq!(child.get(&(base + i)).unwrap(), Some(vec![i as u8; 32]));
                }
                child.len()
            })
        })
        .collect();

    let resident_in_children: usize = handles
        .into_iter()
        .map(|handle| handle.join().expect("Worker thread panicked"))
        .sum();

    assert_eq!(parent.len() + resident_in_children, 200);
    assert!(parent.size() <= parent.max_size());
}
