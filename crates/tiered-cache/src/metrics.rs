//! Cache performance monitoring and metrics

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cache statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from this tier's own entries
    pub hits: u64,
    /// Lookups served by the parent tier
    pub parent_hits: u64,
    /// Lookups served by reloading a persisted value from the backend
    pub reloads: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Values stored through `put`
    pub stores: u64,
    /// Entries removed by trimming
    pub evictions: u64,
    /// Evicted entries handed down to the parent tier
    pub demotions: u64,
    /// Number of resident entries
    pub entry_count: usize,
    /// Sum of resident entry sizes
    pub size: u64,
    /// Trim target
    pub max_size: u64,
    /// Timestamp of cache creation
    pub created_at: DateTime<Utc>,
}

impl CacheStats {
    /// Lookups that returned a value
    pub fn total_hits(&self) -> u64 {
        self.hits + self.parent_hits + self.reloads
    }

    /// Calculate hit rate as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits() + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.total_hits() as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage (0.0 to 100.0)
    pub fn miss_rate(&self) -> f64 {
        if self.total_hits() + self.misses == 0 {
            0.0
        } else {
            100.0 - self.hit_rate()
        }
    }

    /// Fill percentage relative to the trim target
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.size as f64 / self.max_size as f64) * 100.0
        }
    }
}

/// Thread-safe cache metrics tracker
#[derive(Debug)]
pub struct CacheMetrics {
    hits: AtomicU64,
    parent_hits: AtomicU64,
    reloads: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
    demotions: AtomicU64,
    created_at: DateTime<Utc>,
}

impl CacheMetrics {
    /// Create new cache metrics
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            parent_hits: AtomicU64::new(0),
            reloads: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            demotions: AtomicU64::new(0),
            created_at: Utc::now(),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parent_hit(&self) {
        self.parent_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction; `demoted` when the value moved to a parent tier
    pub fn record_eviction(&self, demoted: bool) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        if demoted {
            self.demotions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current statistics snapshot, with occupancy supplied by the cache
    pub fn snapshot(&self, entry_count: usize, size: u64, max_size: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            parent_hits: self.parent_hits.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            entry_count,
            size,
            max_size,
            created_at: self.created_at,
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.parent_hits.store(0, Ordering::Relaxed);
        self.reloads.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.demotions.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let metrics = CacheMetrics::new();
        for _ in 0..50 {
            metrics.record_hit();
        }
        for _ in 0..25 {
            metrics.record_parent_hit();
        }
        for _ in 0..25 {
            metrics.record_miss();
        }

        let stats = metrics.snapshot(0, 0, 10);
        assert_eq!(stats.total_hits(), 75);
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(stats.miss_rate(), 25.0);
    }

    #[test]
    fn test_empty_rates_are_zero() {
        let stats = CacheMetrics::new().snapshot(0, 0, 0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 0.0);
        assert_eq!(stats.utilization(), 0.0);
    }

    #[test]
    fn test_record_eviction_counts_demotions() {
        let metrics = CacheMetrics::new();
        metrics.record_eviction(false);
        metrics.record_eviction(true);

        let stats = metrics.snapshot(3, 40, 50);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.demotions, 1);
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.utilization(), 80.0);
    }

    #[test]
    fn test_reset() {
        let metrics = CacheMetrics::new();
        metrics.record_store();
        metrics.record_reload();
        metrics.reset();

        let stats = metrics.snapshot(0, 0, 0);
        assert_eq!(stats.stores, 0);
        assert_eq!(stats.reloads, 0);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheMetrics::new().snapshot(1, 2, 3);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["entry_count"], 1);
        assert_eq!(json["max_size"], 3);
    }
}
