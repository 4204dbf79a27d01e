//! Cache replacement policies
//!
//! A policy maps an entry's [`EntryStats`] to a score. When a cache trims, it
//! sorts its entries by ascending score and evicts from the front until the
//! size target is met, so the lowest score goes first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::EntryStats;

/// Cache replacement policy trait
pub trait EvictionPolicy: Send + Sync {
    /// Eviction score; lower scores are evicted first
    fn score(&self, stats: &EntryStats) -> i128;

    /// Get policy name for debugging
    fn name(&self) -> &str;
}

/// Discard least recently used entries first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn score(&self, stats: &EntryStats) -> i128 {
        stats.last_access_time.as_nanos() as i128
    }

    fn name(&self) -> &str {
        "lru"
    }
}

/// Discard most recently used entries first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MruPolicy;

impl EvictionPolicy for MruPolicy {
    fn score(&self, stats: &EntryStats) -> i128 {
        -(stats.last_access_time.as_nanos() as i128)
    }

    fn name(&self) -> &str {
        "mru"
    }
}

/// Discard least frequently used entries first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LfuPolicy;

impl EvictionPolicy for LfuPolicy {
    fn score(&self, stats: &EntryStats) -> i128 {
        i128::from(stats.access_count)
    }

    fn name(&self) -> &str {
        "lfu"
    }
}

/// Coarse random replacement: entries with an even access count go first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomReplacementPolicy;

impl EvictionPolicy for RandomReplacementPolicy {
    fn score(&self, stats: &EntryStats) -> i128 {
        i128::from(stats.access_count % 2)
    }

    fn name(&self) -> &str {
        "rr"
    }
}

pub const POLICY_LRU: LruPolicy = LruPolicy;
pub const POLICY_MRU: MruPolicy = MruPolicy;
pub const POLICY_LFU: LfuPolicy = LfuPolicy;
pub const POLICY_RR: RandomReplacementPolicy = RandomReplacementPolicy;

/// Built-in policies, selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Lru,
    Mru,
    Lfu,
    Rr,
}

impl PolicyKind {
    /// Build the policy object for this kind
    pub fn build(self) -> Arc<dyn EvictionPolicy> {
        match self {
            PolicyKind::Lru => Arc::new(LruPolicy),
            PolicyKind::Mru => Arc::new(MruPolicy),
            PolicyKind::Lfu => Arc::new(LfuPolicy),
            PolicyKind::Rr => Arc::new(RandomReplacementPolicy),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn stats(last_access_ms: u64, access_count: u64) -> EntryStats {
        EntryStats {
            stored_size: 1,
            creation_time: Duration::ZERO,
            last_access_time: Duration::from_millis(last_access_ms),
            access_count,
        }
    }

    #[test]
    fn test_lru_prefers_oldest() {
        let old = stats(10, 5);
        let new = stats(20, 1);
        assert!(POLICY_LRU.score(&old) < POLICY_LRU.score(&new));
    }

    #[test]
    fn test_mru_prefers_newest() {
        let old = stats(10, 5);
        let new = stats(20, 1);
        assert!(POLICY_MRU.score(&new) < POLICY_MRU.score(&old));
    }

    #[test]
    fn test_lfu_prefers_least_accessed() {
        let hot = stats(10, 9);
        let cold = stats(20, 2);
        assert!(POLICY_LFU.score(&cold) < POLICY_LFU.score(&hot));
    }

    #[test]
    fn test_rr_uses_access_parity() {
        assert_eq!(POLICY_RR.score(&stats(0, 4)), 0);
        assert_eq!(POLICY_RR.score(&stats(0, 7)), 1);
    }

    #[test]
    fn test_policy_kind_builds_matching_policy() {
        assert_eq!(PolicyKind::Lru.build().name(), "lru");
        assert_eq!(PolicyKind::Mru.build().name(), "mru");
        assert_eq!(PolicyKind::Lfu.build().name(), "lfu");
        assert_eq!(PolicyKind::Rr.build().name(), "rr");
    }

    #[test]
    fn test_policy_kind_serde() {
        let kind: PolicyKind = serde_json::from_str("\"mru\"").unwrap();
        assert_eq!(kind, PolicyKind::Mru);
        assert_eq!(serde_json::to_string(&PolicyKind::Lfu).unwrap(), "\"lfu\"");
    }
}
