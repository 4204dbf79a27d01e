//! Cache configuration

use serde::{Deserialize, Serialize};

use crate::{error::CacheError, policy::PolicyKind, Result};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Size capacity, in the unit reported by the storage backend
    pub capacity: u64,
    /// Fraction of `capacity` that trimming brings the cache back under
    pub threshold: f64,
    /// Replacement policy
    pub policy: PolicyKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            threshold: 0.75,
            policy: PolicyKind::Lru,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with the default policy
    pub fn new(capacity: u64, threshold: f64) -> Self {
        Self {
            capacity,
            threshold,
            ..Self::default()
        }
    }

    /// Replace the policy
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Check capacity and threshold
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::invalid_config(
                "capacity",
                "must be greater than zero",
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(CacheError::invalid_config(
                "threshold",
                format!("must be in (0, 1), got {}", self.threshold),
            ));
        }
        Ok(())
    }

    /// Size the cache is trimmed back under: `capacity * threshold`.
    ///
    /// Sizes are integral, so flooring keeps `size > max_size` equivalent to
    /// comparing against the exact product.
    pub fn max_size(&self) -> u64 {
        (self.capacity as f64 * self.threshold).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.threshold, 0.75);
        assert_eq!(config.policy, PolicyKind::Lru);
        assert_eq!(config.max_size(), 750);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_size_floors() {
        assert_eq!(CacheConfig::new(100, 0.5).max_size(), 50);
        assert_eq!(CacheConfig::new(10, 0.75).max_size(), 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            CacheConfig::new(0, 0.5).validate(),
            Err(CacheError::InvalidConfig { ref field, .. }) if field == "capacity"
        ));
        for threshold in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(matches!(
                CacheConfig::new(10, threshold).validate(),
                Err(CacheError::InvalidConfig { ref field, .. }) if field == "threshold"
            ));
        }
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"capacity": 4096, "policy": "lfu"}"#).unwrap();
        assert_eq!(config.capacity, 4096);
        assert_eq!(config.threshold, 0.75);
        assert_eq!(config.policy, PolicyKind::Lfu);
    }
}
