//! # Tiered Cache
//!
//! Generic, size-bounded caching engine with pluggable storage backends,
//! configurable replacement policies and optional parent tiers.
//!
//! ## Features
//!
//! - **Pluggable storage**: in-memory and file-backed storage out of the box,
//!   anything else through [`CacheStorage`]
//! - **Size accounting**: sizes are reported by the backend; crossing
//!   `capacity * threshold` trims the cache
//! - **Replacement policies**: LRU, MRU, LFU and a coarse random replacement,
//!   or any [`EvictionPolicy`]
//! - **Cache hierarchies**: a cache can overflow into a parent [`CacheTier`],
//!   e.g. a small memory tier in front of a large file tier
//! - **Rediscovery**: file-backed caches find values persisted by earlier
//!   instances by key alone

pub mod cache;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod footprint;
pub mod metrics;
pub mod policy;
pub mod storage;

pub use cache::{Cache, CacheBuilder, CacheTier};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::CacheConfig;
pub use entry::{CacheEntry, EntryStats};
pub use error::{CacheError, IoOperation};
pub use footprint::{pixel_footprint, Footprint};
pub use metrics::{CacheMetrics, CacheStats};
pub use policy::{
    EvictionPolicy, LfuPolicy, LruPolicy, MruPolicy, PolicyKind, RandomReplacementPolicy,
    POLICY_LFU, POLICY_LRU, POLICY_MRU, POLICY_RR,
};
pub use storage::{CacheKey, CacheStorage, FileStorage, MemorySlot, MemoryStorage};

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
