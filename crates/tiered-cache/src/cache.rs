//! Cache engine with size accounting, threshold trimming and parent tiers

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    clock::{Clock, MonotonicClock},
    config::CacheConfig,
    entry::{CacheEntry, EntryStats},
    error::CacheError,
    footprint::Footprint,
    metrics::{CacheMetrics, CacheStats},
    policy::EvictionPolicy,
    storage::{CacheKey, CacheStorage, MemoryStorage},
    Result,
};

/// One level of a cache hierarchy.
///
/// A [`Cache`] delegates misses, removals and evicted values to its parent
/// tier through this trait, so tiers with different storage backends can be
/// chained as long as they agree on key and value types.
pub trait CacheTier<K, V>: Send + Sync {
    /// Look a key up in this tier and, on a miss, in the tiers above it
    fn get(&self, key: &K) -> Result<Option<V>>;

    /// Store a value in this tier, taking it over from the tiers above
    fn put(&self, key: K, value: V) -> Result<()>;

    /// Remove a key from this tier and the tiers above it
    fn remove(&self, key: &K) -> Result<()>;

    /// Drop all entries; see [`Cache::clear`]
    fn clear(&self, clear_parent: bool) -> Result<()>;

    /// Evict entries until `size + extra_size` fits the trim target
    fn trim(&self, extra_size: u64) -> Result<()>;

    /// Whether the key is resident in this tier (parents are not consulted)
    fn contains(&self, key: &K) -> bool;

    /// Number of resident entries
    fn len(&self) -> usize;

    /// Sum of resident entry sizes
    fn size(&self) -> u64;

    /// Trim target
    fn max_size(&self) -> u64;
}

struct CacheState<K, S> {
    index: HashMap<K, CacheEntry<K, S>>,
    /// Resident keys; sorted by policy score on every trim
    order: Vec<K>,
    size: u64,
}

impl<K, S> CacheState<K, S> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            order: Vec::new(),
            size: 0,
        }
    }
}

/// Size-bounded cache over a pluggable storage backend.
///
/// Every public operation holds the cache's lock for its full duration,
/// including calls into the parent tier. Locks are only ever taken child
/// first, then parent.
///
/// ```
/// use tiered_cache::{Cache, CacheConfig, MemoryStorage};
///
/// let cache =
///     Cache::<&str, MemoryStorage<Vec<u8>>>::in_memory(CacheConfig::new(100, 0.5)).unwrap();
/// cache.put("a", vec![0u8; 30]).unwrap();
/// cache.put("b", vec![1u8; 30]).unwrap();
///
/// // 60 bytes exceed the 50 byte target, so the least recently used entry went
/// assert_eq!(cache.get(&"a").unwrap(), None);
/// assert_eq!(cache.get(&"b").unwrap(), Some(vec![1u8; 30]));
/// assert_eq!(cache.size(), 30);
/// ```
pub struct Cache<K, S: CacheStorage<K>> {
    storage: S,
    capacity: u64,
    threshold: f64,
    max_size: u64,
    policy: Arc<dyn EvictionPolicy>,
    clock: Arc<dyn Clock>,
    parent: Option<Arc<dyn CacheTier<K, S::Value>>>,
    metrics: CacheMetrics,
    state: Mutex<CacheState<K, S::Stored>>,
}

impl<K, S> Cache<K, S>
where
    K: CacheKey,
    S: CacheStorage<K>,
{
    /// Create a single-tier cache
    pub fn new(storage: S, config: CacheConfig) -> Result<Self> {
        CacheBuilder::new().storage(storage).config(config).build()
    }

    /// Create a cache that overflows into `parent`
    pub fn with_parent(
        storage: S,
        config: CacheConfig,
        parent: Arc<dyn CacheTier<K, S::Value>>,
    ) -> Result<Self> {
        CacheBuilder::new()
            .storage(storage)
            .config(config)
            .parent(parent)
            .build()
    }

    /// Retrieve a value.
    ///
    /// Looks in this tier first, then in the parent tier (without moving the
    /// value down), then asks the backend whether it can reload the key on its
    /// own. A reloaded entry becomes resident here.
    pub fn get(&self, key: &K) -> Result<Option<S::Value>> {
        let mut state = self.state.lock();
        self.get_locked(&mut state, key)
    }

    /// Store a value, replacing any previous value for the key.
    ///
    /// The key is removed from the parent tier first, so it is resident in at
    /// most one tier afterwards. May trim.
    pub fn put(&self, key: K, value: S::Value) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(parent) = &self.parent {
            // This tier now owns the freshest copy
            parent.remove(&key)?;
        }
        if self.discard_locked(&mut state, &key)? {
            debug!("Discarded previous value for key {:?}", key);
        }

        let entry = CacheEntry::store(&self.storage, self.clock.as_ref(), key, value)?;
        debug!(
            "Stored value for key {:?} ({} units in {} storage)",
            entry.key(),
            entry.stored_size(),
            self.storage.name()
        );
        self.metrics.record_store();
        self.add_locked(&mut state, entry)
    }

    /// Remove a key from the parent tier and from this tier. Absent keys are a no-op.
    pub fn remove(&self, key: &K) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(parent) = &self.parent {
            parent.remove(key)?;
        }
        if self.discard_locked(&mut state, key)? {
            debug!("Removed key {:?}", key);
        }
        Ok(())
    }

    /// Evict entries in ascending policy-score order until
    /// `size + extra_size <= max_size`.
    ///
    /// Evicted values move to the parent tier when there is one and are
    /// dropped otherwise. Candidates are chosen and evicted under a single
    /// lock hold, so with `extra_size == 0` the cache is within its target
    /// when this returns `Ok`.
    pub fn trim(&self, extra_size: u64) -> Result<()> {
        let mut state = self.state.lock();
        self.trim_locked(&mut state, extra_size)
    }

    /// Remove every resident entry.
    ///
    /// With `clear_parent`, the parent tier is cleared first and local values
    /// are dropped. Without it, local values are pushed down into the parent
    /// before they leave this tier.
    pub fn clear(&self, clear_parent: bool) -> Result<()> {
        let mut state = self.state.lock();

        if clear_parent {
            if let Some(parent) = &self.parent {
                parent.clear(true)?;
            }
        }

        let keys = state.order.clone();
        for key in keys {
            let Some(mut entry) = Self::detach_locked(&mut state, &key) else {
                continue;
            };
            match &self.parent {
                Some(parent) if !clear_parent => {
                    let value = entry.restore(&self.storage, self.clock.as_ref())?;
                    entry.discard(&self.storage)?;
                    parent.put(key, value)?;
                }
                _ => entry.discard(&self.storage)?,
            }
        }
        debug!("Cleared cache (clear_parent = {})", clear_parent);
        Ok(())
    }

    /// Whether the key is resident in this tier
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().index.contains_key(key)
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of resident entry sizes
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Resident keys, in the order of the last trim followed by later insertions
    pub fn keys(&self) -> Vec<K> {
        self.state.lock().order.clone()
    }

    /// Access statistics of a resident entry
    pub fn entry_stats(&self, key: &K) -> Option<EntryStats> {
        self.state
            .lock()
            .index
            .get(key)
            .map(|entry| *entry.stats())
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Trim target, `capacity * threshold`
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn policy(&self) -> &dyn EvictionPolicy {
        self.policy.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn parent(&self) -> Option<&Arc<dyn CacheTier<K, S::Value>>> {
        self.parent.as_ref()
    }

    /// Get cache metrics
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        self.metrics
            .snapshot(state.index.len(), state.size, self.max_size)
    }

    fn get_locked(
        &self,
        state: &mut CacheState<K, S::Stored>,
        key: &K,
    ) -> Result<Option<S::Value>> {
        if let Some(entry) = state.index.get_mut(key) {
            let value = entry.restore(&self.storage, self.clock.as_ref())?;
            self.metrics.record_hit();
            debug!("Restored value for key {:?} from cache", key);
            return Ok(Some(value));
        }

        if let Some(parent) = &self.parent {
            if let Some(value) = parent.get(key)? {
                self.metrics.record_parent_hit();
                debug!("Restored value for key {:?} from parent cache", key);
                return Ok(Some(value));
            }
        }

        let loaded = CacheEntry::load_by_key(&self.storage, self.clock.as_ref(), key.clone())?;
        if let Some(mut entry) = loaded {
            // Read before inserting: the insertion may trim this very entry
            let value = entry.restore(&self.storage, self.clock.as_ref())?;
            self.metrics.record_reload();
            debug!(
                "Reloaded value for key {:?} from {} storage",
                key,
                self.storage.name()
            );
            self.add_locked(state, entry)?;
            return Ok(Some(value));
        }

        self.metrics.record_miss();
        debug!("Cache miss for key {:?}", key);
        Ok(None)
    }

    fn add_locked(
        &self,
        state: &mut CacheState<K, S::Stored>,
        entry: CacheEntry<K, S::Stored>,
    ) -> Result<()> {
        let key = entry.key().clone();
        state.size += entry.stored_size();
        state.order.push(key.clone());
        state.index.insert(key, entry);

        if state.size > self.max_size {
            self.trim_locked(state, 0)?;
        }
        Ok(())
    }

    /// Take an entry out of the bookkeeping without touching the backend
    fn detach_locked(
        state: &mut CacheState<K, S::Stored>,
        key: &K,
    ) -> Option<CacheEntry<K, S::Stored>> {
        let entry = state.index.remove(key)?;
        state.order.retain(|k| k != key);
        state.size = state.size.saturating_sub(entry.stored_size());
        Some(entry)
    }

    /// Detach and discard; returns whether the key was resident
    fn discard_locked(&self, state: &mut CacheState<K, S::Stored>, key: &K) -> Result<bool> {
        match Self::detach_locked(state, key) {
            Some(entry) => {
                entry.discard(&self.storage)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn eviction_candidates(
        &self,
        state: &mut CacheState<K, S::Stored>,
        extra_size: u64,
    ) -> Vec<K> {
        let CacheState { index, order, size } = state;
        let policy = self.policy.as_ref();

        // Stable: equal scores keep their current relative order
        order.sort_by_cached_key(|key| {
            index
                .get(key)
                .map_or(i128::MIN, |entry| policy.score(entry.stats()))
        });

        let mut remaining = *size;
        let mut candidates = Vec::new();
        for key in order.iter() {
            if remaining.saturating_add(extra_size) <= self.max_size {
                break;
            }
            candidates.push(key.clone());
            remaining =
                remaining.saturating_sub(index.get(key).map_or(0, |entry| entry.stored_size()));
        }
        candidates
    }

    fn trim_locked(&self, state: &mut CacheState<K, S::Stored>, extra_size: u64) -> Result<()> {
        let candidates = self.eviction_candidates(state, extra_size);
        if candidates.is_empty() {
            return Ok(());
        }

        trace!(
            "Trimming {} entries by {} policy (size {}, extra {}, max {})",
            candidates.len(),
            self.policy.name(),
            state.size,
            extra_size,
            self.max_size
        );
        for key in candidates {
            self.evict_locked(state, key)?;
        }
        Ok(())
    }

    fn evict_locked(&self, state: &mut CacheState<K, S::Stored>, key: K) -> Result<()> {
        let Some(mut entry) = Self::detach_locked(state, &key) else {
            return Ok(());
        };

        match &self.parent {
            Some(parent) => {
                let value = entry.restore(&self.storage, self.clock.as_ref())?;
                entry.discard(&self.storage)?;
                debug!("Demoting key {:?} to parent cache", key);
                parent.put(key, value)?;
                self.metrics.record_eviction(true);
            }
            None => {
                entry.discard(&self.storage)?;
                debug!("Evicted key {:?}", key);
                self.metrics.record_eviction(false);
            }
        }
        Ok(())
    }
}

impl<K, V> Cache<K, MemoryStorage<V>>
where
    K: CacheKey,
    V: Footprint + Clone + Send + 'static,
{
    /// Create a single-tier cache over its own fresh in-memory storage
    pub fn in_memory(config: CacheConfig) -> Result<Self> {
        Self::new(MemoryStorage::new(), config)
    }
}

impl<K, S> CacheTier<K, S::Value> for Cache<K, S>
where
    K: CacheKey,
    S: CacheStorage<K>,
{
    fn get(&self, key: &K) -> Result<Option<S::Value>> {
        Cache::get(self, key)
    }

    fn put(&self, key: K, value: S::Value) -> Result<()> {
        Cache::put(self, key, value)
    }

    fn remove(&self, key: &K) -> Result<()> {
        Cache::remove(self, key)
    }

    fn clear(&self, clear_parent: bool) -> Result<()> {
        Cache::clear(self, clear_parent)
    }

    fn trim(&self, extra_size: u64) -> Result<()> {
        Cache::trim(self, extra_size)
    }

    fn contains(&self, key: &K) -> bool {
        Cache::contains(self, key)
    }

    fn len(&self) -> usize {
        Cache::len(self)
    }

    fn size(&self) -> u64 {
        Cache::size(self)
    }

    fn max_size(&self) -> u64 {
        Cache::max_size(self)
    }
}

/// Builder pattern for cache construction
pub struct CacheBuilder<K, S: CacheStorage<K>> {
    config: CacheConfig,
    storage: Option<S>,
    policy: Option<Arc<dyn EvictionPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    parent: Option<Arc<dyn CacheTier<K, S::Value>>>,
}

impl<K, S> CacheBuilder<K, S>
where
    K: CacheKey,
    S: CacheStorage<K>,
{
    /// Create a new cache builder
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            storage: None,
            policy: None,
            clock: None,
            parent: None,
        }
    }

    /// Set cache configuration
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set storage backend (required)
    pub fn storage(mut self, storage: S) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn capacity(mut self, capacity: u64) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Use a custom policy instead of the configured [`PolicyKind`](crate::PolicyKind)
    pub fn policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use a specific clock; by default each cache gets its own [`MonotonicClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Chain the cache to a parent tier
    pub fn parent(mut self, parent: Arc<dyn CacheTier<K, S::Value>>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Build the cache
    pub fn build(self) -> Result<Cache<K, S>> {
        let storage = self
            .storage
            .ok_or_else(|| CacheError::invalid_config("storage", "a storage backend is required"))?;
        self.config.validate()?;

        let policy = self.policy.unwrap_or_else(|| self.config.policy.build());
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Cache {
            storage,
            capacity: self.config.capacity,
            threshold: self.config.threshold,
            max_size: self.config.max_size(),
            policy,
            clock,
            parent: self.parent,
            metrics: CacheMetrics::new(),
            state: Mutex::new(CacheState::new()),
        })
    }
}

impl<K, S> Default for CacheBuilder<K, S>
where
    K: CacheKey,
    S: CacheStorage<K>,
{
    fn default() -> Self {
        Self::new()
    }
}
