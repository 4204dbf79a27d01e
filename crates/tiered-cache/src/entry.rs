//! Per-key bookkeeping records owned by a [`Cache`](crate::Cache)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{clock::Clock, storage::CacheStorage, Result};

/// Access statistics of a resident entry, as seen by eviction policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStats {
    /// Size reported by the storage backend, in the backend's unit
    pub stored_size: u64,
    /// Clock reading when the entry was bound
    pub creation_time: Duration,
    /// Clock reading of the most recent store, load or restore
    pub last_access_time: Duration,
    /// Number of stores, loads and restores
    pub access_count: u64,
}

impl EntryStats {
    fn bound(stored_size: u64, now: Duration) -> Self {
        Self {
            stored_size,
            creation_time: now,
            last_access_time: now,
            access_count: 1,
        }
    }

    fn touch(&mut self, now: Duration) {
        self.last_access_time = now;
        self.access_count += 1;
    }
}

/// A key bound to its stored representation.
///
/// Entries only exist in the bound state: construction stores or loads the
/// value, and [`discard`](Self::discard) consumes the entry.
#[derive(Debug)]
pub struct CacheEntry<K, S> {
    key: K,
    stored: S,
    stats: EntryStats,
}

impl<K, S> CacheEntry<K, S> {
    /// Store `value` and bind the resulting representation to `key`
    pub fn store<B>(storage: &B, clock: &dyn Clock, key: K, value: B::Value) -> Result<Self>
    where
        B: CacheStorage<K, Stored = S> + ?Sized,
    {
        let (stored, stored_size) = storage.store(&key, value)?;
        Ok(Self {
            key,
            stored,
            stats: EntryStats::bound(stored_size, clock.elapsed()),
        })
    }

    /// Bind a representation the backend can rediscover from the key alone.
    ///
    /// Returns `Ok(None)` when the backend has nothing for this key.
    pub fn load_by_key<B>(storage: &B, clock: &dyn Clock, key: K) -> Result<Option<Self>>
    where
        B: CacheStorage<K, Stored = S> + ?Sized,
    {
        if !storage.can_load_by_key(&key) {
            return Ok(None);
        }
        let (stored, stored_size) = storage.load_by_key(&key)?;
        Ok(Some(Self {
            key,
            stored,
            stats: EntryStats::bound(stored_size, clock.elapsed()),
        }))
    }

    /// Read the value back, counting it as an access
    pub fn restore<B>(&mut self, storage: &B, clock: &dyn Clock) -> Result<B::Value>
    where
        B: CacheStorage<K, Stored = S> + ?Sized,
    {
        self.stats.touch(clock.elapsed());
        storage.restore(&self.key, &self.stored)
    }

    /// Release the stored representation; the entry cannot be used afterwards
    pub fn discard<B>(mut self, storage: &B) -> Result<()>
    where
        B: CacheStorage<K, Stored = S> + ?Sized,
    {
        storage.discard(&self.key, &mut self.stored)
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn stored(&self) -> &S {
        &self.stored
    }

    pub fn stats(&self) -> &EntryStats {
        &self.stats
    }

    pub fn stored_size(&self) -> u64 {
        self.stats.stored_size
    }
}
