//! Cache storage backends
//!
//! A backend owns the physical medium only. All bookkeeping (sizes, access
//! statistics, which keys are resident) stays in the [`Cache`](crate::Cache)
//! that drives it.

use std::{
    fmt::{Debug, Display},
    fs,
    hash::Hash,
    io::ErrorKind,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::{CacheError, IoOperation},
    footprint::Footprint,
    Result,
};

/// Bounds every cache key satisfies
pub trait CacheKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T: Eq + Hash + Clone + Debug + Send + Sync + 'static> CacheKey for T {}

/// Cache storage trait
///
/// Backends are driven exclusively by the engine that owns them, under that
/// engine's lock, so implementations need no internal synchronization.
pub trait CacheStorage<K>: Send + Sync {
    /// Values accepted by [`store`](Self::store) and produced by [`restore`](Self::restore)
    type Value: Send;
    /// Backend-specific handle to a stored value
    type Stored: Send;

    /// Whether a stored representation can be loaded from the key alone
    fn can_load_by_key(&self, key: &K) -> bool;

    /// Load a stored representation and its size from the key alone.
    ///
    /// Callers must check [`can_load_by_key`](Self::can_load_by_key) first.
    fn load_by_key(&self, key: &K) -> Result<(Self::Stored, u64)>;

    /// Store a value, returning its stored representation and size
    fn store(&self, key: &K, value: Self::Value) -> Result<(Self::Stored, u64)>;

    /// Restore a value from its stored representation
    fn restore(&self, key: &K, stored: &Self::Stored) -> Result<Self::Value>;

    /// Release the medium behind a stored representation
    fn discard(&self, key: &K, stored: &mut Self::Stored) -> Result<()>;

    /// Backend name for logs and errors
    fn name(&self) -> &str;
}

/// Stored representation used by [`MemoryStorage`]
#[derive(Debug, Clone)]
pub struct MemorySlot<K, V> {
    key: K,
    value: Option<V>,
}

impl<K, V> MemorySlot<K, V> {
    /// Key the slot was stored under
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Whether the slot still references its value
    pub fn is_occupied(&self) -> bool {
        self.value.is_some()
    }
}

/// In-memory cache storage
///
/// Values are kept as-is; their size comes from [`Footprint`] unless a custom
/// sizer is supplied. Nothing survives the engine, so
/// [`can_load_by_key`](CacheStorage::can_load_by_key) is always false.
pub struct MemoryStorage<V> {
    sizer: fn(&V) -> u64,
    _values: PhantomData<fn() -> V>,
}

impl<V: Footprint> MemoryStorage<V> {
    /// Create new in-memory storage sized by [`Footprint`]
    pub fn new() -> Self {
        Self::with_sizer(<V as Footprint>::footprint)
    }
}

impl<V> MemoryStorage<V> {
    /// Create in-memory storage with a custom size function
    pub fn with_sizer(sizer: fn(&V) -> u64) -> Self {
        Self {
            sizer,
            _values: PhantomData,
        }
    }

    /// Size a value the way [`store`](CacheStorage::store) would
    pub fn size_of(&self, value: &V) -> u64 {
        (self.sizer)(value)
    }
}

impl<V: Footprint> Default for MemoryStorage<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for MemoryStorage<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage").finish_non_exhaustive()
    }
}

impl<K, V> CacheStorage<K> for MemoryStorage<V>
where
    K: CacheKey,
    V: Clone + Send + 'static,
{
    type Value = V;
    type Stored = MemorySlot<K, V>;

    fn can_load_by_key(&self, _key: &K) -> bool {
        false
    }

    fn load_by_key(&self, _key: &K) -> Result<(Self::Stored, u64)> {
        Err(CacheError::not_supported("load_by_key", "memory"))
    }

    fn store(&self, key: &K, value: V) -> Result<(Self::Stored, u64)> {
        let size = self.size_of(&value);
        let slot = MemorySlot {
            key: key.clone(),
            value: Some(value),
        };
        Ok((slot, size))
    }

    fn restore(&self, key: &K, stored: &Self::Stored) -> Result<V> {
        if *key != stored.key {
            return Err(CacheError::key_mismatch(key, &stored.key));
        }
        // A cleared slot has been discarded and must not be read again
        stored
            .value
            .clone()
            .ok_or_else(|| CacheError::key_mismatch(key, &"<discarded>"))
    }

    fn discard(&self, key: &K, stored: &mut Self::Stored) -> Result<()> {
        if *key != stored.key {
            return Err(CacheError::key_mismatch(key, &stored.key));
        }
        stored.value = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// File-based cache storage
///
/// Each key is stored as one raw byte file at `<root>/<key><extension>`. Keys
/// are not escaped: callers must keep their string forms free of path
/// separators, and two keys with the same string form share one file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    extension: String,
}

impl FileStorage {
    /// Create new file storage under `root`; `extension` includes its dot, e.g. `".bin"`
    pub fn new<P: AsRef<Path>>(root: P, extension: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.into(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File extension appended to every key
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Get file path for a key
    pub fn key_to_path<K: Display + ?Sized>(&self, key: &K) -> PathBuf {
        self.root.join(format!("{}{}", key, self.extension))
    }

    fn file_size(path: &Path) -> Result<u64> {
        fs::metadata(path)
            .map(|metadata| metadata.len())
            .map_err(|e| CacheError::io_error(path.to_path_buf(), IoOperation::Metadata, e))
    }

    fn check_path<K: Display + Debug>(&self, key: &K, stored: &Path) -> Result<PathBuf> {
        let path = self.key_to_path(key);
        if path != stored {
            return Err(CacheError::key_mismatch(key, &stored));
        }
        Ok(path)
    }
}

impl<K> CacheStorage<K> for FileStorage
where
    K: CacheKey + Display,
{
    type Value = Vec<u8>;
    type Stored = PathBuf;

    fn can_load_by_key(&self, key: &K) -> bool {
        self.key_to_path(key).exists()
    }

    fn load_by_key(&self, key: &K) -> Result<(PathBuf, u64)> {
        let path = self.key_to_path(key);
        let size = Self::file_size(&path)?;
        debug!("Found persisted file for key {:?}: {}", key, path.display());
        Ok((path, size))
    }

    fn store(&self, key: &K, value: Vec<u8>) -> Result<(PathBuf, u64)> {
        let path = self.key_to_path(key);

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CacheError::io_error(parent.to_path_buf(), IoOperation::CreateDir, e)
                })?;
            }
        }

        fs::write(&path, &value)
            .map_err(|e| CacheError::io_error(path.clone(), IoOperation::Write, e))?;
        let size = Self::file_size(&path)?;
        Ok((path, size))
    }

    fn restore(&self, key: &K, stored: &PathBuf) -> Result<Vec<u8>> {
        let path = self.check_path(key, stored)?;
        fs::read(&path).map_err(|e| CacheError::io_error(path, IoOperation::Read, e))
    }

    fn discard(&self, key: &K, stored: &mut PathBuf) -> Result<()> {
        let path = self.check_path(key, stored)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to delete cache file {}: {}", path.display(), e);
                Err(CacheError::io_error(path, IoOperation::Delete, e))
            }
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
