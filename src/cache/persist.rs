//! Cache Persistence Module
//!
//! Snapshot format and durable backends for cache persistence. A store
//! persists its *entire* entry map as one snapshot under a single composite
//! key; every mutating operation overwrites the previous snapshot, so write
//! cost scales with cache size and `max_size` should stay bounded for caches
//! holding large entries.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::error::{CacheError, CacheResult};

// == Snapshot ==
/// The persisted form of a cache: the configuration epoch tag plus the full
/// entry map. On load, entries are kept only if the stored version matches
/// the store's configured version and the entry has not expired.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Configuration epoch tag the entries were written under
    pub version: String,
    /// Wall-clock time of the write, for operators inspecting snapshots
    pub saved_at: DateTime<Utc>,
    /// The complete entry map
    pub entries: HashMap<String, CacheEntry<T>>,
}

// == Snapshot Codec ==
/// Pluggable serializer for snapshots. The default is JSON via serde.
pub trait SnapshotCodec<T>: Send + Sync {
    /// Encodes a snapshot to its text form.
    fn encode(&self, snapshot: &Snapshot<T>) -> CacheResult<String>;
    /// Decodes a snapshot from its text form.
    fn decode(&self, payload: &str) -> CacheResult<Snapshot<T>>;
}

/// Default structured-text codec (JSON).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl<T> SnapshotCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, snapshot: &Snapshot<T>) -> CacheResult<String> {
        serde_json::to_string(snapshot).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode(&self, payload: &str) -> CacheResult<Snapshot<T>> {
        serde_json::from_str(payload).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

// == Persistence Backend ==
/// A durable key/value text store addressed by one composite key per cache.
pub trait PersistenceBackend: Send + Sync {
    /// Reads the payload stored under `key`, if any.
    fn load(&self, key: &str) -> Option<String>;
    /// Stores `payload` under `key`, overwriting any prior value.
    fn store(&self, key: &str, payload: &str) -> CacheResult<()>;
    /// Removes the payload stored under `key`; absent keys are a no-op.
    fn remove(&self, key: &str);
}

// == Memory Backend ==
/// Process-lifetime backend for session-scoped persistence. Meaningful
/// across store reconstructions only when the same backend instance is
/// shared between them.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceBackend for MemoryBackend {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("memory backend lock poisoned")
            .get(key)
            .cloned()
    }

    fn store(&self, key: &str, payload: &str) -> CacheResult<()> {
        self.entries
            .lock()
            .expect("memory backend lock poisoned")
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .expect("memory backend lock poisoned")
            .remove(key);
    }
}

// == File Backend ==
/// Durable-local backend writing one file per composite key under a base
/// directory. Survives process restarts.
#[derive(Debug)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    /// Creates a backend rooted at `base_dir`; the directory is created on
    /// the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

impl PersistenceBackend for FileBackend {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn store(&self, key: &str, payload: &str) -> CacheResult<()> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| CacheError::Persistence(e.to_string()))?;
        fs::write(self.path_for(key), payload)
            .map_err(|e| CacheError::Persistence(e.to_string()))
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path_for(key));
    }
}
