//! Cache Store Module
//!
//! Main cache engine: a generic, size-bounded, time-bounded key/value map
//! with least-recently-accessed eviction and optional snapshot persistence.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::persist::{
    FileBackend, JsonCodec, MemoryBackend, PersistenceBackend, Snapshot, SnapshotCodec,
};
use crate::cache::{CacheEntry, CacheStats};
use crate::config::{CacheOptions, PersistMode};

// == Cache Store ==
/// Generic cache store with TTL expiry, LRU eviction, and optional
/// whole-map snapshot persistence.
///
/// A cache miss is a normal outcome, not an error: `get` returns `Option`.
/// Persistence and codec failures are caught and logged internally; the
/// store degrades to memory-only operation and never surfaces them through
/// its public operations.
pub struct CacheStore<T> {
    /// Cache name; forms the composite persistence key with the prefix
    name: String,
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Hit/miss/eviction counters
    stats: CacheStats,
    /// Construction-time options
    options: CacheOptions,
    /// Durable backend, when persistence is enabled
    backend: Option<Arc<dyn PersistenceBackend>>,
    /// Snapshot serializer
    codec: Arc<dyn SnapshotCodec<T>>,
}

impl<T> std::fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("size", &self.entries.len())
            .field("max_size", &self.options.max_size)
            .field("version", &self.options.version)
            .finish_non_exhaustive()
    }
}

impl<T> CacheStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a store and loads any previously persisted, version-matching,
    /// non-expired entries.
    ///
    /// The persistence backend is chosen from `options.persistence`:
    /// `DurableLocal` writes files under `options.persist_dir`,
    /// `DurableSession` uses a private in-memory backend, `None` disables
    /// persistence entirely.
    pub fn new(name: impl Into<String>, options: CacheOptions) -> Self {
        let backend: Option<Arc<dyn PersistenceBackend>> = match options.persistence {
            PersistMode::None => None,
            PersistMode::DurableLocal => Some(Arc::new(FileBackend::new(&options.persist_dir))),
            PersistMode::DurableSession => Some(Arc::new(MemoryBackend::new())),
        };
        Self::build(name.into(), options, backend, Arc::new(JsonCodec))
    }

    /// Creates a store over an injected persistence backend. Used by the
    /// registry for session-scoped sharing and by tests.
    pub fn with_backend(
        name: impl Into<String>,
        options: CacheOptions,
        backend: Arc<dyn PersistenceBackend>,
    ) -> Self {
        Self::build(name.into(), options, Some(backend), Arc::new(JsonCodec))
    }

    /// Creates a store with an injected backend and a non-default codec.
    pub fn with_codec(
        name: impl Into<String>,
        options: CacheOptions,
        backend: Arc<dyn PersistenceBackend>,
        codec: Arc<dyn SnapshotCodec<T>>,
    ) -> Self {
        Self::build(name.into(), options, Some(backend), codec)
    }

    fn build(
        name: String,
        options: CacheOptions,
        backend: Option<Arc<dyn PersistenceBackend>>,
        codec: Arc<dyn SnapshotCodec<T>>,
    ) -> Self {
        let mut store = Self {
            name,
            entries: HashMap::new(),
            stats: CacheStats::new(),
            options,
            backend,
            codec,
        };
        store.load_snapshot();
        store
    }
}

impl<T> CacheStore<T>
where
    T: Clone,
{
    // == Get ==
    /// Returns the stored value if present and not expired.
    ///
    /// Expired entries are removed on read and counted as misses. A hit
    /// bumps the entry's access count and last-accessed timestamp.
    pub fn get(&mut self, key: &str) -> Option<T> {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.touch();
                self.stats.record_hit();
                Some(entry.data.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.record_miss();
                self.persist();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Equivalent to `get(key).is_some()`, with the same read bookkeeping.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Set ==
    /// Inserts or overwrites an entry with `expiry = now + (ttl ?? options.ttl)`.
    ///
    /// Inserting a new key at capacity first evicts the entry with the
    /// smallest last-accessed timestamp.
    pub fn set(&mut self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let key = key.into();
        if self.options.max_size == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.options.max_size {
            self.evict_lru();
        }

        let ttl_ms = ttl.unwrap_or(self.options.ttl).as_millis() as u64;
        let entry = CacheEntry::new(value, ttl_ms, &self.options.version);
        self.entries.insert(key, entry);
        self.persist();
    }

    // == Get Multiple ==
    /// Batched `get`; results are in the same order as `keys`.
    pub fn get_multiple(&mut self, keys: &[&str]) -> Vec<Option<T>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    // == Set Multiple ==
    /// Batched `set` with one shared TTL override.
    pub fn set_multiple(&mut self, entries: Vec<(String, T)>, ttl: Option<Duration>) {
        for (key, value) in entries {
            self.set(key, value, ttl);
        }
    }

    // == Delete ==
    /// Removes one entry. Deleting an absent key is a no-op returning false.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.persist();
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry and the persisted snapshot. A cleared cache
    /// leaves nothing behind in the backend.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(backend) = &self.backend {
            backend.remove(&self.composite_key());
        }
    }

    // == Invalidate Pattern ==
    /// Removes every key matching `pattern`; returns the count removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex) -> usize {
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();

        let count = matching.len();
        for key in &matching {
            self.entries.remove(key);
        }

        if count > 0 {
            debug!(cache = %self.name, pattern = %pattern, count, "invalidated entries by pattern");
            self.persist();
        }
        count
    }

    // == Refresh ==
    /// Extends an entry's expiry from now without changing its data.
    /// Returns false if the key is absent.
    pub fn refresh(&mut self, key: &str, ttl: Option<Duration>) -> bool {
        let ttl_ms = ttl.unwrap_or(self.options.ttl).as_millis() as u64;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.refresh(ttl_ms);
                self.persist();
                true
            }
            None => false,
        }
    }

    // == Sweep Expired ==
    /// Removes every entry whose expiry has passed, independent of reads.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired.len();
        for key in &expired {
            self.entries.remove(key);
        }

        if count > 0 {
            self.persist();
        }
        count
    }

    // == Stats ==
    /// Returns counters plus a point-in-time profile of the entry map.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self.entries.len();
        stats.max_size = self.options.max_size;
        stats.expired_pending_sweep = self
            .entries
            .values()
            .filter(|entry| entry.is_expired())
            .count();
        stats.memory_bytes = self.estimate_memory();
        stats.oldest_entry = self.entries.values().map(|e| e.created_at).min();
        stats.newest_entry = self.entries.values().map(|e| e.created_at).max();
        stats.total_accesses = self.entries.values().map(|e| e.access_count).sum();
        stats
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configured epoch tag.
    pub fn version(&self) -> &str {
        &self.options.version
    }

    // == Eviction ==
    /// Removes the entry with the smallest last-accessed timestamp. Ties are
    /// broken by iteration order (first minimum wins).
    fn evict_lru(&mut self) {
        let mut victim: Option<(String, u64)> = None;
        for (key, entry) in &self.entries {
            let is_older = victim
                .as_ref()
                .map(|(_, best)| entry.last_accessed < *best)
                .unwrap_or(true);
            if is_older {
                victim = Some((key.clone(), entry.last_accessed));
            }
        }
        let victim = victim.map(|(key, _)| key);

        if let Some(key) = victim {
            debug!(cache = %self.name, key = %key, "evicting least recently accessed entry");
            self.entries.remove(&key);
            self.stats.record_eviction();
        }
    }

    // == Persistence ==
    /// Snapshots the whole entry map to the backend. Failures are logged
    /// and swallowed; the store keeps operating in memory.
    fn persist(&self) {
        let Some(backend) = &self.backend else {
            return;
        };

        let snapshot = Snapshot {
            version: self.options.version.clone(),
            saved_at: Utc::now(),
            entries: self.entries.clone(),
        };

        let payload = match self.codec.encode(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(cache = %self.name, error = %e, "snapshot encode failed; cache is memory-only for this write");
                return;
            }
        };

        if let Err(e) = backend.store(&self.composite_key(), &payload) {
            warn!(cache = %self.name, error = %e, "snapshot write failed; cache is memory-only for this write");
        }
    }

    /// Loads the persisted snapshot, keeping only version-matching,
    /// non-expired entries. Any failure leaves the store empty and logged.
    fn load_snapshot(&mut self) {
        let Some(backend) = &self.backend else {
            return;
        };
        let Some(payload) = backend.load(&self.composite_key()) else {
            return;
        };

        let snapshot = match self.codec.decode(&payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(cache = %self.name, error = %e, "snapshot decode failed; starting empty");
                return;
            }
        };

        if snapshot.version != self.options.version {
            info!(
                cache = %self.name,
                stored = %snapshot.version,
                configured = %self.options.version,
                "snapshot version mismatch; discarding persisted entries"
            );
            return;
        }

        let now = current_timestamp_ms();
        let before = snapshot.entries.len();
        self.entries = snapshot
            .entries
            .into_iter()
            .filter(|(_, entry)| now <= entry.expires_at)
            .collect();

        debug!(
            cache = %self.name,
            loaded = self.entries.len(),
            discarded = before - self.entries.len(),
            "restored persisted entries"
        );
    }

    fn composite_key(&self) -> String {
        format!("{}_{}", self.options.key_prefix, self.name)
    }

    /// Approximate serialized footprint of the entry map.
    fn estimate_memory(&self) -> usize {
        let snapshot = Snapshot {
            version: self.options.version.clone(),
            saved_at: Utc::now(),
            entries: self.entries.clone(),
        };
        self.codec
            .encode(&snapshot)
            .map(|payload| payload.len())
            .unwrap_or(0)
    }
}
