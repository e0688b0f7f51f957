//! Shared Cache Handle
//!
//! Thread-safe handle over a [`CacheStore`], cloneable across tasks. Owns
//! the store's background sweep lifecycle: the sweep is an explicit task
//! started and stopped through this handle, never an implicit side effect
//! of construction.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};
use crate::tasks::spawn_sweep_task;

// == Shared Cache ==
/// Cloneable, task-safe wrapper over a cache store.
pub struct SharedCache<T> {
    inner: Arc<RwLock<CacheStore<T>>>,
    sweep: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T> Clone for SharedCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            sweep: self.sweep.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SharedCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCache").finish_non_exhaustive()
    }
}

impl<T> SharedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Wraps a store. The background sweep is not started; call
    /// [`start_sweep`](Self::start_sweep) explicitly.
    pub fn new(store: CacheStore<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
            sweep: Arc::new(Mutex::new(None)),
        }
    }

    // == Store Operations ==
    /// See [`CacheStore::get`].
    pub async fn get(&self, key: &str) -> Option<T> {
        // Write lock: a hit mutates access bookkeeping
        self.inner.write().await.get(key)
    }

    /// See [`CacheStore::set`].
    pub async fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        self.inner.write().await.set(key, value, ttl);
    }

    /// See [`CacheStore::has`].
    pub async fn has(&self, key: &str) -> bool {
        self.inner.write().await.has(key)
    }

    /// See [`CacheStore::delete`].
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.delete(key)
    }

    /// See [`CacheStore::clear`].
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    /// See [`CacheStore::get_multiple`].
    pub async fn get_multiple(&self, keys: &[&str]) -> Vec<Option<T>> {
        self.inner.write().await.get_multiple(keys)
    }

    /// See [`CacheStore::set_multiple`].
    pub async fn set_multiple(&self, entries: Vec<(String, T)>, ttl: Option<Duration>) {
        self.inner.write().await.set_multiple(entries, ttl);
    }

    /// See [`CacheStore::invalidate_pattern`].
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        self.inner.write().await.invalidate_pattern(pattern)
    }

    /// See [`CacheStore::refresh`].
    pub async fn refresh(&self, key: &str, ttl: Option<Duration>) -> bool {
        self.inner.write().await.refresh(key, ttl)
    }

    /// See [`CacheStore::sweep_expired`].
    pub async fn sweep_expired(&self) -> usize {
        self.inner.write().await.sweep_expired()
    }

    /// See [`CacheStore::stats`].
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    /// Returns the current number of entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Returns the cache name.
    pub async fn name(&self) -> String {
        self.inner.read().await.name().to_string()
    }

    // == Sweep Lifecycle ==
    /// Starts the periodic expired-entry sweep. A second call while a sweep
    /// is running is a no-op.
    pub fn start_sweep(&self, interval: Duration) {
        let mut guard = self.sweep.lock().expect("sweep handle lock poisoned");
        if guard.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }
        *guard = Some(spawn_sweep_task(self.inner.clone(), interval));
    }

    /// Stops the periodic sweep if one is running.
    pub fn stop_sweep(&self) {
        let mut guard = self.sweep.lock().expect("sweep handle lock poisoned");
        if let Some(handle) = guard.take() {
            handle.abort();
            debug!("sweep task stopped");
        }
    }
}
