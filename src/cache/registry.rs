//! Cache Registry Module
//!
//! An explicit, constructible registry of named caches. There is no hidden
//! module-level singleton: embedders create one registry, share it, and
//! tests construct (and reset) their own instances for isolation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::persist::MemoryBackend;
use crate::cache::{CacheStats, CacheStore, GlobalStats, SharedCache};
use crate::config::{CacheOptions, PersistMode};
use crate::error::{CacheError, CacheResult};

// == Cache Admin ==
/// Type-erased administrative view of a registered cache, used for
/// aggregation and mass invalidation across heterogeneous payload types.
#[async_trait]
pub trait CacheAdmin: Send + Sync {
    /// The cache's registered name.
    async fn name(&self) -> String;
    /// Removes every entry.
    async fn clear(&self);
    /// Returns the cache's statistics.
    async fn stats(&self) -> CacheStats;
    /// Stops the cache's background sweep.
    fn stop_sweep(&self);
}

#[async_trait]
impl<T> CacheAdmin for SharedCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn name(&self) -> String {
        SharedCache::name(self).await
    }

    async fn clear(&self) {
        SharedCache::clear(self).await;
    }

    async fn stats(&self) -> CacheStats {
        SharedCache::stats(self).await
    }

    fn stop_sweep(&self) {
        SharedCache::stop_sweep(self);
    }
}

// == Registered Cache ==
/// A registry slot: the typed handle (behind `Any` for downcasting) plus
/// the type-erased admin view.
struct Registered {
    handle: Box<dyn Any + Send + Sync>,
    admin: Arc<dyn CacheAdmin>,
}

// == Cache Registry ==
/// Process-wide lookup of named caches with aggregate statistics and
/// mass invalidation. Created on first use by the embedding application
/// and lives for the process.
pub struct CacheRegistry {
    caches: Mutex<HashMap<String, Registered>>,
    /// Shared backend so every `DurableSession` cache in this registry
    /// survives store reconstruction within the process run
    session_backend: Arc<MemoryBackend>,
    /// Cadence of the background sweep started for each created cache
    sweep_interval: Duration,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates an empty registry with the default 60-second sweep cadence.
    pub fn new() -> Self {
        Self::with_sweep_interval(Duration::from_secs(60))
    }

    /// Creates an empty registry with a custom sweep cadence. Tests use a
    /// short cadence or drive `sweep_expired` directly.
    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        Self {
            caches: Mutex::new(HashMap::new()),
            session_backend: Arc::new(MemoryBackend::new()),
            sweep_interval,
        }
    }

    // == Get Cache ==
    /// Returns the named cache, creating it on first use.
    ///
    /// `options` apply only at first creation; requesting an existing cache
    /// by name ignores them entirely. Requesting an existing name with a
    /// different payload type is a [`CacheError::TypeMismatch`].
    ///
    /// Creation starts the cache's background sweep, so this must be called
    /// within a tokio runtime.
    pub fn get_cache<T>(&self, name: &str, options: CacheOptions) -> CacheResult<SharedCache<T>>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let mut caches = self.caches.lock().expect("registry lock poisoned");

        if let Some(registered) = caches.get(name) {
            return registered
                .handle
                .downcast_ref::<SharedCache<T>>()
                .cloned()
                .ok_or_else(|| CacheError::TypeMismatch {
                    name: name.to_string(),
                });
        }

        let store = match options.persistence {
            PersistMode::DurableSession => {
                CacheStore::with_backend(name, options, self.session_backend.clone())
            }
            _ => CacheStore::new(name, options),
        };

        let shared = SharedCache::new(store);
        shared.start_sweep(self.sweep_interval);

        caches.insert(
            name.to_string(),
            Registered {
                handle: Box::new(shared.clone()),
                admin: Arc::new(shared.clone()),
            },
        );
        debug!(cache = %name, "registered new cache");

        Ok(shared)
    }

    // == Clear All ==
    /// Clears every registered cache.
    pub async fn clear_all(&self) {
        for admin in self.admins() {
            admin.clear().await;
        }
        info!("cleared all registered caches");
    }

    // == Global Stats ==
    /// Aggregates every cache's statistics into combined totals and an
    /// unweighted average hit rate.
    pub async fn global_stats(&self) -> GlobalStats {
        let admins = self.admins();
        let mut global = GlobalStats {
            cache_count: admins.len(),
            ..GlobalStats::default()
        };

        let mut rate_sum = 0.0;
        for admin in &admins {
            let stats = admin.stats().await;
            global.total_size += stats.size;
            global.total_hits += stats.hits;
            global.total_misses += stats.misses;
            global.total_memory_bytes += stats.memory_bytes;
            rate_sum += stats.hit_rate();
        }

        if !admins.is_empty() {
            global.average_hit_rate = rate_sum / admins.len() as f64;
        }
        global
    }

    // == Invalidate By Version ==
    /// Bulk invalidation keyed by configuration epoch.
    ///
    /// Known simplification: this clears *every* registered cache
    /// regardless of its version tag rather than scoping to `version`.
    /// Callers must not rely on version-scoped semantics. Returns the
    /// number of caches cleared.
    pub async fn invalidate_by_version(&self, version: &str) -> usize {
        let admins = self.admins();
        info!(version = %version, caches = admins.len(), "version invalidation clears all caches");
        for admin in &admins {
            admin.clear().await;
        }
        admins.len()
    }

    // == Reset ==
    /// Stops every sweep and drops every registered cache. Intended for
    /// test teardown.
    pub fn reset(&self) {
        let mut caches = self.caches.lock().expect("registry lock poisoned");
        for registered in caches.values() {
            registered.admin.stop_sweep();
        }
        caches.clear();
    }

    /// Number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.lock().expect("registry lock poisoned").len()
    }

    /// Returns true when no caches are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the admin views, taken without holding the lock across
    /// any await point.
    fn admins(&self) -> Vec<Arc<dyn CacheAdmin>> {
        self.caches
            .lock()
            .expect("registry lock poisoned")
            .values()
            .map(|registered| registered.admin.clone())
            .collect()
    }
}

impl Drop for CacheRegistry {
    fn drop(&mut self) {
        self.reset();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_cache_creates_once() {
        let registry = CacheRegistry::new();

        let first: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();
        first.set("novel:detail:1", 42, None).await;

        // Options are ignored for an existing cache
        let second: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default().with_max_size(1))
            .unwrap();
        assert_eq!(second.get("novel:detail:1").await, Some(42));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_get_cache_type_mismatch() {
        let registry = CacheRegistry::new();

        let _typed: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();

        let result: CacheResult<SharedCache<String>> =
            registry.get_cache("novels", CacheOptions::default());
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let registry = CacheRegistry::new();

        let novels: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();
        let themes: SharedCache<u32> = registry
            .get_cache("themes", CacheOptions::default())
            .unwrap();
        novels.set("a", 1, None).await;
        themes.set("b", 2, None).await;

        registry.clear_all().await;

        assert!(novels.is_empty().await);
        assert!(themes.is_empty().await);
    }

    #[tokio::test]
    async fn test_global_stats_aggregation() {
        let registry = CacheRegistry::new();

        let novels: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();
        let themes: SharedCache<u32> = registry
            .get_cache("themes", CacheOptions::default())
            .unwrap();

        novels.set("a", 1, None).await;
        novels.get("a").await; // hit
        themes.get("missing").await; // miss

        let global = registry.global_stats().await;
        assert_eq!(global.cache_count, 2);
        assert_eq!(global.total_size, 1);
        assert_eq!(global.total_hits, 1);
        assert_eq!(global.total_misses, 1);
        // One cache at 1.0, one at 0.0
        assert!((global.average_hit_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalidate_by_version_clears_everything() {
        let registry = CacheRegistry::new();

        let novels: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default().with_version("1.0.0"))
            .unwrap();
        let themes: SharedCache<u32> = registry
            .get_cache("themes", CacheOptions::default().with_version("2.0.0"))
            .unwrap();
        novels.set("a", 1, None).await;
        themes.set("b", 2, None).await;

        // Documented simplification: clears regardless of tag
        let cleared = registry.invalidate_by_version("1.0.0").await;
        assert_eq!(cleared, 2);
        assert!(novels.is_empty().await);
        assert!(themes.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_for_isolation() {
        let registry = CacheRegistry::new();

        let _cache: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();
        assert_eq!(registry.len(), 1);

        registry.reset();
        assert!(registry.is_empty());

        // A fresh cache under the same name starts empty
        let recreated: SharedCache<u32> = registry
            .get_cache("novels", CacheOptions::default())
            .unwrap();
        assert!(recreated.is_empty().await);
    }

    #[tokio::test]
    async fn test_session_backend_shared_across_recreation() {
        let registry = CacheRegistry::new();
        let options =
            CacheOptions::default().with_persistence(PersistMode::DurableSession);

        {
            let cache: SharedCache<u32> =
                registry.get_cache("session", options.clone()).unwrap();
            cache.set("key", 9, None).await;
        }

        registry.reset();

        // Same registry, fresh store: the session snapshot is reloaded
        let reloaded: SharedCache<u32> = registry.get_cache("session", options).unwrap();
        assert_eq!(reloaded.get("key").await, Some(9));
    }
}
