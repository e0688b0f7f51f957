//! Expired-Entry Sweep Task
//!
//! Background task that removes expired cache entries on a fixed cadence,
//! independent of reads. This bounds memory growth from write-heavy,
//! read-never keys whose entries would otherwise never hit the lazy
//! expiry path in `get`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a task that periodically sweeps expired entries from the store.
///
/// The task sleeps for `interval` between sweeps and acquires a write lock
/// for each pass. The returned handle is owned by the
/// [`SharedCache`](crate::cache::SharedCache) that started it and is
/// aborted by `stop_sweep` or at teardown.
pub fn spawn_sweep_task<T>(
    cache: Arc<RwLock<CacheStore<T>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "sweep task started");

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut guard = cache.write().await;
                guard.sweep_expired()
            };

            if removed > 0 {
                info!(removed, "sweep removed expired entries");
            } else {
                debug!("sweep found no expired entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheOptions;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache = Arc::new(RwLock::new(CacheStore::new(
            "sweep_test",
            CacheOptions::default(),
        )));

        {
            let mut guard = cache.write().await;
            guard.set("expire_soon", 1u32, Some(Duration::from_millis(30)));
        }

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(120)).await;

        {
            let guard = cache.read().await;
            assert!(guard.is_empty(), "expired entry should have been swept");
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let cache = Arc::new(RwLock::new(CacheStore::new(
            "sweep_test",
            CacheOptions::default(),
        )));

        {
            let mut guard = cache.write().await;
            guard.set("long_lived", 1u32, Some(Duration::from_secs(3600)));
        }

        let handle = spawn_sweep_task(cache.clone(), Duration::from_millis(25));
        tokio::time::sleep(Duration::from_millis(80)).await;

        {
            let mut guard = cache.write().await;
            assert_eq!(guard.get("long_lived"), Some(1));
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_can_be_aborted() {
        let cache: Arc<RwLock<CacheStore<u32>>> = Arc::new(RwLock::new(CacheStore::new(
            "sweep_test",
            CacheOptions::default(),
        )));

        let handle = spawn_sweep_task(cache, Duration::from_millis(25));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "task should be finished after abort");
    }
}
