//! novel-cache - Client-side caching and request coordination
//!
//! The data layer of the novel publishing front end: a generic time-bounded
//! cache with LRU eviction and optional snapshot persistence, wrapped by a
//! request coordinator that adds deduplication, cache-aware reads,
//! retry-with-backoff, and pattern-based invalidation over an externally
//! supplied transport.

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod tasks;

pub use cache::{CacheRegistry, CacheStats, CacheStore, GlobalStats, SharedCache};
pub use config::{CacheOptions, CoordinatorConfig, PersistMode, RequestOptions, RetryConfig};
pub use error::{CacheError, CacheResult, RequestError, RequestResult};
pub use request::{ApiResponse, BatchItem, Method, RequestCoordinator, RetryExecutor, Transport};
pub use tasks::spawn_sweep_task;
