//! Configuration Module
//!
//! Consolidates every tunable of the cache and request layer into explicit
//! configuration structures with documented defaults, instead of ad-hoc
//! options scattered through call sites.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::error::RequestError;

// == Persistence Mode ==
/// Where (and whether) a cache persists its snapshot between constructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// In-memory only; nothing survives the store instance
    #[default]
    None,
    /// Durable local storage (file-backed); survives process restarts
    DurableLocal,
    /// Session-scoped storage (shared in-memory backend); survives store
    /// reconstruction within one process run when the backend is shared
    DurableSession,
}

// == Cache Options ==
/// Construction-time options for a [`CacheStore`](crate::cache::CacheStore).
///
/// Options apply only at first creation when a cache is obtained through the
/// registry; requesting an existing cache by name ignores them.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Default lifetime for new entries (default: 5 minutes)
    pub ttl: Duration,
    /// Maximum number of distinct keys before LRU eviction (default: 100)
    pub max_size: usize,
    /// Configuration epoch tag; changing it invalidates everything
    /// previously persisted under the old value (default: "1.0.0")
    pub version: String,
    /// Persistence mode (default: [`PersistMode::None`])
    pub persistence: PersistMode,
    /// Prefix of the composite persistence key `"<prefix>_<cache_name>"`
    /// (default: "novel_cache")
    pub key_prefix: String,
    /// Base directory for [`PersistMode::DurableLocal`] snapshots
    /// (default: `./.novel_cache`)
    pub persist_dir: PathBuf,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 100,
            version: "1.0.0".to_string(),
            persistence: PersistMode::None,
            key_prefix: "novel_cache".to_string(),
            persist_dir: PathBuf::from("./.novel_cache"),
        }
    }
}

impl CacheOptions {
    /// Sets the default entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the maximum number of entries.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the configuration epoch tag.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the persistence mode.
    pub fn with_persistence(mut self, mode: PersistMode) -> Self {
        self.persistence = mode;
        self
    }

    /// Sets the base directory for durable-local snapshots.
    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = dir.into();
        self
    }
}

// == Retry Predicate ==
/// Decides whether a failed attempt may be retried.
pub type RetryCondition = Arc<dyn Fn(&RequestError) -> bool + Send + Sync>;

// == Retry Config ==
/// Bounds and pacing for [`RetryExecutor`](crate::request::RetryExecutor).
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    pub max_retries: u32,
    /// Base delay before the first retry; doubles per retry (default: 1s)
    pub retry_delay: Duration,
    /// Retryability predicate (default: [`RequestError::is_retryable`])
    pub retry_condition: RetryCondition,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            retry_condition: Arc::new(RequestError::is_retryable),
        }
    }
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl RetryConfig {
    /// Creates a config that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replaces the retryability predicate.
    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&RequestError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Arc::new(condition);
        self
    }
}

// == Coordinator Config ==
/// Defaults applied by [`RequestCoordinator`](crate::request::RequestCoordinator)
/// when a request does not override them.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// TTL for write-through cache population (default: 5 minutes)
    pub default_ttl: Duration,
    /// Whether idempotent reads consult the cache at all (default: true)
    pub cache_enabled: bool,
    /// Retry policy for reads; mutating calls default to no retries
    pub read_retry: RetryConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            cache_enabled: true,
            read_retry: RetryConfig::default(),
        }
    }
}

// == Request Options ==
/// Per-request overrides accepted by every coordinator operation.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Explicit request key; derived from the request shape when absent
    pub key: Option<String>,
    /// TTL override for the cached result
    pub ttl: Option<Duration>,
    /// Set to true to bypass cache lookup and write-through for this call
    pub skip_cache: bool,
    /// Query parameters, appended to the derived request key
    pub params: Vec<(String, String)>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Retry policy override for this call
    pub retry: Option<RetryConfig>,
    /// Cache keys matching this pattern are removed after a successful
    /// mutating call
    pub invalidate: Option<Regex>,
}

impl RequestOptions {
    /// Sets an explicit request key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets a TTL override for the cached result.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Bypasses the cache for this call.
    pub fn without_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets a retry policy override.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the post-success invalidation pattern for mutating calls.
    pub fn with_invalidation(mut self, pattern: Regex) -> Self {
        self.invalidate = Some(pattern);
        self
    }
}
