//! Request Coordinator
//!
//! Turns a logical "perform this network operation" into a cache-aware,
//! deduplicated, retried call. Idempotent reads check the cache, coalesce
//! onto any identical in-flight call, and write successful results through
//! to the cache. Mutating calls bypass cache and deduplication and may
//! invalidate cached reads by pattern after success.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheStore, SharedCache};
use crate::config::{CacheOptions, CoordinatorConfig, RequestOptions, RetryConfig};
use crate::error::{RequestError, RequestResult};
use crate::request::pending::{PendingRequestTable, Registration};
use crate::request::transport::{Method, ProgressFn, Transport, TransportRequest};
use crate::request::{ApiResponse, RetryExecutor};

// == Batch Item ==
/// One request in a [`RequestCoordinator::batch`] call.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub options: RequestOptions,
}

impl BatchItem {
    /// A GET with default options.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            options: RequestOptions::default(),
        }
    }
}

// == Request Coordinator ==
/// Cache-aware, deduplicating, retrying wrapper over an abstract transport.
pub struct RequestCoordinator {
    transport: Arc<dyn Transport>,
    cache: SharedCache<Value>,
    pending: Arc<PendingRequestTable>,
    config: CoordinatorConfig,
}

impl RequestCoordinator {
    // == Constructors ==
    /// Wraps `transport` with an explicit response cache and configuration.
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: SharedCache<Value>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            transport,
            cache,
            pending: Arc::new(PendingRequestTable::new()),
            config,
        }
    }

    /// Wraps `transport` with a private response cache and defaults.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        let cache = SharedCache::new(CacheStore::new("requests", CacheOptions::default()));
        Self::new(transport, cache, CoordinatorConfig::default())
    }

    /// The response cache, for administration and tests.
    pub fn cache(&self) -> &SharedCache<Value> {
        &self.cache
    }

    // == Read Path ==
    /// Cached, deduplicated, retried GET.
    pub async fn get<T>(&self, url: &str, options: RequestOptions) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.get_raw(url, options).await?.into_typed()
    }

    /// The read path over raw JSON, shared by [`get`](Self::get) and
    /// [`batch`](Self::batch).
    pub async fn get_raw(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<Value>> {
        let request = self.build_request(Method::Get, url, &options, None);
        let key = options
            .key
            .clone()
            .unwrap_or_else(|| derive_request_key(&request));
        let use_cache = self.config.cache_enabled && !options.skip_cache;

        if use_cache {
            if let Some(value) = self.cache.get(&key).await {
                debug!(key = %key, "serving from cache");
                return Ok(ApiResponse::success(value));
            }
        }

        // Registration is synchronous: between the cache miss above and this
        // point nothing awaited on the pending table, so exactly one caller
        // per key becomes the leader.
        let receiver = match self.pending.register(&key) {
            Registration::Waiter(rx) => rx,
            Registration::Leader(rx) => {
                self.spawn_in_flight_call(key.clone(), request, &options, use_cache);
                rx
            }
        };

        receiver
            .await
            .map_err(|_| RequestError::InFlightDropped)?
    }

    /// Spawns the underlying call as a detached task so it runs to
    /// completion (or failure) independent of any one waiter's disinterest,
    /// then settles the pending key exactly once.
    fn spawn_in_flight_call(
        &self,
        key: String,
        request: TransportRequest,
        options: &RequestOptions,
        use_cache: bool,
    ) {
        let transport = self.transport.clone();
        let cache = self.cache.clone();
        let pending = self.pending.clone();
        let retry = options
            .retry
            .clone()
            .unwrap_or_else(|| self.config.read_retry.clone());
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);

        tokio::spawn(async move {
            let result = RetryExecutor::run(
                |_attempt| {
                    let transport = transport.clone();
                    let request = request.clone();
                    async move { transport.send(request).await?.into_result() }
                },
                &retry,
            )
            .await;

            let outcome = result.map(|response| ApiResponse::success(response.body));

            if let Ok(envelope) = &outcome {
                if use_cache {
                    if let Some(value) = &envelope.data {
                        cache.set(key.clone(), value.clone(), Some(ttl)).await;
                    }
                }
            }

            pending.settle(&key, outcome);
        });
    }

    // == Mutating Path ==
    /// POST: independent call, no cache lookup or deduplication.
    pub async fn post<T>(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.mutate_raw(Method::Post, url, Some(body), options)
            .await?
            .into_typed()
    }

    /// PUT: independent call, no cache lookup or deduplication.
    pub async fn put<T>(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.mutate_raw(Method::Put, url, Some(body), options)
            .await?
            .into_typed()
    }

    /// PATCH: independent call, no cache lookup or deduplication.
    pub async fn patch<T>(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.mutate_raw(Method::Patch, url, Some(body), options)
            .await?
            .into_typed()
    }

    /// DELETE: independent call, no cache lookup or deduplication.
    pub async fn delete<T>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.mutate_raw(Method::Delete, url, None, options)
            .await?
            .into_typed()
    }

    /// The mutating path over raw JSON. There is no automatic dependency
    /// tracking between a write and the reads it may stale, so callers pass
    /// an explicit invalidation pattern applied after success. Mutations
    /// default to a single attempt; retries are opt-in per request.
    pub async fn mutate_raw(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> RequestResult<ApiResponse<Value>> {
        let request = self.build_request(method, url, &options, body);
        let retry = options.retry.clone().unwrap_or_else(RetryConfig::no_retries);

        let transport = self.transport.clone();
        let response = RetryExecutor::run(
            |_attempt| {
                let transport = transport.clone();
                let request = request.clone();
                async move { transport.send(request).await?.into_result() }
            },
            &retry,
        )
        .await?;

        if let Some(pattern) = &options.invalidate {
            let removed = self.cache.invalidate_pattern(pattern).await;
            debug!(method = %method, url = %url, removed, "post-mutation cache invalidation");
        }

        Ok(ApiResponse::success(response.body))
    }

    // == Batch ==
    /// Executes independent requests concurrently; results come back in
    /// input order and partial failures do not cancel sibling requests.
    pub async fn batch(
        &self,
        requests: Vec<BatchItem>,
    ) -> Vec<RequestResult<ApiResponse<Value>>> {
        let futures = requests.into_iter().map(|item| async move {
            if item.method.is_idempotent() {
                self.get_raw(&item.url, item.options).await
            } else {
                self.mutate_raw(item.method, &item.url, item.body, item.options)
                    .await
            }
        });
        futures::future::join_all(futures).await
    }

    // == Upload ==
    /// Mutating call that reports fractional progress. Never cached or
    /// deduplicated: payload identity is not meaningfully hashable. Always
    /// a single attempt.
    pub async fn upload<T>(
        &self,
        url: &str,
        payload: Value,
        options: RequestOptions,
        on_progress: Option<ProgressFn>,
    ) -> RequestResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let mut request = self.build_request(Method::Post, url, &options, Some(payload));
        request
            .headers
            .push(("content-type".to_string(), "multipart/form-data".to_string()));

        let progress: ProgressFn = on_progress.unwrap_or_else(|| Box::new(|_| {}));
        let response = self
            .transport
            .send_with_progress(request, progress)
            .await?
            .into_result()?;

        if let Some(pattern) = &options.invalidate {
            self.cache.invalidate_pattern(pattern).await;
        }

        ApiResponse::success(response.body).into_typed()
    }

    // == Request Assembly ==
    fn build_request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        body: Option<Value>,
    ) -> TransportRequest {
        TransportRequest {
            method,
            url: url.to_string(),
            params: options.params.clone(),
            headers: options.headers.clone(),
            body,
        }
    }
}

// == Request Key Derivation ==
/// Deterministic key over (method, URL, sorted params, body), rendered as
/// `"<METHOD>:<url>#<hex>"` so related keys stay pattern-matchable by URL.
pub fn derive_request_key(request: &TransportRequest) -> String {
    let mut params = request.params.clone();
    params.sort();

    let mut hasher = DefaultHasher::new();
    request.method.as_str().hash(&mut hasher);
    request.url.hash(&mut hasher);
    params.hash(&mut hasher);
    if let Some(body) = &request.body {
        body.to_string().hash(&mut hasher);
    }

    format!("{}:{}#{:016x}", request.method, request.url, hasher.finish())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derived_key_is_deterministic() {
        let request = TransportRequest::new(Method::Get, "/api/novel/list");
        assert_eq!(derive_request_key(&request), derive_request_key(&request));
    }

    #[test]
    fn test_derived_key_ignores_param_order() {
        let mut a = TransportRequest::new(Method::Get, "/api/novel/list");
        a.params = vec![
            ("page".to_string(), "1".to_string()),
            ("size".to_string(), "20".to_string()),
        ];
        let mut b = a.clone();
        b.params.reverse();

        assert_eq!(derive_request_key(&a), derive_request_key(&b));
    }

    #[test]
    fn test_derived_key_distinguishes_method_url_and_body() {
        let get = TransportRequest::new(Method::Get, "/api/novel/1");
        let post = TransportRequest::new(Method::Post, "/api/novel/1");
        let other_url = TransportRequest::new(Method::Get, "/api/novel/2");
        let mut with_body = get.clone();
        with_body.body = Some(json!({"q": "x"}));

        let key = derive_request_key(&get);
        assert_ne!(key, derive_request_key(&post));
        assert_ne!(key, derive_request_key(&other_url));
        assert_ne!(key, derive_request_key(&with_body));
    }

    #[test]
    fn test_derived_key_is_prefix_matchable() {
        let request = TransportRequest::new(Method::Get, "/api/novel/list");
        let key = derive_request_key(&request);
        assert!(key.starts_with("GET:/api/novel/list#"));
    }
}
