//! Retry Executor
//!
//! Runs an asynchronous operation with bounded retries and exponential
//! backoff, guided by the caller's retryability predicate. The last
//! attempt's error propagates unchanged: no wrapping, no swallowing.

use std::future::Future;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::RequestResult;

// == Retry Executor ==
/// Executes operations under a [`RetryConfig`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryExecutor;

impl RetryExecutor {
    /// Attempts `operation` up to `config.max_retries + 1` times.
    ///
    /// The closure receives the zero-based attempt index. There is no delay
    /// before the first attempt; before retry *n* (0-based) the executor
    /// sleeps `retry_delay * 2^n`. After each failure the predicate decides
    /// whether another attempt is permitted; a false verdict or exhausted
    /// attempts propagates the last error as-is.
    pub async fn run<T, F, Fut>(operation: F, config: &RetryConfig) -> RequestResult<T>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = RequestResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= config.max_retries {
                        warn!(attempts = attempt + 1, error = %error, "retries exhausted");
                        return Err(error);
                    }
                    if !(config.retry_condition)(&error) {
                        debug!(error = %error, "failure is not retryable");
                        return Err(error);
                    }

                    let delay = config
                        .retry_delay
                        .saturating_mul(2u32.saturating_pow(attempt));
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_retry_delay(Duration::from_millis(10))
    }

    fn transient() -> RequestError {
        RequestError::Transport("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = RetryExecutor::run(
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RequestError>(42)
                }
            },
            &fast_config(3),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let starts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = starts.clone();

        let result = RetryExecutor::run(
            move |_| {
                let counter = counter.clone();
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(Instant::now());
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok(7)
                    }
                }
            },
            &fast_config(3),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        // Inter-attempt delays are non-decreasing (10ms, then 20ms)
        let starts = starts.lock().unwrap();
        let first_gap = starts[1] - starts[0];
        let second_gap = starts[2] - starts[1];
        assert!(second_gap >= first_gap);
    }

    #[tokio::test]
    async fn test_exhaustion_propagates_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: RequestResult<u32> = RetryExecutor::run(
            move |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(RequestError::Status {
                        status: 500,
                        message: format!("attempt {}", attempt),
                    })
                }
            },
            &fast_config(2),
        )
        .await;

        // maxRetries=2 means 3 attempts total, and the *last* error surfaces
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.unwrap_err(),
            RequestError::Status {
                status: 500,
                message: "attempt 2".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let config = fast_config(5).with_retry_condition(|_| false);

        let result: RequestResult<u32> = RetryExecutor::run(
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            },
            &config,
        )
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), transient());
    }

    #[tokio::test]
    async fn test_client_error_not_retried_by_default() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: RequestResult<u32> = RetryExecutor::run(
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(RequestError::Status {
                        status: 404,
                        message: "not found".to_string(),
                    })
                }
            },
            &fast_config(3),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: RequestResult<u32> = RetryExecutor::run(
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            },
            &RetryConfig::no_retries(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
