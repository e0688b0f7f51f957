//! Transport Boundary
//!
//! The abstract request-performing capability the coordinator depends on.
//! The crate ships no concrete network transport; embedders supply one and
//! tests use scripted mocks.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{RequestError, RequestResult};

// == Method ==
/// HTTP-style request methods understood by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Idempotent methods take the cached, deduplicated read path;
    /// the rest take the mutating path.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Method::Get)
    }

    /// Canonical uppercase name, used in derived request keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Transport Request ==
/// One outbound call, fully described.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Builds a request with no params, headers, or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

// == Transport Response ==
/// What the transport produced: a status class plus a JSON body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into the status failure it represents.
    pub fn into_result(self) -> RequestResult<TransportResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            let message = self
                .body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            Err(RequestError::Status {
                status: self.status,
                message,
            })
        }
    }
}

// == Progress Callback ==
/// Receives fractional upload progress in `[0.0, 1.0]`.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

// == Transport ==
/// Abstract request-performing capability.
///
/// Implementations return `Ok` for any obtained response (the coordinator
/// maps non-2xx statuses to failures) and `Err(RequestError::Transport)`
/// when no response could be obtained at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request.
    async fn send(&self, request: TransportRequest) -> RequestResult<TransportResponse>;

    /// Performs one request, reporting fractional upload progress. The
    /// default implementation ignores progress and delegates to `send`.
    async fn send_with_progress(
        &self,
        request: TransportRequest,
        _on_progress: ProgressFn,
    ) -> RequestResult<TransportResponse> {
        self.send(request).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_idempotency() {
        assert!(Method::Get.is_idempotent());
        assert!(!Method::Post.is_idempotent());
        assert!(!Method::Delete.is_idempotent());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn test_response_success_classes() {
        let ok = TransportResponse {
            status: 204,
            body: Value::Null,
        };
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn test_response_failure_maps_to_status_error() {
        let response = TransportResponse {
            status: 502,
            body: json!({"message": "bad gateway"}),
        };
        let err = response.into_result().unwrap_err();
        assert_eq!(
            err,
            RequestError::Status {
                status: 502,
                message: "bad gateway".to_string(),
            }
        );
    }

    #[test]
    fn test_response_failure_without_message() {
        let response = TransportResponse {
            status: 404,
            body: Value::Null,
        };
        match response.into_result().unwrap_err() {
            RequestError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "request failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
