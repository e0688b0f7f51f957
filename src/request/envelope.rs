//! Response Envelope
//!
//! The uniform shape every coordinated request resolves with, mirroring the
//! publishing backend's API wrapper: `{ data, success, message, timestamp }`.
//! Failures use the same shape with `success: false` and no data.

use serde::{Deserialize, Serialize};

use crate::cache::current_timestamp_ms;
use crate::error::RequestError;

// == Api Response ==
/// Uniform response envelope for all coordinator operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    /// The payload; absent on failure
    pub data: Option<T>,
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable detail; always populated on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Settlement time (Unix milliseconds). Deduplicated callers observe
    /// identical timestamps because they share one settlement.
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    // == Success ==
    /// Wraps a payload in a successful envelope stamped now.
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            message: None,
            timestamp: current_timestamp_ms(),
        }
    }

    // == Failure ==
    /// Builds a failed envelope stamped now.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            success: false,
            message: Some(message.into()),
            timestamp: current_timestamp_ms(),
        }
    }

    /// Maps the payload type, keeping the envelope metadata (including the
    /// timestamp) intact.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            data: self.data.map(f),
            success: self.success,
            message: self.message,
            timestamp: self.timestamp,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Decodes the JSON payload into a typed envelope, preserving the
    /// shared settlement timestamp.
    pub fn into_typed<T>(self) -> Result<ApiResponse<T>, RequestError>
    where
        T: serde::de::DeserializeOwned,
    {
        let data = match self.data {
            Some(value) => Some(
                serde_json::from_value(value)
                    .map_err(|e| RequestError::Decode(e.to_string()))?,
            ),
            None => None,
        };
        Ok(ApiResponse {
            data,
            success: self.success,
            message: self.message,
            timestamp: self.timestamp,
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let envelope = ApiResponse::success("novel data".to_string());
        assert!(envelope.success);
        assert_eq!(envelope.data.as_deref(), Some("novel data"));
        assert!(envelope.message.is_none());
        assert!(envelope.timestamp > 0);
    }

    #[test]
    fn test_failure_envelope() {
        let envelope: ApiResponse<()> = ApiResponse::failure("upstream 503");
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.message.as_deref(), Some("upstream 503"));
    }

    #[test]
    fn test_map_data_keeps_timestamp() {
        let envelope = ApiResponse::success(21u32);
        let stamped = envelope.timestamp;
        let doubled = envelope.map_data(|n| n * 2);
        assert_eq!(doubled.data, Some(42));
        assert_eq!(doubled.timestamp, stamped);
    }

    #[test]
    fn test_into_typed_decodes_payload() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Novel {
            title: String,
        }

        let envelope = ApiResponse::success(json!({"title": "Ashes of Ink"}));
        let typed: ApiResponse<Novel> = envelope.into_typed().unwrap();
        assert_eq!(typed.data.unwrap().title, "Ashes of Ink");
    }

    #[test]
    fn test_into_typed_rejects_mismatched_shape() {
        #[derive(Deserialize, Debug)]
        struct Novel {
            #[allow(dead_code)]
            title: String,
        }

        let envelope = ApiResponse::success(json!(["not", "an", "object"]));
        let result: Result<ApiResponse<Novel>, _> = envelope.into_typed();
        assert!(matches!(result, Err(RequestError::Decode(_))));
    }
}
