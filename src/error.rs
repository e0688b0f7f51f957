//! Error types for the cache and request layer
//!
//! Provides unified error handling using thiserror. Cache-internal failures
//! (serialization, persistence) never escape the store's public operations;
//! request failures propagate unchanged through retry and deduplication.

use thiserror::Error;

use crate::request::ApiResponse;

// == Cache Error Enum ==
/// Errors raised by cache construction and administration.
///
/// Persistence and codec failures during normal store operation are caught
/// and logged inside `CacheStore`; these variants surface only through the
/// persistence backend trait and the registry.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Snapshot encoding or decoding failed
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    /// The persistence backend could not store or load a payload
    #[error("Persistence backend failure: {0}")]
    Persistence(String),

    /// A named cache already exists with a different payload type
    #[error("Cache '{name}' is registered with a different payload type")]
    TypeMismatch { name: String },
}

// == Request Error Enum ==
/// Failure taxonomy for coordinated requests.
///
/// Cloneable because a deduplicated in-flight call fans its outcome out to
/// every waiter; each waiter observes an identical error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// No response was obtained (connectivity, DNS, aborted stream)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A response was obtained but its status indicates failure
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The payload in a successful response could not be decoded
    #[error("Response body decode failed: {0}")]
    Decode(String),

    /// The shared in-flight call terminated without delivering an outcome
    #[error("In-flight request was dropped before settlement")]
    InFlightDropped,
}

impl RequestError {
    // == Default Retryability ==
    /// Default retry classification: transport-level failures and 5xx
    /// statuses are retryable; 4xx statuses and decode failures are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Transport(_) => true,
            RequestError::Status { status, .. } => *status >= 500,
            RequestError::Decode(_) => false,
            RequestError::InFlightDropped => true,
        }
    }

    // == Envelope Conversion ==
    /// Renders the error in the uniform response envelope shape
    /// (`success: false`, `message` populated, `data` absent).
    pub fn to_envelope<T>(&self) -> ApiResponse<T> {
        ApiResponse::failure(self.to_string())
    }
}

// == Result Type Aliases ==
/// Convenience Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for coordinated requests.
pub type RequestResult<T> = std::result::Result<T, RequestError>;
