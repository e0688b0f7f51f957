//! Request Module
//!
//! The network-call side of the layer: the response envelope, the abstract
//! transport boundary, bounded retry with backoff, deduplication
//! bookkeeping, and the coordinator tying them together.

mod coordinator;
mod envelope;
mod pending;
mod retry;
mod transport;

// Re-export public types
pub use coordinator::{derive_request_key, BatchItem, RequestCoordinator};
pub use envelope::ApiResponse;
pub use pending::{Outcome, PendingRequestTable, Registration};
pub use retry::RetryExecutor;
pub use transport::{Method, ProgressFn, Transport, TransportRequest, TransportResponse};
