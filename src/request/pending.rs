//! Pending Request Table
//!
//! Deduplication bookkeeping: one shared in-flight outcome per request key.
//! Registration is synchronous under the table lock, so two near
//! simultaneous callers can never both decide "no one is in flight" —
//! exactly one becomes the leader and issues the underlying call.
//!
//! Invariant: a key is present iff a call for it is outstanding. Settlement
//! removes the key exactly once, success or failure, so a failed call never
//! leaves a stuck key blocking future callers.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::RequestError;
use crate::request::ApiResponse;

// == Shared Outcome ==
/// The settlement every caller coalesced onto one in-flight call observes.
pub type Outcome = Result<ApiResponse<Value>, RequestError>;

// == Registration ==
/// Result of registering interest in a request key.
pub enum Registration {
    /// No call was outstanding: the caller must issue the underlying call
    /// and settle the key. Its own receiver is already enrolled.
    Leader(oneshot::Receiver<Outcome>),
    /// A call is outstanding: the caller just awaits the shared outcome.
    Waiter(oneshot::Receiver<Outcome>),
}

// == Pending Request Table ==
/// Mapping from request key to the waiters of its single in-flight call.
#[derive(Default)]
pub struct PendingRequestTable {
    inner: Mutex<HashMap<String, Vec<oneshot::Sender<Outcome>>>>,
}

impl std::fmt::Debug for PendingRequestTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequestTable")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl PendingRequestTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers interest in `key` in one synchronous critical section.
    ///
    /// Returns `Leader` (and marks the key in-flight) when no call is
    /// outstanding, `Waiter` otherwise.
    pub fn register(&self, key: &str) -> Registration {
        let mut inner = self.inner.lock().expect("pending table lock poisoned");
        let (tx, rx) = oneshot::channel();

        match inner.get_mut(key) {
            Some(waiters) => {
                waiters.push(tx);
                debug!(key = %key, waiters = waiters.len(), "coalesced onto in-flight request");
                Registration::Waiter(rx)
            }
            None => {
                inner.insert(key.to_string(), vec![tx]);
                Registration::Leader(rx)
            }
        }
    }

    // == Settle ==
    /// Settles `key`: removes it and fans `outcome` out to every waiter.
    ///
    /// Called exactly once per in-flight call, on success or failure.
    /// Waiters that stopped listening are skipped; their disinterest never
    /// affects anyone else's outcome.
    pub fn settle(&self, key: &str, outcome: Outcome) {
        let waiters = self
            .inner
            .lock()
            .expect("pending table lock poisoned")
            .remove(key)
            .unwrap_or_default();

        debug!(key = %key, waiters = waiters.len(), "settling in-flight request");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    // == Is In Flight ==
    /// True while a call for `key` is outstanding.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner
            .lock()
            .expect("pending table lock poisoned")
            .contains_key(key)
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending table lock poisoned").len()
    }

    /// True when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
