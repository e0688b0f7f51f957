//! Cache Entry Module
//!
//! Defines the structure of individual cache entries: the payload plus the
//! timestamps and access bookkeeping used for TTL expiry and LRU eviction.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached value with its expiry and access metadata.
///
/// Invariant: `expires_at >= created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored payload
    pub data: T,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Absolute expiry timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Configuration epoch tag of the owning store at creation time
    pub version: String,
    /// Number of successful reads of this entry
    pub access_count: u64,
    /// Timestamp of the most recent read; eviction ordering key
    pub last_accessed: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl_ms` milliseconds from now.
    pub fn new(data: T, ttl_ms: u64, version: &str) -> Self {
        let now = current_timestamp_ms();
        Self {
            data,
            created_at: now,
            expires_at: now + ttl_ms,
            version: version.to_string(),
            access_count: 0,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Returns true once the current time passes `expires_at`.
    ///
    /// Boundary condition: an entry is still valid at exactly `expires_at`
    /// (`now <= expires_at` is a hit), matching the read-path contract.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() > self.expires_at
    }

    // == Touch ==
    /// Records a successful read: bumps the access count and refreshes the
    /// last-accessed timestamp used for eviction ordering.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = current_timestamp_ms();
    }

    // == Refresh ==
    /// Extends the expiry to `ttl_ms` milliseconds from now without
    /// changing the payload.
    pub fn refresh(&mut self, ttl_ms: u64) {
        self.expires_at = current_timestamp_ms() + ttl_ms;
    }

    // == Time To Live ==
    /// Remaining lifetime in milliseconds; zero once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let now = current_timestamp_ms();
        self.expires_at.saturating_sub(now)
    }
}

// == Utility Functions ==
/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
