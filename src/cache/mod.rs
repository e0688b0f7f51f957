//! Cache Module
//!
//! Generic time-bounded caching with LRU eviction, optional snapshot
//! persistence, and a registry of named cache instances.

mod entry;
pub mod persist;
mod registry;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use persist::{FileBackend, JsonCodec, MemoryBackend, PersistenceBackend, Snapshot, SnapshotCodec};
pub use registry::{CacheAdmin, CacheRegistry};
pub use shared::SharedCache;
pub use stats::{CacheStats, GlobalStats};
pub use store::CacheStore;
