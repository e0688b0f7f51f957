//! Cache Statistics Module
//!
//! Tracks cache performance metrics. The hit rate is derived from dedicated
//! hit/miss counters (a plain hits / (hits + misses) ratio), never from
//! entry counts or cumulative access totals.

use serde::Serialize;

// == Cache Stats ==
/// Performance counters and a point-in-time profile of a cache store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful reads
    pub hits: u64,
    /// Number of failed reads (absent or expired)
    pub misses: u64,
    /// Number of entries evicted by the LRU policy
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Configured maximum number of entries
    pub max_size: usize,
    /// Entries already past expiry but not yet swept
    pub expired_pending_sweep: usize,
    /// Approximate serialized footprint of the entry map, in bytes
    pub memory_bytes: usize,
    /// Creation timestamp of the oldest entry (Unix ms), if any
    pub oldest_entry: Option<u64>,
    /// Creation timestamp of the newest entry (Unix ms), if any
    pub newest_entry: Option<u64>,
    /// Sum of access counts across current entries
    pub total_accesses: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates stats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }
}

// == Global Stats ==
/// Aggregate of every cache registered with a
/// [`CacheRegistry`](crate::cache::CacheRegistry).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStats {
    /// Number of registered caches
    pub cache_count: usize,
    /// Sum of entry counts
    pub total_size: usize,
    /// Sum of hit counters
    pub total_hits: u64,
    /// Sum of miss counters
    pub total_misses: u64,
    /// Sum of approximate footprints, in bytes
    pub total_memory_bytes: usize,
    /// Unweighted mean of per-cache hit rates
    pub average_hit_rate: f64,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_hit_rate_bounded_under_heavy_reuse() {
        // Re-reading few keys many times must never push the rate past 1.0
        let mut stats = CacheStats::new();
        for _ in 0..1000 {
            stats.record_hit();
        }
        stats.record_miss();
        assert!(stats.hit_rate() <= 1.0);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction();
        stats.record_eviction();
        assert_eq!(stats.evictions, 2);
    }
}
