//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from a live entry
    pub hits: u64,
    /// Lookups that went through the loader, plus `put` inserts of new keys
    pub misses: u64,
    /// Entries dropped by the capacity or expiry-path eviction rules
    pub evictions: u64,
    /// Expired entries removed by lookups or the janitor
    pub expirations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: u64) {
        self.expirations += count;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
