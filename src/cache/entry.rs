//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value together with its expiration time.
///
/// Entries are replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was inserted or last refreshed
    pub created_at: Instant,
    /// `created_at + ttl`
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::new_at(value, ttl, Instant::now())
    }

    /// Creates a new cache entry expiring `ttl` after `now`.
    pub fn new_at(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
