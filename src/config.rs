//! Configuration Module
//!
//! Handles cache construction parameters, loadable from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Defaults ==
/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Default time-to-live applied to every entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);
/// Default pause between janitor sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
/// Default number of entries examined per sweep batch
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 20;
/// Expired fraction of a batch at or above which the sweep runs another batch
pub const DEFAULT_SWEEP_REPEAT_THRESHOLD: f64 = 0.2;
/// Wall-clock budget for one janitor sweep
pub const DEFAULT_SWEEP_TIME_BUDGET: Duration = Duration::from_secs(1);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// TTL applied to every entry on insert or refresh
    pub ttl: Duration,
    /// Pause between janitor sweeps
    pub cleanup_interval: Duration,
    /// Entries examined per sweep batch
    pub sweep_batch_size: usize,
    /// Expired fraction of a batch that triggers another batch
    pub sweep_repeat_threshold: f64,
    /// A sweep stops repeating once it has run this long
    pub sweep_time_budget: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - TTL in seconds (default: 10)
    /// - `CLEANUP_INTERVAL` - Janitor frequency in seconds (default: 60)
    /// - `SWEEP_BATCH_SIZE` - Entries examined per sweep batch (default: 20)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_env("MAX_ENTRIES", defaults.max_entries),
            ttl: Duration::from_secs(parse_env("DEFAULT_TTL", defaults.ttl.as_secs())),
            cleanup_interval: Duration::from_secs(parse_env(
                "CLEANUP_INTERVAL",
                defaults.cleanup_interval.as_secs(),
            )),
            sweep_batch_size: parse_env("SWEEP_BATCH_SIZE", defaults.sweep_batch_size),
            ..defaults
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_sweep_batch_size(mut self, batch_size: usize) -> Self {
        self.sweep_batch_size = batch_size;
        self
    }

    pub fn with_sweep_repeat_threshold(mut self, threshold: f64) -> Self {
        self.sweep_repeat_threshold = threshold;
        self
    }

    pub fn with_sweep_time_budget(mut self, budget: Duration) -> Self {
        self.sweep_time_budget = budget;
        self
    }

    // == Validate ==
    /// Checks that every parameter is usable by the cache and its janitor.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "max_entries must be positive".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be non-zero".to_string()));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be non-zero".to_string(),
            ));
        }
        if self.sweep_batch_size == 0 {
            return Err(CacheError::InvalidConfig(
                "sweep_batch_size must be positive".to_string(),
            ));
        }
        if !(self.sweep_repeat_threshold > 0.0 && self.sweep_repeat_threshold <= 1.0) {
            return Err(CacheError::InvalidConfig(format!(
                "sweep_repeat_threshold must be in (0, 1], got {}",
                self.sweep_repeat_threshold
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            sweep_repeat_threshold: DEFAULT_SWEEP_REPEAT_THRESHOLD,
            sweep_time_budget: DEFAULT_SWEEP_TIME_BUDGET,
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
