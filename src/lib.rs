//! Memo Cache - An in-process memoization cache
//!
//! Serves repeated lookups from memory, loads misses through a caller-supplied
//! loader, expires entries after a fixed TTL and bounds the entry count.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheEntry, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::JanitorHandle;
