//! Cache Module
//!
//! Provides in-memory memoization with TTL expiration, bounded capacity,
//! single-flight loading and change listeners.

mod entry;
mod handle;
mod listeners;
mod loader;
mod recency;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use handle::{Cache, Loader};
pub use stats::CacheStats;

pub(crate) use listeners::{Listener, ListenerHub};
pub(crate) use loader::{LoadCoordinator, Loaded};
pub(crate) use recency::RecencyTracker;
pub(crate) use store::{CacheStore, Lookup};
