//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Only construction can fail; lookups and inserts are infallible.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background janitor thread could not be started
    #[error("Failed to spawn janitor: {0}")]
    Spawn(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
