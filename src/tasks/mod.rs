//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Janitor: Sweeps expired cache entries at configured intervals

mod janitor;

pub use janitor::JanitorHandle;

pub(crate) use janitor::{spawn_janitor, sweep_expired};
