//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use memo_cache::{Cache, CacheConfig};

/// Installs a test subscriber once; `RUST_LOG=memo_cache=trace` shows janitor output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts loader invocations.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A cache whose loader returns the key itself and counts its calls.
pub fn identity_cache(max_entries: usize, ttl: Duration) -> (Cache<String>, CallCounter) {
    init_tracing();
    let counter = CallCounter::default();
    let loader_counter = counter.clone();
    let cache = Cache::with_config(
        move |key: &str| {
            loader_counter.bump();
            key.to_string()
        },
        CacheConfig::default()
            .with_max_entries(max_entries)
            .with_ttl(ttl),
    )
    .expect("valid test config");
    (cache, counter)
}
