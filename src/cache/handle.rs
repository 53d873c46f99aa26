//! Cache Handle Module
//!
//! The public cache: store, load coordinator, listeners and janitor behind
//! `get`, `put`, `clear`, `add_listener` and `items`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, CacheStore, Listener, ListenerHub, LoadCoordinator, Loaded, Lookup,
};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_janitor, sweep_expired, JanitorHandle};

/// Produces the value for a missing key. Assumed infallible.
pub type Loader<V> = Arc<dyn Fn(&str) -> V + Send + Sync>;

// == Cache ==
/// A memoizing key-value cache.
///
/// All state lives behind one store lock. The loader and the listeners run
/// with that lock released: a slow load only blocks other callers of the
/// same key.
///
/// The janitor thread is stopped when the cache is dropped. Share a cache
/// between threads by wrapping it in an `Arc`.
pub struct Cache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
    loader: Loader<V>,
    coordinator: LoadCoordinator<V>,
    listeners: ListenerHub<V>,
    config: CacheConfig,
    janitor: JanitorHandle,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache holding up to `max_entries` entries, with every
    /// other setting at its default, and starts its janitor.
    pub fn new<F>(loader: F, max_entries: usize) -> Result<Self>
    where
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        Self::with_config(loader, CacheConfig::default().with_max_entries(max_entries))
    }

    /// Creates a cache from a full configuration and starts its janitor.
    pub fn with_config<F>(loader: F, config: CacheConfig) -> Result<Self>
    where
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        config.validate()?;

        let store = Arc::new(Mutex::new(CacheStore::new(config.max_entries, config.ttl)));
        let janitor = spawn_janitor(Arc::downgrade(&store), config.clone())?;

        debug!(
            "Cache created: max_entries={}, ttl={:?}, cleanup_interval={:?}",
            config.max_entries, config.ttl, config.cleanup_interval
        );

        Ok(Self {
            store,
            loader: Arc::new(loader),
            coordinator: LoadCoordinator::new(),
            listeners: ListenerHub::new(),
            config,
            janitor,
        })
    }

    // == Get ==
    /// Returns the cached value for `key`, loading it on a miss or expiry.
    ///
    /// Concurrent misses for the same key share one loader call. Every caller
    /// records its own hit or miss and notifies the listeners once.
    /// A panicking loader propagates to the caller that ran it.
    pub fn get(&self, key: &str) -> V {
        let cached = self.store.lock().lookup(key);
        let value = match cached {
            Lookup::Hit(value) => value,
            Lookup::Miss => self.load(key),
        };

        self.listeners.notify(key, &value);
        value
    }

    fn load(&self, key: &str) -> V {
        // The leader stores its value before waking the waiters, so a caller
        // arriving after the flight ends finds the entry instead of reloading.
        // Waiters only count their miss: by the time they wake the entry may
        // already have been replaced or cleared.
        let loaded = self.coordinator.load(key, || {
            let value = (self.loader)(key);
            self.store.lock().insert_loaded(key, value.clone());
            value
        });

        match loaded {
            Loaded::Led(value) => value,
            Loaded::Shared(value) => {
                self.store.lock().record_miss();
                value
            }
        }
    }

    // == Put ==
    /// Inserts or replaces `key` without calling the loader.
    pub fn put(&self, key: &str, value: V) {
        self.store.lock().put(key, value.clone());
        self.listeners.notify(key, &value);
    }

    // == Clear ==
    /// Drops every entry. Statistics and listeners are kept.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    // == Remove ==
    /// Removes `key`, returning its value whether or not it had expired.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.store.lock().remove(key)
    }

    // == Add Listener ==
    /// Registers an observer of every successful `get` and `put`.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        let listener: Listener<V> = Arc::new(listener);
        self.listeners.add(listener);
    }

    // == Items ==
    /// Returns a copy of the stored entries, including expired entries the
    /// janitor has not swept yet.
    pub fn items(&self) -> HashMap<String, CacheEntry<V>> {
        self.store.lock().snapshot()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    /// Runs one janitor sweep on the calling thread.
    pub fn run_janitor_cycle(&self) -> usize {
        sweep_expired(&self.store, &self.config).removed
    }

    /// True if `key` holds an entry that has not expired. Does not touch it.
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.lock().contains_live(key)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn janitor_running(&self) -> bool {
        self.janitor.is_running()
    }
}
