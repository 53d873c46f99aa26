//! Notification Hub Module
//!
//! Ordered observers called with `(key, value)` after every successful
//! `get` and `put`.

use std::sync::Arc;

use parking_lot::RwLock;

/// An observer of successful lookups and inserts.
pub type Listener<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

// == Listener Hub ==
/// Append-only, copy-on-write list of listeners.
///
/// Registration swaps in a new list, so a notification in progress keeps
/// iterating the list it started with.
pub struct ListenerHub<V> {
    listeners: RwLock<Arc<[Listener<V>]>>,
}

impl<V> ListenerHub<V> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Arc::from(Vec::new())),
        }
    }

    // == Add ==
    /// Appends a listener; it runs after every listener registered before it.
    pub fn add(&self, listener: Listener<V>) {
        let mut listeners = self.listeners.write();
        let mut next: Vec<Listener<V>> = listeners.iter().cloned().collect();
        next.push(listener);
        *listeners = Arc::from(next);
    }

    // == Notify ==
    /// Calls every listener in registration order.
    pub fn notify(&self, key: &str, value: &V) {
        let snapshot = self.listeners.read().clone();
        for listener in snapshot.iter() {
            listener(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}
