//! Recency Tracker Module
//!
//! Keeps the touch order of live keys for the eviction paths.

use std::collections::VecDeque;

// == Recency Tracker ==
/// Tracks the order in which keys were last touched.
///
/// Keys are stored in a VecDeque where:
/// - Front (head) = Least recently touched
/// - Back (tail) = Most recently touched
#[derive(Debug, Default)]
pub struct RecencyTracker {
    /// Order of keys by touch time
    order: VecDeque<String>,
}

impl RecencyTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently touched (moves it to the tail).
    ///
    /// If key exists, removes it first then appends it.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Pop Newest ==
    /// Returns and removes the most recently touched key (the tail).
    pub fn pop_newest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    // == Pop Oldest ==
    /// Returns and removes the least recently touched key (the head).
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    #[cfg(test)]
    pub fn peek_newest(&self) -> Option<&String> {
        self.order.back()
    }

    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }

    /// Iterates keys from least to most recently touched.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }
}
