//! Cache Store Module
//!
//! The state guarded by the cache lock: HashMap storage, recency tracking,
//! TTL expiration and the two eviction paths.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::trace;

use crate::cache::{CacheEntry, CacheStats, RecencyTracker};

// == Lookup Outcome ==
/// Result of consulting the store for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// A live entry was found; the hit is already recorded
    Hit(V),
    /// No live entry; the caller has to load the value
    Miss,
}

// == Sweep Batch ==
/// Outcome of scanning one janitor batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepBatch {
    pub scanned: usize,
    pub removed: usize,
}

impl SweepBatch {
    /// Fraction of the scanned entries that had expired.
    pub fn expired_ratio(&self) -> f64 {
        if self.scanned == 0 {
            0.0
        } else {
            self.removed as f64 / self.scanned as f64
        }
    }
}

// == Cache Store ==
/// Key-value storage with recency tracking and TTL support.
///
/// Invariant: `recency` tracks exactly the keys in `entries`.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Touch order of the stored keys
    recency: RecencyTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied on every insert or refresh
    ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and TTL.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            ttl,
        }
    }

    // == Lookup ==
    /// Looks up a live entry.
    ///
    /// A live entry records a hit and is touched. An expired entry is removed
    /// together with the oldest key if the store is still full afterwards.
    /// Misses are not recorded here; they are recorded on insert.
    pub fn lookup(&mut self, key: &str) -> Lookup<V> {
        let Some(entry) = self.entries.get(key) else {
            return Lookup::Miss;
        };

        if entry.is_expired() {
            self.entries.remove(key);
            self.recency.remove(key);
            self.stats.record_expirations(1);
            self.evict_oldest_if_full();
            return Lookup::Miss;
        }

        let value = entry.value.clone();
        self.stats.record_hit();
        self.recency.touch(key);
        Lookup::Hit(value)
    }

    // == Insert Loaded ==
    /// Stores a value produced by the loader.
    ///
    /// Records a miss. When the store then holds more than `max_entries`,
    /// the most recently touched key is evicted, which is the key just stored.
    pub fn insert_loaded(&mut self, key: &str, value: V) {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, self.ttl));
        self.recency.touch(key);
        self.stats.record_miss();

        if self.entries.len() > self.max_entries {
            self.evict_newest();
        }
    }

    // == Put ==
    /// Unconditional upsert.
    ///
    /// Updating an existing key (expired or not) replaces its entry and
    /// touches it without counting anything. Inserting a new key records a
    /// miss and evicts the most recently touched key once the store holds
    /// `max_entries` or more.
    pub fn put(&mut self, key: &str, value: V) {
        let entry = CacheEntry::new(value, self.ttl);
        if let Some(existing) = self.entries.get_mut(key) {
            *existing = entry;
            self.recency.touch(key);
            return;
        }

        self.entries.insert(key.to_string(), entry);
        self.recency.touch(key);
        self.stats.record_miss();

        if self.entries.len() >= self.max_entries {
            self.evict_newest();
        }
    }

    // == Remove ==
    /// Removes an entry by key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(key);
        Some(entry.value)
    }

    // == Clear ==
    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    // == Record Miss ==
    /// Counts a miss for a caller that received another caller's load.
    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    // == Sweep Batch ==
    /// Scans up to `batch_size` entries, starting at a random position in the
    /// map and wrapping around, and removes the expired ones.
    pub fn sweep_batch(&mut self, batch_size: usize) -> SweepBatch {
        let len = self.entries.len();
        if len == 0 {
            return SweepBatch::default();
        }

        let now = Instant::now();
        let start = rand::rng().random_range(0..len);
        let scanned = batch_size.min(len);
        let expired: Vec<String> = self
            .entries
            .iter()
            .cycle()
            .skip(start)
            .take(scanned)
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.recency.remove(key);
        }
        self.stats.record_expirations(expired.len() as u64);

        SweepBatch {
            scanned,
            removed: expired.len(),
        }
    }

    // == Snapshot ==
    /// Returns an owned copy of every stored entry, expired ones included.
    pub fn snapshot(&self) -> HashMap<String, CacheEntry<V>> {
        self.entries.clone()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// True if `key` holds an entry that has not expired.
    pub fn contains_live(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn max_entries(&self) -> usize {
        self.max_entries
    }

    #[cfg(test)]
    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    #[cfg(test)]
    pub(crate) fn recency(&self) -> &RecencyTracker {
        &self.recency
    }

    // == Evict Newest ==
    /// Overflow path: drops the tail of the recency order.
    fn evict_newest(&mut self) {
        if let Some(key) = self.recency.pop_newest() {
            self.entries.remove(&key);
            self.stats.record_eviction();
            trace!(key = %key, "evicted most recently touched entry on overflow");
        }
    }

    // == Evict Oldest If Full ==
    /// Expiry path: drops the head of the recency order while at capacity.
    fn evict_oldest_if_full(&mut self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        if let Some(key) = self.recency.pop_oldest() {
            self.entries.remove(&key);
            self.stats.record_eviction();
            trace!(key = %key, "evicted least recently touched entry after expiry");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const LONG_TTL: Duration = Duration::from_secs(300);
    const SHORT_TTL: Duration = Duration::from_millis(30);

    fn keys_of<V>(store: &CacheStore<V>) -> Vec<String>
    where
        V: Clone,
    {
        let mut keys: Vec<String> = store.snapshot().into_keys().collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<String> = CacheStore::new(100, LONG_TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_entries(), 100);
        assert_eq!(store.ttl(), LONG_TTL);
    }

    #[test]
    fn test_store_put_and_lookup() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("key1", "value1".to_string());

        assert_eq!(store.lookup("key1"), Lookup::Hit("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lookup_nonexistent() {
        let mut store: CacheStore<String> = CacheStore::new(100, LONG_TTL);

        assert_eq!(store.lookup("nonexistent"), Lookup::Miss);
        // Misses are recorded on insert, not on lookup
        assert_eq!(store.stats().misses, 0);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("key1", "value1".to_string());
        store.put("key1", "value2".to_string());

        assert_eq!(store.lookup("key1"), Lookup::Hit("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_counts_miss_only_on_insert() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("key1", 1);
        store.put("key1", 2);
        store.put("key2", 3);

        let stats = store.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_put_refreshes_expired_entry() {
        let mut store = CacheStore::new(100, SHORT_TTL);

        store.put("key1", 1);
        sleep(SHORT_TTL * 2);
        store.put("key1", 2);

        assert_eq!(store.lookup("key1"), Lookup::Hit(2));
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100, SHORT_TTL);

        store.put("key1", "value1".to_string());
        assert!(matches!(store.lookup("key1"), Lookup::Hit(_)));

        sleep(SHORT_TTL * 2);

        assert_eq!(store.lookup("key1"), Lookup::Miss);
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_put_overflow_evicts_newest() {
        let mut store = CacheStore::new(3, LONG_TTL);

        store.put("key1", 1);
        store.put("key2", 2);
        // Reaching capacity drops the key just inserted
        store.put("key3", 3);
        assert_eq!(keys_of(&store), vec!["key1", "key2"]);

        store.put("key4", 4);
        assert_eq!(keys_of(&store), vec!["key1", "key2"]);
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_insert_loaded_overflow_evicts_newest() {
        let mut store = CacheStore::new(2, LONG_TTL);

        store.insert_loaded("a", 1);
        store.insert_loaded("b", 2);
        assert_eq!(store.len(), 2);

        store.insert_loaded("c", 3);
        assert_eq!(keys_of(&store), vec!["a", "b"]);
        assert_eq!(store.stats().misses, 3);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_touch_on_lookup_changes_overflow_victim() {
        let mut store = CacheStore::new(3, LONG_TTL);

        store.insert_loaded("a", 1);
        store.insert_loaded("b", 2);
        store.insert_loaded("c", 3);

        // "a" becomes the tail; the next overflow then removes the new key
        assert_eq!(store.lookup("a"), Lookup::Hit(1));
        store.insert_loaded("d", 4);

        assert_eq!(keys_of(&store), vec!["a", "b", "c"]);
        assert_eq!(store.recency().peek_newest(), Some(&"a".to_string()));
    }

    #[test]
    fn test_expired_lookup_below_capacity_keeps_others() {
        let mut store = CacheStore::new(2, SHORT_TTL);

        store.insert_loaded("old", 1);
        sleep(SHORT_TTL * 2);
        store.insert_loaded("fresh1", 2);
        store.insert_loaded("fresh2", 3);
        // Overflow dropped "fresh2"; the store holds "old" (expired) and "fresh1"
        assert_eq!(keys_of(&store), vec!["fresh1", "old"]);

        assert_eq!(store.lookup("old"), Lookup::Miss);

        // One entry left, below capacity, so nothing else is evicted
        assert_eq!(keys_of(&store), vec!["fresh1"]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_expired_lookup_at_capacity_drops_head() {
        let mut store = CacheStore::new(10, SHORT_TTL);
        store.put("stale", 0);
        store.ttl = LONG_TTL;
        store.put("b", 1);
        store.put("c", 2);
        sleep(SHORT_TTL * 2);

        // Shrinking the bound leaves the store at capacity after the expiry
        store.max_entries = 2;
        assert_eq!(store.lookup("stale"), Lookup::Miss);

        // "b" was the head once "stale" left the order
        assert_eq!(keys_of(&store), vec!["c"]);
        assert_eq!(store.recency().iter().collect::<Vec<_>>(), vec!["c"]);
        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_store_remove() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("key1", "value1".to_string());
        assert_eq!(store.remove("key1"), Some("value1".to_string()));
        assert_eq!(store.remove("key1"), None);

        assert!(store.is_empty());
        assert!(store.recency().is_empty());
    }

    #[test]
    fn test_store_clear_keeps_stats() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("a", 1);
        store.put("b", 2);
        let _ = store.lookup("a");
        store.clear();

        assert!(store.is_empty());
        assert!(store.recency().is_empty());
        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_sweep_batch_removes_expired() {
        let mut store = CacheStore::new(100, SHORT_TTL);

        for i in 0..5 {
            store.put(&format!("key{}", i), i);
        }
        sleep(SHORT_TTL * 2);

        let batch = store.sweep_batch(20);
        assert_eq!(batch, SweepBatch { scanned: 5, removed: 5 });
        assert_eq!(batch.expired_ratio(), 1.0);
        assert!(store.is_empty());
        assert!(store.recency().is_empty());
        assert_eq!(store.stats().expirations, 5);
    }

    #[test]
    fn test_sweep_batch_respects_batch_size() {
        let mut store = CacheStore::new(100, LONG_TTL);

        for i in 0..10 {
            store.put(&format!("key{}", i), i);
        }

        let batch = store.sweep_batch(4);
        assert_eq!(batch, SweepBatch { scanned: 4, removed: 0 });
        assert_eq!(batch.expired_ratio(), 0.0);
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_sweep_batch_empty_store() {
        let mut store: CacheStore<u32> = CacheStore::new(100, LONG_TTL);
        let batch = store.sweep_batch(20);
        assert_eq!(batch, SweepBatch::default());
        assert_eq!(batch.expired_ratio(), 0.0);
    }

    #[test]
    fn test_sweep_batch_reaches_entries_behind_live_ones() {
        let mut store = CacheStore::new(1000, SHORT_TTL);
        for i in 0..100 {
            store.put(&format!("key{}", i), i);
        }
        sleep(SHORT_TTL * 2);

        // Refresh the keys the map yields first; the expired ones sit behind them
        store.ttl = LONG_TTL;
        let hot: Vec<String> = store.entries.keys().take(20).cloned().collect();
        for key in &hot {
            store.put(key, 0);
        }

        let mut removed = 0;
        for _ in 0..200 {
            removed += store.sweep_batch(20).removed;
            if store.len() == hot.len() {
                break;
            }
        }

        assert_eq!(removed, 80);
        assert_eq!(keys_of(&store), {
            let mut hot = hot.clone();
            hot.sort();
            hot
        });
    }

    #[test]
    fn test_record_miss() {
        let mut store: CacheStore<u32> = CacheStore::new(10, LONG_TTL);
        store.record_miss();
        assert_eq!(store.stats().misses, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_contains_live() {
        let mut store = CacheStore::new(100, SHORT_TTL);

        store.put("key1", 1);
        assert!(store.contains_live("key1"));
        assert!(!store.contains_live("missing"));

        sleep(SHORT_TTL * 2);
        assert!(!store.contains_live("key1"));
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100, LONG_TTL);

        store.put("key1", "value1".to_string());
        let _ = store.lookup("key1");
        let _ = store.lookup("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
