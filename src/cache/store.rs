//! Eviction Store Module
//!
//! Bounded key-value storage combining LRU tracking with TTL buckets.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::cache::clock::bucket_of;
use crate::cache::{CacheEntry, Clock, LruTracker, MonotonicClock, StoreStats};
use crate::error::{CacheError, Result};

// == Store Config ==
/// Capacity and TTL of a store. Either may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of entries, None = unbounded
    pub capacity: Option<usize>,
    /// Width of a TTL bucket, None = entries never expire
    pub ttl: Option<Duration>,
}

/// Eviction behavior derived from a [`StoreConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Capacity 0: nothing is ever stored
    Disabled,
    Unbounded,
    Lru,
    Ttl,
    /// Keys live in the current bucket, LRU applies across all buckets
    Combined,
}

impl StoreConfig {
    pub fn lru(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ttl: None,
        }
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self {
            capacity: None,
            ttl: Some(ttl),
        }
    }

    pub fn lru_ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: Some(capacity),
            ttl: Some(ttl),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    // == Validate ==
    /// Checks the configuration and returns the resulting mode.
    ///
    /// Capacity 0 on its own is the valid "disabled" store. Combined with a
    /// TTL it is rejected, as is a zero-width TTL.
    pub fn validate(&self) -> Result<StoreMode> {
        if self.ttl == Some(Duration::ZERO) {
            return Err(CacheError::InvalidTtl(
                "TTL window must be longer than zero".to_string(),
            ));
        }

        let mode = match (self.capacity, self.ttl) {
            (Some(0), Some(_)) => {
                return Err(CacheError::CapacityMisconfiguration(
                    "TTL store requires a positive capacity".to_string(),
                ))
            }
            (Some(0), None) => StoreMode::Disabled,
            (Some(_), None) => StoreMode::Lru,
            (Some(_), Some(_)) => StoreMode::Combined,
            (None, Some(_)) => StoreMode::Ttl,
            (None, None) => StoreMode::Unbounded,
        };
        Ok(mode)
    }
}

/// Result of a [`EvictionStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    /// Key was present; value replaced and recency refreshed
    Replaced,
    /// Store has capacity 0
    Rejected,
}

// == Eviction Store ==
/// Main cache storage with LRU eviction and TTL support.
///
/// Expiry is lazy: an entry from an older bucket is dropped when it is
/// looked up, or by an explicit [`purge_expired`](Self::purge_expired).
pub struct EvictionStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Eviction and expiry counters
    stats: StoreStats,
    mode: StoreMode,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
}

impl<K, V> EvictionStore<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    // == Constructor ==
    /// Creates a store timed by a [`MonotonicClock`].
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a store timed by the given clock.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mode = config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: StoreStats::default(),
            mode,
            config,
            clock,
        })
    }

    fn current_bucket(&self, now: Duration) -> Option<u64> {
        self.config.ttl.map(|ttl| bucket_of(now, ttl))
    }

    // == Get ==
    /// Retrieves a value and marks it most recently used.
    ///
    /// An entry from an earlier bucket is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let bucket = self.current_bucket(now);

        let (stale, seq) = match self.entries.get(key) {
            Some(entry) => (entry.is_stale(bucket), entry.seq),
            None => return None,
        };

        if stale {
            self.entries.remove(key);
            self.lru.remove(seq);
            self.stats.record_expiration();
            debug!(?key, "Expired entry dropped on lookup");
            return None;
        }

        let seq = self.lru.touch(key.clone(), Some(seq));
        let entry = self.entries.get_mut(key)?;
        entry.touch(now, seq);
        Some(entry.value.clone())
    }

    // == Peek ==
    /// Returns a live value without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let bucket = self.current_bucket(self.clock.now());
        self.entries
            .get(key)
            .filter(|entry| !entry.is_stale(bucket))
            .map(|entry| &entry.value)
    }

    /// True if a live value is stored under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    // == Put ==
    /// Stores a value under `key`.
    ///
    /// If the key already exists, the value is overwritten and moved into
    /// the current bucket. If the store is at capacity, the least recently
    /// used entry is evicted first, whatever bucket it is in.
    pub fn put(&mut self, key: K, value: V) -> PutOutcome {
        if self.mode == StoreMode::Disabled {
            trace!(?key, "Store disabled, value not cached");
            return PutOutcome::Rejected;
        }

        let now = self.clock.now();
        let bucket = self.current_bucket(now);

        if let Some(entry) = self.entries.get_mut(&key) {
            let seq = self.lru.touch(key, Some(entry.seq));
            *entry = CacheEntry::new(value, now, bucket, seq);
            return PutOutcome::Replaced;
        }

        if let Some(capacity) = self.config.capacity {
            while self.entries.len() >= capacity {
                match self.lru.evict_oldest() {
                    Some(evicted) => {
                        self.entries.remove(&evicted);
                        self.stats.record_eviction();
                        debug!(key = ?evicted, "Evicted least recently used entry");
                    }
                    None => break,
                }
            }
        }

        let seq = self.lru.touch(key.clone(), None);
        self.entries.insert(key, CacheEntry::new(value, now, bucket, seq));
        PutOutcome::Inserted
    }

    // == Invalidate ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn invalidate(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.lru.remove(entry.seq);
                true
            }
            None => false,
        }
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Purge Expired ==
    /// Removes all entries outside the current bucket.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        if self.config.ttl.is_none() {
            return 0;
        }

        let bucket = self.current_bucket(self.clock.now());
        let expired: Vec<(K, u64)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_stale(bucket))
            .map(|(key, entry)| (key.clone(), entry.seq))
            .collect();

        for (key, seq) in &expired {
            self.entries.remove(key);
            self.lru.remove(*seq);
            self.stats.record_expiration();
        }

        expired.len()
    }

    /// Stored keys from least to most recently used, stale ones included.
    pub fn keys(&self) -> Vec<K> {
        self.lru.iter().cloned().collect()
    }

    // == Stats ==
    /// Returns eviction counters and the current size.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            len: self.entries.len(),
            ..self.stats
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn capacity(&self) -> Option<usize> {
        self.config.capacity
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.config.ttl
    }

    // == Length ==
    /// Returns the number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Debug for EvictionStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionStore")
            .field("mode", &self.mode)
            .field("config", &self.config)
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    fn lru_store(capacity: usize) -> EvictionStore<String, String> {
        EvictionStore::new(StoreConfig::lru(capacity)).unwrap()
    }

    fn ttl_store(config: StoreConfig) -> (EvictionStore<String, u32>, ManualClock) {
        let clock = ManualClock::new();
        let store = EvictionStore::with_clock(config, Arc::new(clock.clone())).unwrap();
        (store, clock)
    }

    fn k(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_store_new() {
        let store = lru_store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.mode(), StoreMode::Lru);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = lru_store(100);

        assert_eq!(store.put(k("key1"), k("value1")), PutOutcome::Inserted);
        assert_eq!(store.get(&k("key1")), Some(k("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = lru_store(100);
        assert_eq!(store.get(&k("nonexistent")), None);
    }

    #[test]
    fn test_store_invalidate() {
        let mut store = lru_store(100);

        store.put(k("key1"), k("value1"));
        assert!(store.invalidate(&k("key1")));
        assert!(!store.invalidate(&k("key1")));

        assert!(store.is_empty());
        assert_eq!(store.get(&k("key1")), None);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = lru_store(100);

        store.put(k("key1"), k("value1"));
        assert_eq!(store.put(k("key1"), k("value2")), PutOutcome::Replaced);

        assert_eq!(store.get(&k("key1")), Some(k("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = lru_store(3);

        store.put(k("key1"), k("value1"));
        store.put(k("key2"), k("value2"));
        store.put(k("key3"), k("value3"));

        // Cache is full, adding key4 should evict key1 (oldest)
        store.put(k("key4"), k("value4"));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&k("key1")), None);
        assert!(store.get(&k("key2")).is_some());
        assert!(store.get(&k("key3")).is_some());
        assert!(store.get(&k("key4")).is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = lru_store(3);

        store.put(k("key1"), k("value1"));
        store.put(k("key2"), k("value2"));
        store.put(k("key3"), k("value3"));

        // Access key1 to make it most recently used
        store.get(&k("key1"));

        // Adding key4 should evict key2 (now oldest)
        store.put(k("key4"), k("value4"));

        assert!(store.get(&k("key1")).is_some());
        assert_eq!(store.get(&k("key2")), None);
    }

    #[test]
    fn test_store_peek_does_not_touch() {
        let mut store = lru_store(2);

        store.put(k("a"), k("1"));
        store.put(k("b"), k("2"));
        assert_eq!(store.peek(&k("a")), Some(&k("1")));

        store.put(k("c"), k("3"));
        assert!(!store.contains(&k("a")));
    }

    #[test]
    fn test_store_zero_capacity_rejects() {
        let mut store = lru_store(0);

        assert_eq!(store.mode(), StoreMode::Disabled);
        assert_eq!(store.put(k("a"), k("1")), PutOutcome::Rejected);
        assert_eq!(store.put(k("a"), k("1")), PutOutcome::Rejected);
        assert!(store.is_empty());
        assert_eq!(store.get(&k("a")), None);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(StoreConfig::unbounded().validate().unwrap(), StoreMode::Unbounded);
        assert_eq!(
            StoreConfig::ttl(Duration::from_secs(1)).validate().unwrap(),
            StoreMode::Ttl
        );
        assert_eq!(
            StoreConfig::lru_ttl(3, Duration::from_secs(1)).validate().unwrap(),
            StoreMode::Combined
        );
        assert!(matches!(
            StoreConfig::lru_ttl(0, Duration::from_secs(1)).validate(),
            Err(CacheError::CapacityMisconfiguration(_))
        ));
        assert!(matches!(
            StoreConfig::ttl(Duration::ZERO).validate(),
            Err(CacheError::InvalidTtl(_))
        ));
    }

    #[test]
    fn test_store_ttl_bucket_expiry() {
        let (mut store, clock) = ttl_store(StoreConfig::ttl(Duration::from_secs(1)));

        store.put(k("a"), 1);
        clock.set(Duration::from_millis(999));
        assert_eq!(store.get(&k("a")), Some(1));

        clock.set(Duration::from_millis(1000));
        assert_eq!(store.get(&k("a")), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_ttl_is_bucketed_not_sliding() {
        let (mut store, clock) = ttl_store(StoreConfig::ttl(Duration::from_secs(10)));

        // Inserted late in bucket 0, so it lives only 1s
        clock.set(Duration::from_secs(9));
        store.put(k("a"), 1);
        clock.set(Duration::from_secs(10));
        assert_eq!(store.get(&k("a")), None);
    }

    #[test]
    fn test_store_combined_put_moves_entry_to_current_bucket() {
        let (mut store, clock) =
            ttl_store(StoreConfig::lru_ttl(2, Duration::from_secs(1)));

        store.put(k("old"), 1);
        clock.set(Duration::from_millis(1500));
        store.put(k("fresh"), 2);

        // Re-putting "old" moves it into bucket 1 as the most recent entry
        store.put(k("old"), 3);
        store.put(k("newest"), 4);

        assert_eq!(store.get(&k("fresh")), None);
        assert_eq!(store.get(&k("old")), Some(3));
        assert_eq!(store.get(&k("newest")), Some(4));
    }

    #[test]
    fn test_store_combined_evicts_across_buckets() {
        let (mut store, clock) =
            ttl_store(StoreConfig::lru_ttl(2, Duration::from_secs(1)));

        store.put(k("a"), 1);
        store.put(k("b"), 2);
        clock.set(Duration::from_secs(1));

        // Stale entries still occupy capacity until evicted or looked up
        store.put(k("c"), 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys(), vec![k("b"), k("c")]);
    }

    #[test]
    fn test_store_purge_expired() {
        let (mut store, clock) = ttl_store(StoreConfig::ttl(Duration::from_secs(1)));

        store.put(k("key1"), 1);
        clock.set(Duration::from_millis(1200));
        store.put(k("key2"), 2);

        let removed = store.purge_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&k("key2")), Some(2));
    }

    #[test]
    fn test_store_purge_without_ttl_is_noop() {
        let mut store = lru_store(10);
        store.put(k("a"), k("1"));
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_hit_updates_last_accessed() {
        let clock = ManualClock::new();
        let mut store: EvictionStore<String, u32> =
            EvictionStore::with_clock(StoreConfig::lru(4), Arc::new(clock.clone())).unwrap();

        store.put(k("a"), 1);
        clock.advance(Duration::from_secs(2));
        store.get(&k("a"));

        let entry = store.entries.get(&k("a")).unwrap();
        assert_eq!(entry.inserted_at, Duration::ZERO);
        assert_eq!(entry.last_accessed, Duration::from_secs(2));
    }

    #[test]
    fn test_store_clear_keeps_counters() {
        let mut store = lru_store(1);
        store.put(k("a"), k("1"));
        store.put(k("b"), k("2"));
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.len, 0);
        assert_eq!(stats.evictions, 1);
    }
}
