//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with bucket metadata.

use std::time::Duration;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Timestamps are readings of the owning store's clock.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Clock reading when the value was stored
    pub inserted_at: Duration,
    /// Clock reading of the latest hit (or the insert)
    pub last_accessed: Duration,
    /// TTL bucket the value belongs to, None = store has no TTL
    pub bucket: Option<u64>,
    /// Position in the store's access order
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now` - Current clock reading
    /// * `bucket` - Current TTL bucket, if the store has a TTL
    /// * `seq` - Access sequence number assigned by the LRU tracker
    pub fn new(value: V, now: Duration, bucket: Option<u64>, seq: u64) -> Self {
        Self {
            value,
            inserted_at: now,
            last_accessed: now,
            bucket,
            seq,
        }
    }

    // == Is Stale ==
    /// Checks whether the entry belongs to a bucket other than `current`.
    ///
    /// Entries of a store without TTL carry no bucket and are never stale.
    pub fn is_stale(&self, current: Option<u64>) -> bool {
        self.bucket != current
    }

    // == Touch ==
    /// Records a hit: refreshes recency, leaves the value alone.
    pub fn touch(&mut self, now: Duration, seq: u64) {
        self.last_accessed = now;
        self.seq = seq;
    }

    // == Age ==
    /// Time since the value was stored.
    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.inserted_at)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("v", Duration::from_secs(3), Some(3), 0);

        assert_eq!(entry.value, "v");
        assert_eq!(entry.inserted_at, Duration::from_secs(3));
        assert_eq!(entry.last_accessed, entry.inserted_at);
        assert_eq!(entry.bucket, Some(3));
    }

    #[test]
    fn test_entry_without_bucket_never_stale() {
        let entry = CacheEntry::new(1, Duration::ZERO, None, 0);
        assert!(!entry.is_stale(None));
    }

    #[test]
    fn test_entry_stale_in_other_bucket() {
        let entry = CacheEntry::new(1, Duration::ZERO, Some(0), 0);

        assert!(!entry.is_stale(Some(0)));
        assert!(entry.is_stale(Some(1)));
    }

    #[test]
    fn test_touch_keeps_insert_time() {
        let mut entry = CacheEntry::new(1, Duration::from_secs(1), None, 0);
        entry.touch(Duration::from_secs(4), 7);

        assert_eq!(entry.inserted_at, Duration::from_secs(1));
        assert_eq!(entry.last_accessed, Duration::from_secs(4));
        assert_eq!(entry.seq, 7);
        assert_eq!(entry.age(Duration::from_secs(4)), Duration::from_secs(3));
    }

    #[test]
    fn test_age_saturates() {
        let entry = CacheEntry::new(1, Duration::from_secs(5), None, 0);
        assert_eq!(entry.age(Duration::from_secs(2)), Duration::ZERO);
    }
}
