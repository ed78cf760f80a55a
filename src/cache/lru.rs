//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::BTreeMap;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch hands out a fresh, strictly increasing sequence number, so
/// the smallest number is always the least recently used key and ties
/// cannot occur.
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Keys by the sequence number of their latest access
    order: BTreeMap<u64, K>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    // == Touch ==
    /// Marks a key as most recently used and returns its new sequence number.
    ///
    /// `previous` is the sequence number the key was tracked under, if any.
    pub fn touch(&mut self, key: K, previous: Option<u64>) -> u64 {
        if let Some(seq) = previous {
            self.order.remove(&seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key);
        seq
    }

    // == Remove ==
    /// Stops tracking the key registered under `seq`.
    pub fn remove(&mut self, seq: u64) -> Option<K> {
        self.order.remove(&seq)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.values().next()
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.values()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
