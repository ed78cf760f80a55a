//! Cache Module
//!
//! Provides in-memory storage with LRU eviction, TTL buckets and
//! single-flight reservations.

mod clock;
mod entry;
mod lru;
mod shared;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{bucket_of, Clock, ManualClock, MonotonicClock, SystemClock};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use shared::{Lookup, Reservation, SharedStore};
pub use stats::{CacheStats, HitCounters, StoreStats};
pub use store::{EvictionStore, PutOutcome, StoreConfig, StoreMode};
