//! Clock Module
//!
//! Time sources for TTL bucketing. Readings are durations since an epoch
//! chosen by each clock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

// == Clock Trait ==
/// Source of the current time for a store.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> Duration;
}

/// Index of the TTL bucket containing `now`: `floor(now / ttl)`.
pub fn bucket_of(now: Duration, ttl: Duration) -> u64 {
    (now.as_nanos() / ttl.as_nanos().max(1)) as u64
}

// == Monotonic Clock ==
/// Time elapsed since the clock was created. Buckets therefore start when
/// the cache is built, not at the Unix epoch.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

// == System Clock ==
/// Wall clock: milliseconds since the Unix epoch. Buckets line up across
/// processes, but the clock can jump.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        Duration::from_millis(Utc::now().timestamp_millis().max(0) as u64)
    }
}

// == Manual Clock ==
/// Hand-driven clock. Clones share the same reading, so a test can keep one
/// handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Sets an absolute reading.
    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
