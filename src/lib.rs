//! Memo Cache - memoization for arbitrary computations
//!
//! Derives cache keys from heterogeneous call arguments, stores results
//! with LRU eviction and TTL buckets, and scopes method caches to the
//! instances that own them.

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod memo;
pub mod tasks;

pub use cache::{CacheStats, Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::MemoizerConfig;
pub use error::{CacheError, Result};
pub use key::{CacheKey, CallArgs, KeyCodec, KeyStrategy, Value};
pub use memo::{Memoizer, ScopedMemoizer};
pub use tasks::spawn_cleanup_task;
