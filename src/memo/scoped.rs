//! Scoped Memoizer Module
//!
//! Per-instance caches for methods. The instance owns its cache as an
//! ordinary field; the cache never holds a handle to the instance.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::cache::{CacheStats, Clock, MonotonicClock};
use crate::config::MemoizerConfig;
use crate::error::Result;
use crate::key::CallArgs;
use crate::memo::MemoCore;

// == Scoped Memoizer ==
/// A method cache embedded in the instance it serves.
///
/// The store is allocated lazily on the first call (Unbound -> Bound) and
/// dropped together with the instance. The owner reaches the computation
/// only as the `&T` borrow of each call, so the cache machinery can never
/// keep the instance alive.
///
/// Usage contract: if `compute` closes over a strong handle (`Arc`/`Rc`)
/// to its own owner, that handle is not cached but does outlive the call;
/// pass the owner through the `&T` argument instead.
///
/// Several methods can share one scoped memoizer (one store per instance)
/// by calling [`call_method`](Self::call_method) with distinct
/// discriminators, or each method can have its own field.
///
/// ```
/// use memo_cache::{CallArgs, MemoizerConfig, ScopedMemoizer};
///
/// struct Adder {
///     offset: i64,
///     sum: ScopedMemoizer<i64>,
/// }
///
/// impl Adder {
///     fn sum(&self, a: i64, b: i64) -> memo_cache::Result<i64> {
///         let args = CallArgs::new().arg(a).arg(b);
///         self.sum.call(self, &args, |this, _| Ok(this.offset + a + b))
///     }
/// }
///
/// let adder = Adder { offset: 10, sum: ScopedMemoizer::new(MemoizerConfig::lru(3)).unwrap() };
/// assert_eq!(adder.sum(1, 2).unwrap(), 13);
/// assert_eq!(adder.sum(1, 2).unwrap(), 13);
/// assert_eq!(adder.sum.stats().hits, 1);
/// ```
pub struct ScopedMemoizer<V> {
    config: MemoizerConfig,
    clock: Arc<dyn Clock>,
    binding: OnceCell<MemoCore<V>>,
}

impl<V: Clone> ScopedMemoizer<V> {
    // == Constructor ==
    /// Creates an unbound scoped memoizer. The configuration is checked now,
    /// so binding on the first call cannot fail on it.
    pub fn new(config: MemoizerConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: MemoizerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.store_config().validate()?;
        Ok(Self {
            config,
            clock,
            binding: OnceCell::new(),
        })
    }

    fn bound(&self) -> Result<&MemoCore<V>> {
        self.binding.get_or_try_init(|| {
            debug!(discriminator = ?self.config.discriminator, "Binding scoped cache");
            MemoCore::new(&self.config, Arc::clone(&self.clock))
        })
    }

    // == Call ==
    /// Runs `compute` for `owner` through this instance's cache.
    pub fn call<T, F>(&self, owner: &T, args: &CallArgs, compute: F) -> Result<V>
    where
        T: ?Sized,
        F: FnOnce(&T, &CallArgs) -> anyhow::Result<V>,
    {
        self.bound()?
            .get_or_compute(args, |args| compute(owner, args))
    }

    /// Like [`call`](Self::call), keyed under `method` so that several
    /// methods can share this instance's store.
    pub fn call_method<T, F>(&self, method: &str, owner: &T, args: &CallArgs, compute: F) -> Result<V>
    where
        T: ?Sized,
        F: FnOnce(&T, &CallArgs) -> anyhow::Result<V>,
    {
        let discriminator: Arc<str> = Arc::from(method);
        self.bound()?
            .get_or_compute_as(Some(&discriminator), args, |args| compute(owner, args))
    }

    /// Drops the entry for `args`. An unbound memoizer has nothing to drop.
    pub fn invalidate(&self, args: &CallArgs) -> Result<bool> {
        match self.binding.get() {
            Some(core) => core.invalidate(args),
            None => Ok(false),
        }
    }

    pub fn invalidate_method(&self, method: &str, args: &CallArgs) -> Result<bool> {
        match self.binding.get() {
            Some(core) => core.invalidate_as(Some(&Arc::from(method)), args),
            None => Ok(false),
        }
    }

    /// True once the first call has allocated the store.
    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn stats(&self) -> CacheStats {
        self.binding
            .get()
            .map(MemoCore::stats)
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Some(core) = self.binding.get() {
            core.clear();
        }
    }
}
