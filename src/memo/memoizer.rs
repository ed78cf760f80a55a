//! Memoizer Module
//!
//! Binds a key codec and a shared store to a computation.

use std::sync::Arc;

use tracing::trace;

use crate::cache::{
    CacheStats, Clock, EvictionStore, HitCounters, Lookup, MonotonicClock, SharedStore, StoreMode,
};
use crate::config::MemoizerConfig;
use crate::error::{CacheError, Result};
use crate::key::{CacheKey, CallArgs, KeyCodec, KeyStrategy};

/// Store type used by memoizers.
pub type MemoStore<V> = SharedStore<CacheKey, V>;

// == Memo Core ==
/// Lookup-or-compute machinery shared by [`Memoizer`] and
/// [`ScopedMemoizer`](crate::memo::ScopedMemoizer).
pub struct MemoCore<V> {
    codec: KeyCodec,
    store: Arc<MemoStore<V>>,
    discriminator: Option<Arc<str>>,
    counters: HitCounters,
    /// Capacity-0 stores never keep a value, so calls skip them entirely
    bypass: bool,
}

impl<V: Clone> MemoCore<V> {
    /// Builds a core with its own store.
    pub fn new(config: &MemoizerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = EvictionStore::with_clock(config.store_config(), clock)?;
        Ok(Self::with_store(
            Arc::new(SharedStore::new(store)),
            config.discriminator.as_deref(),
            config.effective_strategy(),
        ))
    }

    /// Builds a core on top of an existing store.
    pub fn with_store(
        store: Arc<MemoStore<V>>,
        discriminator: Option<&str>,
        strategy: KeyStrategy,
    ) -> Self {
        Self {
            codec: KeyCodec::new(strategy),
            bypass: store.mode() == StoreMode::Disabled,
            store,
            discriminator: discriminator.map(Arc::from),
            counters: HitCounters::new(),
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `args`, computing and storing it on a miss.
    ///
    /// A failed computation stores nothing and releases the key.
    pub fn get_or_compute<F>(&self, args: &CallArgs, compute: F) -> Result<V>
    where
        F: FnOnce(&CallArgs) -> anyhow::Result<V>,
    {
        self.get_or_compute_as(self.discriminator.as_ref(), args, compute)
    }

    /// Like [`get_or_compute`](Self::get_or_compute) with an explicit
    /// discriminator, for several computations sharing this core's store.
    pub fn get_or_compute_as<F>(
        &self,
        discriminator: Option<&Arc<str>>,
        args: &CallArgs,
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce(&CallArgs) -> anyhow::Result<V>,
    {
        let key = self.codec.derive(discriminator, args)?;

        if self.bypass || key.is_unique() {
            self.counters.record_miss();
            return compute(args).map_err(CacheError::ComputationFailure);
        }

        match self.store.reserve_or_get(&key) {
            Lookup::Hit(value) => {
                self.counters.record_hit();
                trace!(discriminator = ?key.discriminator(), "Cache hit");
                Ok(value)
            }
            Lookup::Reserved(reservation) => {
                self.counters.record_miss();
                trace!(discriminator = ?key.discriminator(), "Cache miss, computing");
                let value = compute(args).map_err(CacheError::ComputationFailure)?;
                reservation.commit(value.clone());
                Ok(value)
            }
        }
    }

    /// Drops the entry for `args`. Returns whether one was stored.
    pub fn invalidate(&self, args: &CallArgs) -> Result<bool> {
        self.invalidate_as(self.discriminator.as_ref(), args)
    }

    pub fn invalidate_as(&self, discriminator: Option<&Arc<str>>, args: &CallArgs) -> Result<bool> {
        let key = self.codec.derive(discriminator, args)?;
        Ok(!key.is_unique() && self.store.invalidate(&key))
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Approximate counters; see [`CacheStats`].
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.store.stats())
    }

    pub fn store(&self) -> &Arc<MemoStore<V>> {
        &self.store
    }
}

// == Memoizer ==
/// A computation wrapped with a cache.
///
/// The computation should be a pure function of its arguments; with a TTL,
/// results may be up to one bucket stale.
///
/// ```
/// use memo_cache::{CallArgs, Memoizer, MemoizerConfig};
///
/// let add = Memoizer::new(MemoizerConfig::lru(3), |args: &CallArgs| {
///     Ok(args.int(0).unwrap_or(0) + args.int(1).unwrap_or(0))
/// })
/// .unwrap();
///
/// assert_eq!(add.call(&CallArgs::new().arg(1).arg(2)).unwrap(), 3);
/// assert_eq!(add.call(&CallArgs::new().arg(1).arg(2)).unwrap(), 3);
/// assert_eq!(add.stats().hits, 1);
/// ```
pub struct Memoizer<V, F> {
    core: MemoCore<V>,
    compute: F,
    enabled: bool,
}

impl<V, F> Memoizer<V, F>
where
    V: Clone,
    F: Fn(&CallArgs) -> anyhow::Result<V>,
{
    // == Constructor ==
    /// Creates a memoizer with its own store, timed by a [`MonotonicClock`].
    ///
    /// Configuration errors are reported here, never at call time.
    pub fn new(config: MemoizerConfig, compute: F) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()), compute)
    }

    /// Creates a memoizer whose TTL buckets follow `clock`.
    pub fn with_clock(config: MemoizerConfig, clock: Arc<dyn Clock>, compute: F) -> Result<Self> {
        Ok(Self {
            core: MemoCore::new(&config, clock)?,
            compute,
            enabled: config.enabled,
        })
    }

    /// Creates a memoizer writing into a store shared with other
    /// computations. `discriminator` keeps their keys apart.
    pub fn with_store(
        store: Arc<MemoStore<V>>,
        discriminator: &str,
        strategy: KeyStrategy,
        compute: F,
    ) -> Self {
        Self {
            core: MemoCore::with_store(store, Some(discriminator), strategy),
            compute,
            enabled: strategy != KeyStrategy::Unique,
        }
    }

    // == Call ==
    /// Invokes the computation through the cache.
    pub fn call(&self, args: &CallArgs) -> Result<V> {
        self.core.get_or_compute(args, &self.compute)
    }

    pub fn invalidate(&self, args: &CallArgs) -> Result<bool> {
        self.core.invalidate(args)
    }

    pub fn clear(&self) {
        self.core.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.core.stats()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The underlying store, e.g. for a background sweep.
    pub fn store(&self) -> &Arc<MemoStore<V>> {
        self.core.store()
    }
}
