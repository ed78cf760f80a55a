//! Shared Store Module
//!
//! Thread-safe wrapper around [`EvictionStore`] with blocking single-flight
//! per key.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::cache::{EvictionStore, PutOutcome, StoreMode, StoreStats};

// == Flight ==
/// One in-progress computation that other callers can wait on.
#[derive(Debug, Default)]
struct Flight {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Flight {
    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    fn finish(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

struct Inner<K, V> {
    store: EvictionStore<K, V>,
    in_flight: HashMap<K, Arc<Flight>>,
}

// == Lookup ==
/// Outcome of [`SharedStore::reserve_or_get`].
pub enum Lookup<'a, K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    Hit(V),
    /// Caller must compute the value and commit it, or drop the reservation
    Reserved(Reservation<'a, K, V>),
}

// == Shared Store ==
/// An [`EvictionStore`] behind a mutex, plus a table of keys whose value is
/// currently being computed.
///
/// Concurrent misses on one key are serialized: the first caller receives a
/// [`Reservation`], the others block until it commits or is dropped and then
/// look again. Different keys never wait on each other.
///
/// A computation must not look up its own key through the same store; the
/// nested call would wait on itself.
pub struct SharedStore<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> SharedStore<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(store: EvictionStore<K, V>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                in_flight: HashMap::new(),
            }),
        }
    }

    // == Reserve Or Get ==
    /// Returns the stored value, or exclusive responsibility for computing it.
    pub fn reserve_or_get(&self, key: &K) -> Lookup<'_, K, V> {
        loop {
            let flight = {
                let mut inner = self.inner.lock();
                if let Some(value) = inner.store.get(key) {
                    return Lookup::Hit(value);
                }

                match inner.in_flight.get(key) {
                    Some(flight) => Arc::clone(flight),
                    None => {
                        let flight = Arc::new(Flight::default());
                        inner.in_flight.insert(key.clone(), Arc::clone(&flight));
                        trace!(?key, "Reserved key for computation");
                        return Lookup::Reserved(Reservation {
                            store: self,
                            key: key.clone(),
                            flight,
                            settled: false,
                        });
                    }
                }
            };

            trace!(?key, "Waiting on in-flight computation");
            flight.wait();
        }
    }

    /// Plain lookup; never reserves and never waits.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().store.get(key)
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().store.invalidate(key)
    }

    /// Removes every stored value. Computations in flight still commit.
    pub fn clear(&self) {
        self.inner.lock().store.clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.inner.lock().store.purge_expired()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.lock().store.stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    pub fn mode(&self) -> StoreMode {
        self.inner.lock().store.mode()
    }

    /// Number of keys currently reserved.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    fn settle(&self, key: &K, value: Option<V>) -> Option<PutOutcome> {
        let mut inner = self.inner.lock();
        inner.in_flight.remove(key);
        value.map(|value| inner.store.put(key.clone(), value))
    }
}

impl<K, V> Debug for SharedStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SharedStore")
            .field("store", &inner.store)
            .field("in_flight", &inner.in_flight.len())
            .finish()
    }
}

// == Reservation ==
/// Exclusive right to compute the value for one key.
///
/// Dropping it without [`commit`](Self::commit) (error, panic, early
/// return) releases the key so the next caller can retry.
pub struct Reservation<'a, K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    store: &'a SharedStore<K, V>,
    key: K,
    flight: Arc<Flight>,
    settled: bool,
}

impl<K, V> Reservation<'_, K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Stores the value and wakes every waiter.
    pub fn commit(mut self, value: V) -> PutOutcome {
        self.settled = true;
        let outcome = self
            .store
            .settle(&self.key, Some(value))
            .unwrap_or(PutOutcome::Rejected);
        self.flight.finish();
        outcome
    }
}

impl<K, V> Drop for Reservation<'_, K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if !self.settled {
            self.store.settle(&self.key, None);
            self.flight.finish();
            debug!(key = ?self.key, "Reservation released without a value");
        }
    }
}
