//! Property-Based Tests for Cache and Key Modules
//!
//! Uses proptest to check the store, codec and memoizer invariants.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{bucket_of, EvictionStore, ManualClock, StoreConfig};
use crate::config::MemoizerConfig;
use crate::key::{CallArgs, KeyCodec, KeyStrategy, Value};
use crate::memo::Memoizer;

// == Strategies ==
#[derive(Debug, Clone)]
enum StoreOp {
    Put(u8),
    Get(u8),
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (0u8..16).prop_map(StoreOp::Put),
        (0u8..16).prop_map(StoreOp::Get),
    ]
}

/// Argument trees whose maps have unique keys.
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Unit),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,8}".prop_map(Value::Str),
    ];

    leaf.prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Tuple),
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Set),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..6).prop_map(|m| {
                Value::Map(m.into_iter().map(|(k, v)| (Value::Str(k), v)).collect())
            }),
        ]
    })
}

/// Same structure, every map and set listed in reverse order.
fn reverse_unordered(value: &Value) -> Value {
    match value {
        Value::List(items) => Value::List(items.iter().map(reverse_unordered).collect()),
        Value::Tuple(items) => Value::Tuple(items.iter().map(reverse_unordered).collect()),
        Value::Set(items) => Value::Set(items.iter().rev().map(reverse_unordered).collect()),
        Value::Map(pairs) => Value::Map(
            pairs
                .iter()
                .rev()
                .map(|(k, v)| (reverse_unordered(k), reverse_unordered(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // After any sequence of puts and gets the store holds at most C entries,
    // and exactly the C most recently accessed distinct keys.
    #[test]
    fn prop_capacity_invariant(
        capacity in 1usize..6,
        ops in prop::collection::vec(store_op_strategy(), 1..80)
    ) {
        let mut store: EvictionStore<u8, u8> =
            EvictionStore::new(StoreConfig::lru(capacity)).unwrap();
        // Model: least recently used first
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                StoreOp::Put(k) => {
                    store.put(k, k);
                    model.retain(|m| *m != k);
                    model.push(k);
                    if model.len() > capacity {
                        model.remove(0);
                    }
                }
                StoreOp::Get(k) => {
                    let hit = store.get(&k).is_some();
                    prop_assert_eq!(hit, model.contains(&k), "Hit mismatch for {}", k);
                    if hit {
                        model.retain(|m| *m != k);
                        model.push(k);
                    }
                }
            }

            prop_assert!(store.len() <= capacity, "Size {} exceeds {}", store.len(), capacity);
            prop_assert_eq!(store.keys(), model.clone());
        }
    }

    // A value stored at t0 is a hit exactly while the bucket index is unchanged.
    #[test]
    fn prop_ttl_bucket_expiry(
        t0 in 0u64..10_000,
        dt in 0u64..10_000,
        ttl in 1u64..2_000
    ) {
        let clock = ManualClock::new();
        let ttl = Duration::from_millis(ttl);
        let mut store: EvictionStore<u8, u8> =
            EvictionStore::with_clock(StoreConfig::ttl(ttl), Arc::new(clock.clone())).unwrap();

        let start = Duration::from_millis(t0);
        let later = Duration::from_millis(t0 + dt);
        clock.set(start);
        store.put(1, 1);
        clock.set(later);

        let same_bucket = bucket_of(start, ttl) == bucket_of(later, ttl);
        prop_assert_eq!(store.get(&1).is_some(), same_bucket);
    }

    // Structurally equal arguments derive equal keys whatever the order of
    // their maps and sets.
    #[test]
    fn prop_canonical_keys_ignore_unordered_layout(value in value_strategy()) {
        let codec = KeyCodec::new(KeyStrategy::Canonical);
        let a = CallArgs::new().arg(value.clone()).kwarg("v", value.clone());
        let b = CallArgs::new()
            .kwarg("v", reverse_unordered(&value))
            .arg(reverse_unordered(&value));

        prop_assert_eq!(codec.derive(None, &a).unwrap(), codec.derive(None, &b).unwrap());
    }

    // Changing any leaf of a flat mapping changes the key.
    #[test]
    fn prop_canonical_keys_track_leaves(
        fields in prop::collection::btree_map("[a-z]{1,4}", any::<i64>(), 1..8),
        pick in any::<prop::sample::Index>(),
        delta in 1i64..1000
    ) {
        let codec = KeyCodec::new(KeyStrategy::Canonical);
        let target = pick.get(&fields.keys().cloned().collect::<Vec<_>>()).clone();
        let mut changed: BTreeMap<String, i64> = fields.clone();
        if let Some(v) = changed.get_mut(&target) {
            *v = v.wrapping_add(delta);
        }

        let a = CallArgs::new().arg(Value::from(fields));
        let b = CallArgs::new().arg(Value::from(changed));
        prop_assert_ne!(codec.derive(None, &a).unwrap(), codec.derive(None, &b).unwrap());
    }

    // Repeated calls with equal arguments compute once.
    #[test]
    fn prop_hits_are_idempotent(
        value in value_strategy(),
        repeats in 1usize..20
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let memo = Memoizer::new(MemoizerConfig::lru(8), move |_: &CallArgs| {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        })
        .unwrap();

        let first = memo.call(&CallArgs::new().arg(value.clone())).unwrap();
        for _ in 0..repeats {
            let again = memo.call(&CallArgs::new().arg(reverse_unordered(&value))).unwrap();
            prop_assert_eq!(again, first);
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(memo.stats().hits, repeats as u64);
    }

    // A failing computation is retried on the next call.
    #[test]
    fn prop_failures_are_never_cached(failures in 1usize..5) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let memo = Memoizer::new(MemoizerConfig::lru(4), move |_: &CallArgs| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                anyhow::bail!("attempt {} failed", n);
            }
            Ok(n)
        })
        .unwrap();

        let args = CallArgs::new().arg("a");
        for _ in 0..failures {
            prop_assert!(memo.call(&args).is_err());
        }
        prop_assert_eq!(memo.call(&args).unwrap(), failures);
        prop_assert_eq!(memo.call(&args).unwrap(), failures);
        prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
    }
}
