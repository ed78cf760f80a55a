//! Canonical Serialization Module
//!
//! Deterministic byte encoding of argument trees, independent of the
//! iteration order of sets and maps.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value as Json};

use crate::error::{CacheError, Result};
use crate::key::Value;

/// Deepest argument nesting the canonical codec will follow.
pub const MAX_NESTING_DEPTH: usize = 128;

// == Codec Trait ==
/// Produces a deterministic encoding of one argument value.
///
/// Implementations must map structurally equal inputs to identical bytes,
/// in every process, and must not mutate shared state.
pub trait CanonicalCodec: fmt::Debug + Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;
}

// == Numeric Normalization ==
/// A number after normalization: integral floats collapse into integers,
/// and unsigned values use `UInt` only above `i64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int(i64),
    UInt(u64),
    Float(f64),
}

/// 2^64, the first float past `u64::MAX`.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Maps `2.0` to `Int(2)` and `-0.0` to `Int(0)` so that numerically equal
/// arguments derive the same key. Non-finite values are left as floats.
pub(crate) fn normalize_float(f: f64) -> Numeric {
    if !f.is_finite() || f.fract() != 0.0 {
        Numeric::Float(f)
    } else if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Numeric::Int(f as i64)
    } else if f >= 0.0 && f < U64_LIMIT {
        Numeric::UInt(f as u64)
    } else {
        Numeric::Float(f)
    }
}

pub(crate) fn normalize_uint(u: u64) -> Numeric {
    match i64::try_from(u) {
        Ok(i) => Numeric::Int(i),
        Err(_) => Numeric::UInt(u),
    }
}

// == JSON Codec ==
/// Canonical codec emitting type-tagged JSON via `serde_json`.
///
/// Every node is a two-element array `[tag, payload]`. Sets are sorted by
/// the encoded bytes of their members and de-duplicated; maps become sorted
/// `[key, value]` pairs where a later duplicate key overrides an earlier one.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCanonicalCodec;

impl JsonCanonicalCodec {
    pub fn new() -> Self {
        Self
    }

    fn canonical(&self, value: &Value, depth: usize) -> Result<Json> {
        if depth > MAX_NESTING_DEPTH {
            return Err(CacheError::SerializationFailure(format!(
                "argument nesting exceeds {} levels (cyclic structure?)",
                MAX_NESTING_DEPTH
            )));
        }

        let node = match value {
            Value::Unit => json!(["u", null]),
            Value::Bool(b) => json!(["b", b]),
            Value::Int(i) => json!(["i", i]),
            Value::UInt(u) => numeric_node(normalize_uint(*u)),
            Value::Float(f) => match normalize_float(*f) {
                Numeric::Float(f) if f.is_finite() => json!(["f", f]),
                Numeric::Float(f) => {
                    return Err(CacheError::SerializationFailure(format!(
                        "non-finite float {} has no canonical encoding",
                        f
                    )))
                }
                integral => numeric_node(integral),
            },
            Value::Str(s) => json!(["s", s]),
            Value::Bytes(bytes) => json!(["y", bytes]),
            Value::Tuple(items) => json!(["t", self.sequence(items, depth)?]),
            Value::List(items) => json!(["l", self.sequence(items, depth)?]),
            Value::Set(items) => {
                let mut members: BTreeMap<String, Json> = BTreeMap::new();
                for item in items {
                    let encoded = self.canonical(item, depth + 1)?;
                    members.insert(to_sort_key(&encoded)?, encoded);
                }
                json!(["S", members.into_values().collect::<Vec<_>>()])
            }
            Value::Map(pairs) => {
                let mut entries: BTreeMap<String, Json> = BTreeMap::new();
                for (k, v) in pairs {
                    let key = self.canonical(k, depth + 1)?;
                    let val = self.canonical(v, depth + 1)?;
                    entries.insert(to_sort_key(&key)?, json!([key, val]));
                }
                json!(["m", entries.into_values().collect::<Vec<_>>()])
            }
            Value::Opaque(name) => {
                return Err(CacheError::SerializationFailure(format!(
                    "opaque value `{}` has no canonical encoding",
                    name
                )))
            }
        };

        Ok(node)
    }

    fn sequence(&self, items: &[Value], depth: usize) -> Result<Vec<Json>> {
        items
            .iter()
            .map(|item| self.canonical(item, depth + 1))
            .collect()
    }
}

impl CanonicalCodec for JsonCanonicalCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let tree = self.canonical(value, 0)?;
        serde_json::to_vec(&tree).map_err(|e| CacheError::SerializationFailure(e.to_string()))
    }
}

/// Integers of either sign share the `i` tag while they fit in `i64`.
fn numeric_node(n: Numeric) -> Json {
    match n {
        Numeric::Int(i) => json!(["i", i]),
        Numeric::UInt(u) => json!(["n", u]),
        Numeric::Float(f) => json!(["f", f]),
    }
}

fn to_sort_key(node: &Json) -> Result<String> {
    serde_json::to_string(node).map_err(|e| CacheError::SerializationFailure(e.to_string()))
}
