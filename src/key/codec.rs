//! Key Codec Module
//!
//! Derives cache keys from call arguments using one of three strategies.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::key::canonical::{
    normalize_float, normalize_uint, CanonicalCodec, JsonCanonicalCodec, Numeric,
};
use crate::key::{CallArgs, Value};

// == Key Strategy ==
/// How arguments are turned into a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Native equality/hash of each argument; unhashable shapes are rejected.
    Direct,
    /// SHA-256 over the canonical encoding; accepts lists, sets and maps.
    #[default]
    Canonical,
    /// Fresh random key per call, never matching anything. Used when caching
    /// is disabled, so key derivation can never fail.
    Unique,
}

// == Hash Part ==
/// An argument reduced to a shape with a real `Hash + Eq` contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashPart {
    Unit,
    Bool(bool),
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// Bit pattern of a non-integral, non-NaN float
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<HashPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyRepr {
    Direct {
        positional: Vec<HashPart>,
        keyword: Vec<(String, HashPart)>,
    },
    Digest([u8; 32]),
    Unique(Uuid),
}

// == Cache Key ==
/// Opaque key under which a computation's result is stored.
///
/// Equal discriminators plus structurally equal arguments give equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    discriminator: Option<Arc<str>>,
    repr: KeyRepr,
}

impl CacheKey {
    /// Name of the computation this key belongs to, if any.
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// True for the never-matching keys produced by [`KeyStrategy::Unique`].
    pub fn is_unique(&self) -> bool {
        matches!(self.repr, KeyRepr::Unique(_))
    }
}

// == Key Codec ==
/// Converts argument lists into [`CacheKey`]s. Pure: no shared state is
/// touched while deriving a key.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    strategy: KeyStrategy,
    codec: Arc<dyn CanonicalCodec>,
}

impl KeyCodec {
    /// Creates a codec using the JSON canonical encoder.
    pub fn new(strategy: KeyStrategy) -> Self {
        Self::with_codec(strategy, Arc::new(JsonCanonicalCodec::new()))
    }

    /// Creates a codec with a caller-supplied canonical encoder.
    pub fn with_codec(strategy: KeyStrategy, codec: Arc<dyn CanonicalCodec>) -> Self {
        Self { strategy, codec }
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Derives the key for one call.
    pub fn derive(&self, discriminator: Option<&Arc<str>>, args: &CallArgs) -> Result<CacheKey> {
        self.derive_key(discriminator, &args.positional, &args.keyword)
    }

    /// Derives a key from a discriminator, positional arguments and keyword
    /// arguments (already ordered by name).
    pub fn derive_key(
        &self,
        discriminator: Option<&Arc<str>>,
        positional: &[Value],
        keyword: &BTreeMap<String, Value>,
    ) -> Result<CacheKey> {
        let repr = match self.strategy {
            KeyStrategy::Direct => KeyRepr::Direct {
                positional: positional
                    .iter()
                    .enumerate()
                    .map(|(i, v)| to_hash_part(v, &format!("#{}", i)))
                    .collect::<Result<_>>()?,
                keyword: keyword
                    .iter()
                    .map(|(name, v)| -> Result<(String, HashPart)> {
                        Ok((name.clone(), to_hash_part(v, name)?))
                    })
                    .collect::<Result<_>>()?,
            },
            KeyStrategy::Canonical => KeyRepr::Digest(self.digest(positional, keyword)?),
            KeyStrategy::Unique => KeyRepr::Unique(Uuid::new_v4()),
        };

        Ok(CacheKey {
            discriminator: discriminator.cloned(),
            repr,
        })
    }

    fn digest(&self, positional: &[Value], keyword: &BTreeMap<String, Value>) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();

        // Length-prefixed framing keeps argument boundaries unambiguous.
        hasher.update(b"p");
        hasher.update((positional.len() as u64).to_le_bytes());
        for value in positional {
            let bytes = self.codec.encode(value)?;
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }

        hasher.update(b"k");
        hasher.update((keyword.len() as u64).to_le_bytes());
        for (name, value) in keyword {
            let bytes = self.codec.encode(value)?;
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }

        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Ok(out)
    }
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new(KeyStrategy::default())
    }
}

fn to_hash_part(value: &Value, position: &str) -> Result<HashPart> {
    let unhashable = || CacheError::UnhashableArgument {
        position: position.to_string(),
        kind: value.kind(),
    };

    let part = match value {
        Value::Unit => HashPart::Unit,
        Value::Bool(b) => HashPart::Bool(*b),
        Value::Int(i) => HashPart::Int(*i),
        Value::UInt(u) => numeric_part(normalize_uint(*u)),
        Value::Float(f) => match normalize_float(*f) {
            Numeric::Float(f) if f.is_nan() => return Err(unhashable()),
            n => numeric_part(n),
        },
        Value::Str(s) => HashPart::Str(s.clone()),
        Value::Bytes(b) => HashPart::Bytes(b.clone()),
        Value::Tuple(items) => HashPart::Tuple(
            items
                .iter()
                .map(|item| to_hash_part(item, position))
                .collect::<Result<_>>()?,
        ),
        Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Opaque(_) => {
            return Err(unhashable())
        }
    };

    Ok(part)
}

fn numeric_part(n: Numeric) -> HashPart {
    match n {
        Numeric::Int(i) => HashPart::Int(i),
        Numeric::UInt(u) => HashPart::UInt(u),
        Numeric::Float(f) => HashPart::Float(f.to_bits()),
    }
}
