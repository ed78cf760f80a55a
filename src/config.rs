//! Configuration Module
//!
//! Handles building memoizer configuration explicitly or from environment
//! variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::StoreConfig;
use crate::key::KeyStrategy;

/// Default LRU capacity, matching the common `lru_cache` default.
pub const DEFAULT_CAPACITY: usize = 128;

/// Memoizer configuration parameters.
///
/// Each memoizer gets its own value; there is no process-wide switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoizerConfig {
    /// When false every call invokes the computation and keys are never
    /// derived from the arguments
    pub enabled: bool,
    /// Key derivation strategy used while enabled
    pub strategy: KeyStrategy,
    /// Maximum number of entries, None = unbounded
    pub capacity: Option<usize>,
    /// TTL bucket width, None = no expiry. Serialized as `ttl_ms`, which
    /// may be fractional.
    #[serde(rename = "ttl_ms", with = "ttl_millis")]
    pub ttl: Option<Duration>,
    /// Name separating this computation's keys in a shared store
    pub discriminator: Option<String>,
}

impl MemoizerConfig {
    /// LRU-bounded configuration with the canonical key strategy.
    pub fn lru(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Strategy actually used: [`KeyStrategy::Unique`] while disabled.
    pub fn effective_strategy(&self) -> KeyStrategy {
        if self.enabled {
            self.strategy
        } else {
            KeyStrategy::Unique
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            capacity: self.capacity,
            ttl: self.ttl(),
        }
    }

    /// Creates a new config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_ENABLED` - `false`/`0` disables caching (default: enabled)
    /// - `MEMO_CAPACITY` - Maximum entries, `none` for unbounded (default: 128)
    /// - `MEMO_TTL_MS` - TTL bucket width in milliseconds (default: no TTL)
    /// - `MEMO_KEY_STRATEGY` - `direct` or `canonical` (default: canonical)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env::var("MEMO_ENABLED")
                .ok()
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "off"))
                .unwrap_or(defaults.enabled),
            strategy: env::var("MEMO_KEY_STRATEGY")
                .ok()
                .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "direct" => Some(KeyStrategy::Direct),
                    "canonical" => Some(KeyStrategy::Canonical),
                    _ => None,
                })
                .unwrap_or(defaults.strategy),
            capacity: match env::var("MEMO_CAPACITY").ok() {
                Some(v) if v.trim().eq_ignore_ascii_case("none") => None,
                Some(v) => v.trim().parse().ok().or(defaults.capacity),
                None => defaults.capacity,
            },
            ttl: env::var("MEMO_TTL_MS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .or(defaults.ttl),
            discriminator: None,
        }
    }
}

impl Default for MemoizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: KeyStrategy::Canonical,
            capacity: Some(DEFAULT_CAPACITY),
            ttl: None,
            discriminator: None,
        }
    }
}

// == TTL Serde ==
/// Reads and writes an optional TTL as milliseconds. Whole values stay
/// integers; sub-millisecond precision is written as a fraction.
mod ttl_millis {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Whole(u64),
        Fractional(f64),
    }

    pub fn serialize<S: Serializer>(ttl: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        ttl.map(|d| {
            if d.subsec_nanos() % 1_000_000 == 0 {
                Millis::Whole(d.as_millis() as u64)
            } else {
                Millis::Fractional(d.as_nanos() as f64 / 1e6)
            }
        })
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        match Option::<Millis>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Millis::Whole(ms)) => Ok(Some(Duration::from_millis(ms))),
            Some(Millis::Fractional(ms)) => {
                let nanos = (ms * 1e6).round();
                if !nanos.is_finite() || nanos < 0.0 || nanos >= u64::MAX as f64 {
                    return Err(D::Error::custom(format!("invalid ttl_ms {}", ms)));
                }
                Ok(Some(Duration::from_nanos(nanos as u64)))
            }
        }
    }
}
