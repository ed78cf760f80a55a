//! Error types for the memoization layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for key derivation, store construction and memoized calls.
///
/// None of these is ever converted into a cache miss: a miss means "not
/// present", never "failed to determine presence".
#[derive(Error, Debug)]
pub enum CacheError {
    /// Direct key strategy received an argument without a stable hash contract
    #[error("Unhashable argument at {position}: {kind} has no stable hash")]
    UnhashableArgument {
        /// `#i` for the i-th positional argument, the parameter name otherwise
        position: String,
        /// Variant name of the offending value
        kind: &'static str,
    },

    /// Canonical serialization could not encode an argument
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// The wrapped computation failed; the error is passed through unchanged
    #[error("Computation failed: {0}")]
    ComputationFailure(#[source] anyhow::Error),

    /// Non-positive capacity in a mode that needs room for entries
    #[error("Capacity misconfiguration: {0}")]
    CapacityMisconfiguration(String),

    /// TTL window that cannot produce buckets
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),
}

impl CacheError {
    /// Returns the computation's own error if this is a `ComputationFailure`.
    pub fn computation_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::ComputationFailure(err) => Some(err),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the memoization layer.
pub type Result<T> = std::result::Result<T, CacheError>;
