//! Key Module
//!
//! Turns heterogeneous call arguments into comparable cache keys.

mod canonical;
mod codec;
mod value;

pub use canonical::{CanonicalCodec, JsonCanonicalCodec, MAX_NESTING_DEPTH};
pub use codec::{CacheKey, HashPart, KeyCodec, KeyStrategy};
pub use value::{CallArgs, Value};
