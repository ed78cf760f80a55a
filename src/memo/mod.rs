//! Memo Module
//!
//! Cached callables: free-standing memoizers and per-instance method caches.

mod memoizer;
mod scoped;

pub use memoizer::{MemoCore, MemoStore, Memoizer};
pub use scoped::ScopedMemoizer;
