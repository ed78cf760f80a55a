//! Background Tasks Module
//!
//! Contains optional background tasks for long-lived caches.
//!
//! # Tasks
//! - TTL Cleanup: Removes entries from past TTL buckets at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
