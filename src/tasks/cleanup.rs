//! TTL Cleanup Task
//!
//! Background task that periodically drops entries from past TTL buckets.
//!
//! Expiry is otherwise lazy: an entry that is never looked up again stays
//! in its store until LRU pressure evicts it. Stores without a capacity
//! bound and with keys that are rarely revisited can run this task to keep
//! memory in check.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedStore;

/// Spawns a background task that periodically purges expired entries.
///
/// Each run takes the store lock once for the whole sweep.
///
/// # Arguments
/// * `store` - Shared store to sweep
/// * `interval` - Time between runs
///
/// # Returns
/// A JoinHandle for the spawned task; abort it when the store is retired.
///
/// # Example
/// ```ignore
/// let memo = Memoizer::new(MemoizerConfig::default().with_ttl(ttl), compute)?;
/// let cleanup_handle = spawn_cleanup_task(memo.store().clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(store: Arc<SharedStore<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(?interval, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
