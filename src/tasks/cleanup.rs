//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::memo::MemoryCache;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs in an infinite loop, sleeping for the given interval
/// between sweeps. Lazy expiry on access already removes dead entries that
/// get read; the sweep bounds memory growth for entries that never are.
///
/// Returns a JoinHandle for the spawned task, which can be used to abort
/// the task during teardown ([`MemoryCache::destroy`] does this when the
/// sweeper was started through [`MemoryCache::start_sweeper`]).
pub fn spawn_cleanup_task<V>(cache: MemoryCache<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
