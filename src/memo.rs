//! Memoization Module
//!
//! [`MemoryCache`] is the public async handle over the synchronous cache
//! core: it adds the shared-state locking, the memoized accessor
//! (`get_or_set`), request deduplication (`dedupe`) and
//! stale-while-revalidate (`get_stale`).
//!
//! The handle is explicitly constructed and cheap to clone (all state sits
//! behind an `Arc`); pass clones to the components that need caching rather
//! than reaching for a process-wide global.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheEvent, CacheStats, CacheStore, Freshness, Listener, ListenerId, SetOptions};
use crate::config::CacheConfig;
use crate::dedupe::PendingTable;
use crate::error::Result;
use crate::tasks::spawn_cleanup_task;

// == Stale Options ==
/// Options for [`MemoryCache::get_stale`].
#[derive(Debug, Clone, Copy)]
pub struct StaleOptions {
    /// Freshness window for the (re)written entry
    pub ttl: Duration,
    /// Window after expiry during which the stale value is still served
    pub stale_while_revalidate: Duration,
}

impl StaleOptions {
    /// Creates options with the given freshness TTL and stale window.
    pub fn new(ttl: Duration, stale_while_revalidate: Duration) -> Self {
        Self {
            ttl,
            stale_while_revalidate,
        }
    }
}

// == Memory Cache ==
/// Async cache handle with memoization, deduplication and
/// stale-while-revalidate on top of [`CacheStore`].
///
/// Every store operation runs under one lock acquisition, so cache
/// bookkeeping is atomic per operation; suspension only happens while
/// awaiting caller-supplied factories.
#[derive(Debug)]
pub struct MemoryCache<V> {
    inner: Arc<CacheInner<V>>,
}

#[derive(Debug)]
struct CacheInner<V> {
    store: RwLock<CacheStore<V>>,
    pending: PendingTable<V>,
    config: CacheConfig,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Clone for MemoryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> MemoryCache<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a new cache handle. The expiry sweeper is not started;
    /// call [`MemoryCache::start_sweeper`] from within a tokio runtime.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: RwLock::new(CacheStore::new(&config)),
                pending: PendingTable::new(),
                config,
                sweeper: Mutex::new(None),
            }),
        }
    }

    // == Store Primitives ==
    /// Retrieves a value by key (lazy expiry applies).
    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.store.write().await.get(key)
    }

    /// Stores a key-value pair.
    pub async fn set(&self, key: &str, value: V, options: SetOptions) -> Result<()> {
        self.inner.store.write().await.set(key.to_string(), value, options)
    }

    /// Returns true if the key is present and not expired.
    pub async fn has(&self, key: &str) -> bool {
        self.inner.store.write().await.has(key)
    }

    /// Removes an entry by key. Returns true if it was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.inner.store.write().await.delete(key)
    }

    /// Removes all entries.
    pub async fn clear(&self) {
        self.inner.store.write().await.clear()
    }

    /// Removes every entry carrying `tag`; returns the number removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        self.inner.store.write().await.invalidate_by_tag(tag)
    }

    /// Removes every entry whose key matches the glob `pattern`;
    /// returns the number removed.
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        self.inner.store.write().await.invalidate_by_pattern(pattern)
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.store.read().await.stats()
    }

    /// Removes all expired entries; returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.inner.store.write().await.cleanup_expired()
    }

    // == Events ==
    /// Registers a mutation listener.
    pub async fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<V>) + Send + Sync + 'static,
    {
        let listener: Listener<V> = Arc::new(listener);
        self.inner.store.write().await.subscribe(listener)
    }

    /// Removes a mutation listener. Returns true if it was registered.
    pub async fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.store.write().await.unsubscribe(id)
    }

    // == Get Or Set ==
    /// Memoized accessor: returns the cached value, or computes it with
    /// `factory`, stores it and returns it.
    ///
    /// Not safe against duplicate concurrent execution on its own: two
    /// callers missing at the same time both run the factory. Combine with
    /// [`MemoryCache::dedupe`] when single-flight execution matters.
    pub async fn get_or_set<F, Fut>(&self, key: &str, factory: F, options: SetOptions) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.set(key, value.clone(), options).await?;
        Ok(value)
    }

    // == Dedupe ==
    /// Runs `factory` under single-flight semantics: for any key, at most
    /// one factory invocation is in flight at a time, and all concurrent
    /// callers observe the same outcome.
    ///
    /// The result is not written to the cache; combine with `set` or use
    /// `get_stale` for cached single-flight access.
    pub async fn dedupe<F, Fut>(&self, key: &str, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        self.inner.pending.run(key, factory).await
    }

    // == Get Stale ==
    /// Stale-while-revalidate accessor.
    ///
    /// - Fresh entry: returns the cached value immediately, with the same
    ///   hit/recency bookkeeping as `get`.
    /// - Stale entry within the `stale_while_revalidate` window: returns the
    ///   stale value immediately and refreshes it in the background through
    ///   the deduplicator; a failed refresh is logged and the stale entry is
    ///   left in place, never disturbing the caller that was already served.
    /// - Missing, or expired beyond the window: awaits the factory (deduped),
    ///   stores the result and returns it; factory errors propagate.
    pub async fn get_stale<F, Fut>(&self, key: &str, factory: F, options: StaleOptions) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let freshness = {
            let mut store = self.inner.store.write().await;
            store.freshness(key, options.stale_while_revalidate)
        };

        match freshness {
            Freshness::Fresh(value) => Ok(value),
            Freshness::Stale(value) => {
                let cache = self.clone();
                let key = key.to_string();
                let ttl = options.ttl;
                tokio::spawn(async move {
                    match cache.inner.pending.run(&key, factory).await {
                        Ok(fresh) => {
                            let write = cache.set(&key, fresh, SetOptions::new().ttl(ttl)).await;
                            match write {
                                Ok(()) => debug!("revalidated stale entry for key '{}'", key),
                                Err(err) => {
                                    warn!("failed to store revalidated value for '{}': {}", key, err)
                                }
                            }
                        }
                        Err(err) => {
                            warn!("background revalidation for '{}' failed: {}", key, err)
                        }
                    }
                });
                Ok(value)
            }
            Freshness::Miss => {
                let value = self.inner.pending.run(key, factory).await?;
                self.set(key, value.clone(), SetOptions::new().ttl(options.ttl))
                    .await?;
                Ok(value)
            }
        }
    }

    // == Sweeper ==
    /// Starts the periodic expiry sweeper using the configured
    /// `cleanup_interval`. A second call while the sweeper runs is a no-op.
    pub async fn start_sweeper(&self) {
        let mut sweeper = self.inner.sweeper.lock().await;
        match &*sweeper {
            Some(handle) if !handle.is_finished() => {}
            _ => {
                *sweeper = Some(spawn_cleanup_task(
                    self.clone(),
                    self.inner.config.cleanup_interval,
                ));
            }
        }
    }

    // == Destroy ==
    /// Tears the cache down: stops the sweeper and drops all listeners.
    /// Entries are left in place (`clear` removes them). Idempotent.
    pub async fn destroy(&self) {
        if let Some(handle) = self.inner.sweeper.lock().await.take() {
            handle.abort();
        }
        self.inner.store.write().await.clear_listeners();
        info!("cache destroyed: sweeper stopped, listeners cleared");
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub async fn len(&self) -> usize {
        self.inner.store.read().await.len()
    }

    /// Returns true if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.store.read().await.is_empty()
    }
}
