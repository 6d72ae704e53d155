//! Request Deduplication Module
//!
//! Collapses concurrent identical in-flight computations into a single
//! execution. The table maps a key to a shared handle on the running
//! computation; every concurrent caller for that key awaits the same handle
//! and observes the same outcome, value or error.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use crate::error::Result;

/// Shared handle on one in-flight computation.
type PendingFuture<V> = Shared<BoxFuture<'static, Result<V>>>;

// == Pending Table ==
/// Ephemeral map from key to in-flight computation handle.
///
/// Invariants:
/// - at most one live entry per key at any instant;
/// - an entry is removed unconditionally when its computation settles,
///   whether it succeeded or failed.
///
/// Cheap to clone; clones share the same table.
pub struct PendingTable<V> {
    inner: Arc<Mutex<HashMap<String, PendingFuture<V>>>>,
}

impl<V> Clone for PendingTable<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Default for PendingTable<V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V> std::fmt::Debug for PendingTable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTable").finish_non_exhaustive()
    }
}

impl<V: Clone + Send + Sync + 'static> PendingTable<V> {
    // == Constructor ==
    /// Creates an empty pending-request table.
    pub fn new() -> Self {
        Self::default()
    }

    // == Run ==
    /// Runs `factory` under single-flight semantics for `key`.
    ///
    /// If a computation for `key` is already in flight, the factory is not
    /// invoked and the caller joins the existing computation. Otherwise the
    /// factory runs, registered in the table until it settles. The lookup
    /// and registration happen under one lock acquisition, so two callers
    /// can never both start a factory for the same key.
    ///
    /// A caller that stops awaiting does not cancel the computation for the
    /// remaining joiners; the shared future is driven by whichever joiner
    /// polls it.
    pub async fn run<F, Fut>(&self, key: &str, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut pending = self.inner.lock().await;
            if let Some(existing) = pending.get(key) {
                existing.clone()
            } else {
                let table = self.inner.clone();
                let owned_key = key.to_string();
                let fut = factory();
                let wrapped: BoxFuture<'static, Result<V>> = async move {
                    let result = fut.await;
                    table.lock().await.remove(&owned_key);
                    result
                }
                .boxed();
                let shared = wrapped.shared();
                pending.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    // == Length ==
    /// Returns the number of computations currently in flight.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Returns true if no computation is in flight.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
