//! Cache Event Bus Module
//!
//! Synchronous pub/sub notifications for cache mutations. Listeners are
//! invoked at the point of mutation; a panicking listener is isolated so
//! observer code can never corrupt cache state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

// == Cache Event ==
/// Notification emitted for every logical state change of the cache.
#[derive(Debug, Clone)]
pub enum CacheEvent<V> {
    /// An entry was inserted or replaced
    Set { key: String, value: V },
    /// An entry was read (hit)
    Get { key: String },
    /// An entry was removed (explicit delete, eviction or invalidation)
    Delete { key: String },
    /// All entries were removed
    Clear,
    /// An entry was removed because its TTL elapsed
    Expire { key: String },
}

/// Callback invoked for every emitted event.
pub type Listener<V> = Arc<dyn Fn(&CacheEvent<V>) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// == Event Bus ==
/// Registry of event listeners with panic isolation on dispatch.
pub struct EventBus<V> {
    listeners: Vec<(ListenerId, Listener<V>)>,
    next_id: u64,
}

impl<V> std::fmt::Debug for EventBus<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<V> Default for EventBus<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EventBus<V> {
    // == Constructor ==
    /// Creates a new event bus with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    // == Subscribe ==
    /// Registers a listener and returns its id.
    pub fn subscribe(&mut self, listener: Listener<V>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    // == Unsubscribe ==
    /// Removes a listener by id. Returns true if it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    // == Emit ==
    /// Dispatches an event to all listeners synchronously.
    ///
    /// A panic inside a listener is caught and logged; remaining listeners
    /// still run and the calling mutation completes normally.
    pub fn emit(&self, event: &CacheEvent<V>) {
        for (id, listener) in &self.listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener(event)));
            if result.is_err() {
                warn!("cache event listener {:?} panicked; ignoring", id);
            }
        }
    }

    // == Clear ==
    /// Removes all listeners.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns true if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
