//! Cache Module
//!
//! Provides the synchronous cache core: entry model, TTL expiration, LRU
//! eviction, tag/pattern invalidation, statistics and mutation events.

mod entry;
mod events;
mod pattern;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use events::{CacheEvent, EventBus, Listener, ListenerId};
pub use stats::CacheStats;
pub use store::{CacheStore, Freshness, SetOptions};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
