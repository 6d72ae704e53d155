//! memocache - An embedded in-memory cache and memoization engine
//!
//! Provides a single-process cache with TTL expiration, LRU eviction,
//! tag and glob-pattern invalidation, mutation events, request
//! deduplication and stale-while-revalidate access.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use memocache::{CacheConfig, MemoryCache, SetOptions};
//!
//! #[tokio::main]
//! async fn main() -> memocache::Result<()> {
//!     let cache: MemoryCache<String> = MemoryCache::new(CacheConfig::default());
//!     cache.start_sweeper().await;
//!
//!     cache
//!         .set(
//!             "user:1",
//!             "alice".to_string(),
//!             SetOptions::new().ttl(Duration::from_secs(60)).tag("users"),
//!         )
//!         .await?;
//!
//!     let profile = cache
//!         .get_or_set("profile:1", || async { Ok("loaded".to_string()) }, SetOptions::new())
//!         .await?;
//!     assert_eq!(profile, "loaded");
//!
//!     cache.invalidate_by_tag("users").await;
//!     cache.destroy().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod memo;
pub mod tasks;

pub use cache::{CacheEvent, CacheStats, Freshness, ListenerId, SetOptions, MAX_KEY_LENGTH};
pub use config::CacheConfig;
pub use dedupe::PendingTable;
pub use error::{CacheError, Result};
pub use memo::{MemoryCache, StaleOptions};
pub use tasks::spawn_cleanup_task;
