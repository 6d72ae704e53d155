//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Fixed per-entry overhead assumed by the heuristic memory estimate, in bytes.
const ENTRY_OVERHEAD_BYTES: usize = 100;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of reads that hit this entry since it was (re)written
    pub access_count: u64,
    /// Timestamp of the most recent write or read hit (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Labels used for bulk invalidation
    pub tags: HashSet<String>,
    /// Heuristic byte estimate for this entry (key + serialized value + overhead)
    pub cost: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// A zero `ttl` means the entry never expires. The byte cost is estimated
    /// once at creation: `2 * key length + 2 * JSON length + fixed overhead`.
    /// The estimate is intentionally approximate; values that fail to
    /// serialize contribute only key and overhead.
    pub fn new(key: &str, value: V, ttl: Duration, tags: HashSet<String>) -> Self
    where
        V: Serialize,
    {
        let now = current_timestamp_ms();
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            Some(now.saturating_add(ttl_ms))
        };
        let value_bytes = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
        let cost = 2 * key.len() + 2 * value_bytes + ENTRY_OVERHEAD_BYTES;

        Self {
            value,
            created_at: now,
            expires_at,
            access_count: 0,
            last_accessed_at: now,
            tags,
            cost,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current time
    /// is greater than or equal to the expiration time, so an entry whose TTL
    /// has fully elapsed is immediately expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a read hit: bumps the access count and recency timestamp.
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = current_timestamp_ms();
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the entry has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
