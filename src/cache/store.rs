//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU eviction, TTL
//! expiration, tag/pattern invalidation and mutation events.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheEvent, CacheStats, EventBus, Listener, ListenerId, MAX_KEY_LENGTH};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Set Options ==
/// Per-write options for [`CacheStore::set`].
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// TTL override; falls back to the configured default when None.
    /// A zero duration means the entry never expires.
    pub ttl: Option<Duration>,
    /// Labels for bulk invalidation
    pub tags: Vec<String>,
}

impl SetOptions {
    /// Creates empty options (default TTL, no tags).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL for this write.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Adds an invalidation tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

// == Freshness ==
/// Classification of a cached value against a stale-while-revalidate window.
///
/// Unlike [`CacheStore::get`], grading never removes the entry: a stale
/// value must survive long enough to be served while revalidation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness<V> {
    /// The entry exists and its TTL has not elapsed
    Fresh(V),
    /// TTL elapsed but the entry is still within the stale window
    Stale(V),
    /// No entry, or expired beyond the stale window
    Miss,
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
///
/// This is the synchronous core; all methods take `&mut self` and finish
/// without suspending, so a caller holding the surrounding lock gets the
/// atomic-per-operation behavior the async layer relies on.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Mutation event listeners
    events: EventBus<V>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Default TTL for entries without explicit TTL
    default_ttl: Duration,
    /// Whether hit/miss counters are recorded
    enable_stats: bool,
}

impl<V: Clone + Serialize> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            events: EventBus::new(),
            stats: CacheStats::new(),
            max_entries: config.max_entries,
            default_ttl: config.default_ttl,
            enable_stats: config.enable_stats,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// An expired entry is removed on access (lazy expiry), counted as a
    /// miss and announced with an `Expire` event. A hit bumps the entry's
    /// access bookkeeping and emits a `Get` event.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let hit = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.touch();
                Some(entry.value.clone())
            }
            Some(_) => None, // present but expired
            None => {
                if self.enable_stats {
                    self.stats.record_miss();
                }
                return None;
            }
        };

        match hit {
            Some(value) => {
                if self.enable_stats {
                    self.stats.record_hit();
                }
                self.events.emit(&CacheEvent::Get {
                    key: key.to_string(),
                });
                Some(value)
            }
            None => {
                self.remove_bookkeeping(key);
                self.stats.record_expiration();
                if self.enable_stats {
                    self.stats.record_miss();
                }
                self.events.emit(&CacheEvent::Expire {
                    key: key.to_string(),
                });
                None
            }
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// Inserting a new key at capacity first evicts the least recently used
    /// entry. Emits a `Set` event.
    pub fn set(&mut self, key: String, value: V, options: SetOptions) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let is_overwrite = self.entries.contains_key(&key);
        if !is_overwrite && self.entries.len() >= self.max_entries {
            self.evict_lru();
        }

        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let tags = options.tags.into_iter().collect();
        let entry = CacheEntry::new(&key, value.clone(), ttl, tags);

        self.stats.add_memory(entry.cost);
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.stats.remove_memory(old.cost);
        }
        self.stats.set_size(self.entries.len());

        self.events.emit(&CacheEvent::Set { key, value });
        Ok(())
    }

    // == Has ==
    /// Returns true if the key is present and not expired.
    ///
    /// Applies the same lazy-expiry removal as `get`, but touches neither
    /// the hit/miss counters nor the entry's recency.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_bookkeeping(key);
            self.stats.record_expiration();
            self.events.emit(&CacheEvent::Expire {
                key: key.to_string(),
            });
            return false;
        }
        true
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.remove_bookkeeping(key).is_some() {
            self.events.emit(&CacheEvent::Delete {
                key: key.to_string(),
            });
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes all entries. Emits a single `Clear` event.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_size(0);
        self.stats.memory_usage = 0;
        self.events.emit(&CacheEvent::Clear);
    }

    // == Freshness ==
    /// Grades a key against a stale-while-revalidate window.
    ///
    /// A fresh entry is a read like any other: it bumps the entry's access
    /// bookkeeping, records a hit and emits a `Get` event, so entries served
    /// only through the stale-while-revalidate path still count as recently
    /// used for eviction. Stale and missed entries are never removed or
    /// touched here; a stale value must survive long enough to be served
    /// while revalidation runs.
    pub fn freshness(&mut self, key: &str, stale_window: Duration) -> Freshness<V> {
        let graded = {
            let Some(entry) = self.entries.get_mut(key) else {
                return Freshness::Miss;
            };

            let now = current_timestamp_ms();
            let fresh = match entry.expires_at {
                None => true,
                Some(expires_at) => now < expires_at,
            };

            if fresh {
                entry.touch();
                Freshness::Fresh(entry.value.clone())
            } else {
                let window_ms = u64::try_from(stale_window.as_millis()).unwrap_or(u64::MAX);
                // expires_at is Some here; a missing deadline graded as fresh
                let expires_at = entry.expires_at.unwrap_or(now);
                if now < expires_at.saturating_add(window_ms) {
                    Freshness::Stale(entry.value.clone())
                } else {
                    Freshness::Miss
                }
            }
        };

        if let Freshness::Fresh(_) = &graded {
            if self.enable_stats {
                self.stats.record_hit();
            }
            self.events.emit(&CacheEvent::Get {
                key: key.to_string(),
            });
        }
        graded
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, emitting `Expire` for each.
    ///
    /// Returns the number of entries removed. Redundant with lazy expiry on
    /// access, but bounds memory growth for keys written once and never
    /// re-read.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_bookkeeping(key);
            self.stats.record_expiration();
            self.events.emit(&CacheEvent::Expire { key: key.clone() });
        }

        expired_keys.len()
    }

    // == Invalidate By Tag ==
    /// Removes every entry whose tag set contains `tag`.
    ///
    /// Returns the number of entries removed. Full-table scan; no tag index
    /// is maintained, which keeps writes simple at the cost of invalidation
    /// speed bounded by `max_entries`.
    pub fn invalidate_by_tag(&mut self, tag: &str) -> usize {
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.tags.contains(tag))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            self.remove_bookkeeping(key);
            self.events.emit(&CacheEvent::Delete { key: key.clone() });
        }

        matching.len()
    }

    // == Invalidate By Pattern ==
    /// Removes every entry whose key matches a glob pattern
    /// (`*` = any run, `?` = one character, anchored to the full key).
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_by_pattern(&mut self, pattern: &str) -> Result<usize> {
        let regex = crate::cache::pattern::compile(pattern)?;

        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect();

        for key in &matching {
            self.remove_bookkeeping(key);
            self.events.emit(&CacheEvent::Delete { key: key.clone() });
        }

        Ok(matching.len())
    }

    // == Eviction ==
    /// Evicts the least recently used entry.
    ///
    /// O(n) scan over entry metadata; ties on `last_accessed_at` break
    /// deterministically toward the smallest key. Emits a `Delete` event
    /// for the victim.
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by(|(ka, a), (kb, b)| {
                a.last_accessed_at
                    .cmp(&b.last_accessed_at)
                    .then_with(|| ka.cmp(kb))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.remove_bookkeeping(&key);
            self.stats.record_eviction();
            self.events.emit(&CacheEvent::Delete { key });
        }
    }

    /// Removes an entry and keeps size/memory stats in step.
    fn remove_bookkeeping(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.stats.remove_memory(entry.cost);
        self.stats.set_size(self.entries.len());
        Some(entry)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    // == Events ==
    /// Registers a mutation listener.
    pub fn subscribe(&mut self, listener: Listener<V>) -> ListenerId {
        self.events.subscribe(listener)
    }

    /// Removes a mutation listener. Returns true if it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Drops all mutation listeners.
    pub fn clear_listeners(&mut self) {
        self.events.clear();
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
