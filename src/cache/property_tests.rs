//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify correctness properties of the cache core.

use proptest::prelude::*;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheStore, SetOptions};
use crate::config::CacheConfig;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

fn test_config(max_entries: usize) -> CacheConfig {
    CacheConfig {
        max_entries,
        default_ttl: Duration::from_secs(300),
        ..CacheConfig::default()
    }
}

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}".prop_map(|s| s)
}

/// Generates valid cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of cache operations, the hit/miss counters reflect
    // exactly the gets that returned a value and the gets that did not.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    let _ = store.set(key, value, SetOptions::new());
                }
                CacheOp::Get { key } => {
                    match store.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    let _ = store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, store.len(), "Size mismatch");
    }

    // For any valid key-value pair, storing and retrieving it before
    // expiration returns the exact value that was stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        store.set(key.clone(), value.clone(), SetOptions::new()).unwrap();

        let retrieved = store.get(&key);
        prop_assert_eq!(retrieved, Some(value), "Round-trip value mismatch");
    }

    // For any key in the cache, a GET after DELETE returns nothing.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        store.set(key.clone(), value, SetOptions::new()).unwrap();
        prop_assert!(store.get(&key).is_some(), "Key should exist before delete");

        prop_assert!(store.delete(&key));

        prop_assert!(store.get(&key).is_none(), "Key should not exist after delete");
    }

    // Storing V1 then V2 under the same key makes GET return V2.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        store.set(key.clone(), value1, SetOptions::new()).unwrap();
        store.set(key.clone(), value2.clone(), SetOptions::new()).unwrap();

        let retrieved = store.get(&key);
        prop_assert_eq!(retrieved, Some(value2), "Overwrite should return new value");
        prop_assert_eq!(store.len(), 1, "Should have exactly one entry after overwrite");
    }

    // For any sequence of SET operations, the entry count never exceeds
    // the configured maximum.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..200
        )
    ) {
        let max_entries = 50;
        let mut store: CacheStore<String> = CacheStore::new(&test_config(max_entries));

        for (key, value) in entries {
            let _ = store.set(key, value, SetOptions::new());
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // invalidate_by_pattern("user:*") removes exactly the "user:" keys
    // and reports their count.
    #[test]
    fn prop_pattern_invalidation_exactness(
        user_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 1..10),
        post_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 1..10),
    ) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        for id in &user_ids {
            store.set(format!("user:{id}"), "u".to_string(), SetOptions::new()).unwrap();
        }
        for id in &post_ids {
            store.set(format!("post:{id}"), "p".to_string(), SetOptions::new()).unwrap();
        }

        let removed = store.invalidate_by_pattern("user:*").unwrap();
        prop_assert_eq!(removed, user_ids.len(), "Removed count mismatch");

        // Bindings hoisted: prop_assert! stringifies its expression into a
        // format string, so braces inside the expression must not appear
        for id in &user_ids {
            let key = format!("user:{}", id);
            prop_assert!(store.get(&key).is_none());
        }
        for id in &post_ids {
            let key = format!("post:{}", id);
            prop_assert!(store.get(&key).is_some());
        }
    }

    // invalidate_by_tag removes exactly the tagged entries.
    #[test]
    fn prop_tag_invalidation_exactness(
        tagged in prop::collection::hash_set("t[a-z0-9]{1,8}", 1..10),
        untagged in prop::collection::hash_set("u[a-z0-9]{1,8}", 1..10),
    ) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        for key in &tagged {
            store.set(key.clone(), "v".to_string(), SetOptions::new().tag("group")).unwrap();
        }
        for key in &untagged {
            store.set(key.clone(), "v".to_string(), SetOptions::new()).unwrap();
        }

        let removed = store.invalidate_by_tag("group");
        prop_assert_eq!(removed, tagged.len(), "Removed count mismatch");

        for key in &tagged {
            prop_assert!(store.get(key).is_none());
        }
        for key in &untagged {
            prop_assert!(store.get(key).is_some());
        }
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // For any entry stored with a TTL, a GET after the TTL elapsed
    // reports a miss.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let mut store: CacheStore<String> = CacheStore::new(&test_config(TEST_MAX_ENTRIES));

        store.set(
            key.clone(),
            value.clone(),
            SetOptions::new().ttl(Duration::from_millis(40)),
        ).unwrap();

        let result_before = store.get(&key);
        prop_assert_eq!(result_before, Some(value), "Value should match before expiration");

        sleep(Duration::from_millis(70));

        prop_assert!(store.get(&key).is_none(), "Entry should not be found after TTL expires");
        // Idempotent: a second read after expiry is still a plain miss
        prop_assert!(store.get(&key).is_none());
    }
}

// Property tests for LRU eviction behavior. Recency is millisecond-granular,
// so writes are spaced by short sleeps; the case count stays small.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    // Filling the cache to capacity and adding one more entry evicts the
    // entry accessed least recently.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::hash_set(valid_key_strategy(), 3..6),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys: Vec<String> = initial_keys.into_iter().collect();
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut store: CacheStore<String> = CacheStore::new(&test_config(capacity));

        // Fill to capacity; the first key written is strictly the oldest
        let oldest_key = unique_keys[0].clone();
        for key in &unique_keys {
            store.set(key.clone(), format!("value_{}", key), SetOptions::new()).unwrap();
            sleep(Duration::from_millis(2));
        }

        prop_assert_eq!(store.len(), capacity, "Cache should be at capacity");

        store.set(new_key.clone(), new_value, SetOptions::new()).unwrap();

        prop_assert_eq!(store.len(), capacity, "Cache should remain at capacity after eviction");
        prop_assert!(
            store.get(&oldest_key).is_none(),
            "Oldest key '{}' should have been evicted",
            oldest_key
        );
        prop_assert!(store.get(&new_key).is_some(), "New key should exist");

        for key in unique_keys.iter().skip(1) {
            prop_assert!(
                store.get(key).is_some(),
                "Key '{}' should still exist (not the oldest)",
                key
            );
        }
    }

    // A GET on an existing key makes it most recently used, so it is not
    // the next eviction candidate.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::hash_set(valid_key_strategy(), 3..6),
        new_key in valid_key_strategy(),
        new_value in valid_value_strategy()
    ) {
        let unique_keys: Vec<String> = keys.into_iter().collect();
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let mut store: CacheStore<String> = CacheStore::new(&test_config(capacity));

        for key in &unique_keys {
            store.set(key.clone(), format!("value_{}", key), SetOptions::new()).unwrap();
            sleep(Duration::from_millis(2));
        }

        // Touch the would-be victim; the second key becomes the oldest
        let accessed_key = unique_keys[0].clone();
        let _ = store.get(&accessed_key);
        sleep(Duration::from_millis(2));

        let expected_evicted = unique_keys[1].clone();

        store.set(new_key.clone(), new_value, SetOptions::new()).unwrap();

        prop_assert!(
            store.get(&accessed_key).is_some(),
            "Accessed key '{}' should not be evicted after being touched",
            accessed_key
        );
        prop_assert!(
            store.get(&expected_evicted).is_none(),
            "Key '{}' should have been evicted as it was oldest after access",
            expected_evicted
        );
        prop_assert!(store.get(&new_key).is_some(), "New key should exist");
    }
}

// == Property Test for Concurrent Operation Correctness ==
// Thread-safe access through the async handle: operations interleave across
// tasks, but each one is atomic under the store lock.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_concurrent_operation_correctness(
        initial_entries in prop::collection::vec(
            (valid_key_strategy(), valid_value_strategy()),
            1..20
        ),
        operations in prop::collection::vec(cache_op_strategy(), 10..50)
    ) {
        use crate::memo::MemoryCache;

        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let cache: MemoryCache<String> =
                MemoryCache::new(test_config(TEST_MAX_ENTRIES));

            for (key, value) in &initial_entries {
                let _ = cache.set(key, value.clone(), SetOptions::new()).await;
            }

            let mut handles = vec![];
            for op in operations {
                let cache = cache.clone();
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Set { key, value } => {
                            let _ = cache.set(&key, value, SetOptions::new()).await;
                        }
                        CacheOp::Get { key } => {
                            let _ = cache.get(&key).await;
                        }
                        CacheOp::Delete { key } => {
                            let _ = cache.delete(&key).await;
                        }
                    }
                }));
            }

            for handle in handles {
                handle.await.expect("Task should not panic");
            }

            let stats = cache.stats().await;
            prop_assert!(
                stats.size <= TEST_MAX_ENTRIES,
                "Cache should not exceed max entries"
            );

            let hit_rate = stats.hit_rate();
            prop_assert!(
                (0.0..=1.0).contains(&hit_rate),
                "Hit rate should be between 0 and 1, got {}",
                hit_rate
            );

            Ok(())
        })?;
    }
}
