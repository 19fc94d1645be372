//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the cache engine's behavioral properties.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::thread::sleep;
use std::time::Duration;

use crate::cache::store::{InstanceOptions, TtlStore};

// == Strategies ==
/// Generates logical cache keys.
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,64}"
}

/// Generates instance key prefixes, including the empty prefix.
fn prefix_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9.]{0,12}"
}

/// Generates payloads the cache will actually store (never falsy).
fn truthy_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z0-9 ]{1,32}".prop_map(|s| json!(s)),
        (1i64..100_000).prop_map(|n| json!(n)),
        Just(json!(true)),
        "[a-z]{1,16}".prop_map(|s| json!({ "name": s })),
        (1i64..100).prop_map(|n| json!([n])),
    ]
}

/// Generates the payloads `set` treats as an implicit delete.
fn falsy_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!(false)),
        Just(json!("")),
        Just(json!(0)),
        Just(json!(0.0)),
    ]
}

/// One step of a random operation sequence.
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), truthy_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn store_with_prefix(prefix: String) -> TtlStore {
    TtlStore::new(
        "prop",
        InstanceOptions {
            key_prefix: prefix,
            ..InstanceOptions::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing a value and reading it back (before any expiry) returns
    // exactly the stored value, whatever the instance prefix is.
    #[test]
    fn prop_roundtrip_storage(
        prefix in prefix_strategy(),
        key in key_strategy(),
        value in truthy_value_strategy()
    ) {
        let mut store = store_with_prefix(prefix);

        store.set(&key, value.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value));
    }

    // After delete, the key reads as absent.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in truthy_value_strategy()) {
        let mut store = store_with_prefix(String::new());

        store.set(&key, value, None);
        prop_assert!(store.has(&key), "key should exist before delete");

        prop_assert!(store.delete(&key));
        prop_assert_eq!(store.get(&key), None);
    }

    // A second set for the same key replaces the value wholesale.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in truthy_value_strategy(),
        value2 in truthy_value_strategy()
    ) {
        let mut store = store_with_prefix(String::new());

        store.set(&key, value1, None);
        store.set(&key, value2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1, "overwrite must not grow the store");
    }

    // Enumeration never leaks the instance prefix: after setting a batch of
    // keys, keys() returns exactly the logical keys that went in.
    #[test]
    fn prop_prefix_transparency(
        prefix in prefix_strategy(),
        keys in prop::collection::hash_set(key_strategy(), 1..20)
    ) {
        let mut store = store_with_prefix(prefix);

        for key in &keys {
            store.set(key, json!({ "k": key }), None);
        }

        let listed: HashSet<String> = store.keys().into_iter().collect();
        prop_assert_eq!(listed, keys.clone());

        for (key, value) in store.entries() {
            prop_assert!(keys.contains(&key), "entries() leaked key '{}'", key);
            prop_assert_eq!(value, json!({ "k": key }));
        }
    }

    // Sharp edge, preserved deliberately: setting any falsy payload deletes
    // the key instead of caching the payload.
    #[test]
    fn prop_falsy_set_deletes(
        key in key_strategy(),
        before in truthy_value_strategy(),
        falsy in falsy_value_strategy()
    ) {
        let mut store = store_with_prefix(String::new());

        store.set(&key, before, None);
        store.set(&key, falsy, None);

        prop_assert!(!store.has(&key), "falsy set must drop the entry");
        prop_assert_eq!(store.len(), 0);
    }

    // query returns exactly the values of the keys under the caller prefix.
    #[test]
    fn prop_query_returns_prefix_matches(
        instance_prefix in prefix_strategy(),
        keys in prop::collection::hash_set(key_strategy(), 1..20),
        query_prefix in "[a-zA-Z0-9_-]{1,2}"
    ) {
        let mut store = store_with_prefix(instance_prefix);

        for key in &keys {
            store.set(key, json!({ "k": key }), None);
        }

        let expected: HashSet<String> = keys
            .iter()
            .filter(|k| k.starts_with(&query_prefix))
            .cloned()
            .collect();

        let matched: HashSet<String> = store
            .query(&query_prefix)
            .into_iter()
            .map(|v| v["k"].as_str().unwrap().to_string())
            .collect();

        prop_assert_eq!(matched, expected);
    }

    // get_many returns exactly the requested keys that are present.
    #[test]
    fn prop_get_many_omits_misses(
        present in prop::collection::hash_set(key_strategy(), 1..10),
        absent in prop::collection::hash_set(key_strategy(), 1..10)
    ) {
        let mut store = store_with_prefix(String::new());

        for key in &present {
            store.set(key, json!({ "k": key }), None);
        }

        let requested: Vec<String> = present.union(&absent).cloned().collect();
        let found: HashMap<String, Value> = store.get_many(&requested);

        for key in &present {
            prop_assert_eq!(found.get(key), Some(&json!({ "k": key })));
        }
        for key in absent.difference(&present) {
            prop_assert!(!found.contains_key(key));
        }
    }

    // Hit/miss counters reflect exactly the lookups that happened.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = store_with_prefix(String::new());
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(&key, value, None);
                }
                CacheOp::Get { key } => {
                    match store.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "misses mismatch");
        prop_assert_eq!(stats.entries, store.len(), "entry count mismatch");
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry stored with a TTL is served before the TTL elapses and is
    // absent afterwards, whether or not an interval sweep has run.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_strategy(),
        value in truthy_value_strategy()
    ) {
        let mut store = store_with_prefix(String::new());

        let ttl_seconds = 1u64;
        store.set(&key, value.clone(), Some(ttl_seconds));

        let before = store.get(&key);
        prop_assert_eq!(before, Some(value), "entry should be served before TTL elapses");

        sleep(Duration::from_millis(1100));

        prop_assert_eq!(store.get(&key), None, "entry must be absent after TTL elapses");
    }
}

// == Concurrent Handle Tests ==
// Shared-handle operations interleave at operation boundaries only; the
// instance stays internally consistent whatever the interleaving.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_concurrent_handles_stay_consistent(
        ops in prop::collection::vec(cache_op_strategy(), 10..40)
    ) {
        use crate::cache::CacheRegistry;

        tokio_test::block_on(async {
            let registry = CacheRegistry::new();
            let cache = registry.instance("concurrent", InstanceOptions::default());

            let mut handles = vec![];
            for op in ops {
                let cache = cache.clone();
                handles.push(tokio::spawn(async move {
                    match op {
                        CacheOp::Set { key, value } => {
                            cache.set(&key, value, None).await;
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
                handle.await.expect("cache task should not panic");
            }

            let stats = cache.stats().await;
            let hit_rate = stats.hit_rate();
            prop_assert!(
                (0.0..=1.0).contains(&hit_rate),
                "hit rate should be between 0 and 1, got {}",
                hit_rate
            );
            prop_assert_eq!(stats.entries, cache.len().await);

            Ok(())
        })?;
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_key_is_allowed() {
        let mut store = store_with_prefix("p.".to_string());

        store.set("", json!("root"), None);
        assert_eq!(store.get(""), Some(json!("root")));
        assert_eq!(store.keys(), vec!["".to_string()]);
    }

    #[test]
    fn test_unicode_keys_round_trip() {
        let mut store = store_with_prefix(String::new());

        store.set("clé-číslo-鍵", json!(1), None);
        assert!(store.has("clé-číslo-鍵"));
    }
}
