//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's capacity and eviction guarantees.

use proptest::prelude::*;
use std::collections::VecDeque;

use crate::cache::{CacheKey, CacheStore, ImageOptions};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

// == Strategies ==
/// Generates image URLs, including ones containing the key delimiter
fn url_strategy() -> impl Strategy<Value = String> {
    "https://cdn\\.test/[a-z_]{1,12}\\.(jpg|png)".prop_map(|s| s)
}

fn options_strategy() -> impl Strategy<Value = ImageOptions> {
    (
        prop::option::of(prop_oneof![Just(150u32), Just(300u32)]),
        prop::option::of(Just(200u32)),
        prop::option::of(prop_oneof![Just(60u8), Just(80u8)]),
    )
        .prop_map(|(width, height, quality)| ImageOptions {
            width,
            height,
            quality,
        })
}

fn key_strategy() -> impl Strategy<Value = CacheKey> {
    (url_strategy(), options_strategy()).prop_map(|(url, options)| CacheKey::new(url, &options))
}

#[derive(Debug, Clone)]
enum StoreOp {
    Put(CacheKey),
    Get(CacheKey),
    Remove(CacheKey),
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => key_strategy().prop_map(StoreOp::Put),
        2 => key_strategy().prop_map(StoreOp::Get),
        1 => key_strategy().prop_map(StoreOp::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity: however many distinct keys are stored, the store never
    // holds more than its configured maximum.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::vec(key_strategy(), 1..200),
        max_entries in 1usize..20
    ) {
        let mut store = CacheStore::new(max_entries);

        for key in keys {
            let value = key.source_url().to_string();
            store.put(key, value);
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // FIFO: against a queue model, every eviction removes the earliest
    // inserted key still held, no matter how often keys were read.
    #[test]
    fn prop_fifo_matches_model(
        ops in prop::collection::vec(store_op_strategy(), 1..150),
        max_entries in 1usize..12
    ) {
        let mut store = CacheStore::new(max_entries);
        let mut model: VecDeque<CacheKey> = VecDeque::new();

        for op in ops {
            match op {
                StoreOp::Put(key) => {
                    let mut expected_evicted = None;
                    if !model.contains(&key) {
                        if model.len() >= max_entries {
                            expected_evicted = model.pop_front();
                        }
                        model.push_back(key.clone());
                    }
                    let evicted = store.put(key.clone(), key.to_string());
                    prop_assert_eq!(evicted.map(|e| e.key), expected_evicted);
                }
                StoreOp::Get(key) => {
                    let found = store.get(&key);
                    prop_assert_eq!(found.is_some(), model.contains(&key));
                }
                StoreOp::Remove(key) => {
                    let removed = store.remove(&key);
                    prop_assert_eq!(removed.is_some(), model.contains(&key));
                    model.retain(|k| k != &key);
                }
            }
        }

        let held: Vec<CacheKey> = store.entries().into_iter().map(|e| e.key).collect();
        prop_assert_eq!(held, model.into_iter().collect::<Vec<_>>());
    }

    // Last write wins for a key that is still held.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        first in "[a-z]{1,16}",
        second in "[a-z]{1,16}"
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);

        store.put(key.clone(), first);
        store.put(key.clone(), second.clone());

        prop_assert_eq!(store.get(&key), Some(second));
        prop_assert_eq!(store.len(), 1);
    }

    // Statistics: hits and misses count exactly the lookups that found or
    // missed an entry.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(store_op_strategy(), 1..80)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                StoreOp::Put(key) => {
                    store.put(key.clone(), key.to_string());
                }
                StoreOp::Get(key) => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                StoreOp::Remove(key) => {
                    store.remove(&key);
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, store.len());
    }
}

// == Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error variant renders as JSON with a string "error" field.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::error::CacheError;
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
            CacheError::Fetch(error_msg.clone()),
            CacheError::Internal(error_msg.clone()),
        ];

        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = tokio_test::block_on(to_bytes(response.into_body(), usize::MAX)).unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}

// == Additional Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        use crate::error::CacheError;
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let test_cases = vec![
            (CacheError::NotFound("blob".to_string()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
            (CacheError::Fetch("refused".to_string()), StatusCode::BAD_GATEWAY),
            (CacheError::Io(io), StatusCode::INTERNAL_SERVER_ERROR),
            (CacheError::Internal("error".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[test]
    fn test_distinct_options_are_distinct_entries() {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES);
        let url = "https://cdn.test/dish.jpg";

        store.put(CacheKey::new(url, &ImageOptions::sized(150, 200, 80)), url.to_string());
        store.put(CacheKey::new(url, &ImageOptions::sized(300, 200, 80)), url.to_string());

        assert_eq!(store.len(), 2);
    }
}
