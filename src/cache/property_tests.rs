//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the bucket and interception properties against
//! generated bucket sets and request sequences.

use proptest::prelude::*;
use std::sync::Arc;

use axum::http::Method;
use url::Url;

use crate::cache::{CacheStorage, MemoryStorage, RequestKey};
use crate::config::WorkerConfig;
use crate::models::Request;
use crate::network::testing::StubFetcher;
use crate::worker::{CacheManager, FetchOutcome};

// == Test Configuration ==
const ORIGIN: &str = "http://cv.local";
const CURRENT_TAG: &str = "cv-optimizer-v3";
const MANIFEST: &[&str] = &["/", "/static/css/custom.css", "/static/js/main.js"];

// == Strategies ==
/// Generates bucket names, both versioned and foreign
fn bucket_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..20).prop_map(|n| format!("cv-optimizer-v{}", n)),
        "[a-z]{1,10}-v[0-9]{1,2}".prop_map(|s| s),
        "[a-z][a-z0-9-]{0,15}".prop_map(|s| s),
    ]
}

/// Generates origin-relative paths outside the manifest
fn unlisted_path_strategy() -> impl Strategy<Value = String> {
    "/api/[a-z]{1,12}".prop_map(|s| s)
}

fn non_get_method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::POST),
        Just(Method::PUT),
        Just(Method::PATCH),
        Just(Method::DELETE),
        Just(Method::HEAD),
    ]
}

/// Generates fetches: `true` for a manifest asset, `false` for an unlisted path
fn fetch_sequence_strategy() -> impl Strategy<Value = Vec<(bool, String)>> {
    prop::collection::vec((any::<bool>(), unlisted_path_strategy()), 1..30)
}

fn manager(storage: Arc<MemoryStorage>, fetcher: Arc<StubFetcher>) -> CacheManager {
    let config = WorkerConfig::new(CURRENT_TAG, MANIFEST, ORIGIN).unwrap();
    CacheManager::new(config, storage, fetcher)
}

fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // After install and activate, whatever buckets existed before, the only
    // bucket left is the one named by the current tag.
    #[test]
    fn prop_activate_leaves_only_current_bucket(
        existing in prop::collection::vec(bucket_name_strategy(), 0..12)
    ) {
        tokio_test::block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            for name in &existing {
                storage.open(name).await.unwrap();
            }
            let worker = manager(storage.clone(), Arc::new(StubFetcher::with_routes(MANIFEST)));

            prop_assert!(worker.install().await.is_complete());
            let report = worker.activate().await;

            prop_assert!(report.is_clean());
            prop_assert_eq!(storage.keys().await.unwrap(), vec![CURRENT_TAG.to_string()]);
            prop_assert_eq!(storage.entry_count(CURRENT_TAG).await.unwrap(), MANIFEST.len());
            Ok(())
        })?;
    }

    // Network responses for misses are returned but never stored.
    #[test]
    fn prop_miss_never_writes_back(paths in prop::collection::vec(unlisted_path_strategy(), 1..20)) {
        tokio_test::block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let fetcher = Arc::new(StubFetcher::with_routes(MANIFEST));
            for path in &paths {
                fetcher.route(path, 200, "fresh");
            }
            let worker = manager(storage.clone(), fetcher);
            worker.install().await;
            worker.activate().await;

            for path in &paths {
                let outcome = worker.handle_fetch(Request::get(url(path))).await;
                prop_assert!(matches!(outcome, FetchOutcome::Respond(ref r) if r.status == 200));
                prop_assert!(storage
                    .match_any(&RequestKey::get(&url(path)))
                    .await
                    .unwrap()
                    .is_none());
            }

            prop_assert_eq!(storage.entry_count(CURRENT_TAG).await.unwrap(), MANIFEST.len());
            Ok(())
        })?;
    }

    // Non-GET requests are never answered by the worker and never touch the network.
    #[test]
    fn prop_non_get_passes_through(
        method in non_get_method_strategy(),
        index in 0..MANIFEST.len()
    ) {
        tokio_test::block_on(async {
            let storage = Arc::new(MemoryStorage::new());
            let fetcher = Arc::new(StubFetcher::with_routes(MANIFEST));
            let worker = manager(storage, fetcher.clone());
            worker.install().await;
            let calls = fetcher.calls().len();

            let request = Request::new(method.clone(), url(MANIFEST[index]));
            let outcome = worker.handle_fetch(request).await;

            prop_assert!(matches!(outcome, FetchOutcome::PassThrough(ref r) if r.method == method));
            prop_assert_eq!(fetcher.calls().len(), calls);
            Ok(())
        })?;
    }

    // Statistics count exactly one hit per manifest fetch and one miss per
    // unlisted fetch.
    #[test]
    fn prop_statistics_accuracy(fetches in fetch_sequence_strategy()) {
        tokio_test::block_on(async {
            let worker = manager(
                Arc::new(MemoryStorage::new()),
                Arc::new(StubFetcher::with_routes(MANIFEST)),
            );
            worker.install().await;

            let mut expected_hits = 0u64;
            let mut expected_misses = 0u64;
            for (cached, path) in &fetches {
                let target = if *cached {
                    expected_hits += 1;
                    url(MANIFEST[path.len() % MANIFEST.len()])
                } else {
                    expected_misses += 1;
                    url(path)
                };
                worker.handle_fetch(Request::get(target)).await;
            }

            let stats = worker.stats();
            prop_assert_eq!(stats.hits, expected_hits);
            prop_assert_eq!(stats.misses, expected_misses);
            prop_assert_eq!(stats.network_responses, expected_misses);
            prop_assert_eq!(stats.offline_fallbacks, 0);
            Ok(())
        })?;
    }

    // The fragment is not part of a request's identity.
    #[test]
    fn prop_request_key_ignores_fragment(
        path in "/[a-z]{1,8}(/[a-z0-9]{1,8}){0,3}",
        fragment in "[a-zA-Z0-9]{1,12}"
    ) {
        let plain = url(&path);
        let with_fragment = url(&format!("{}#{}", path, fragment));

        prop_assert_eq!(RequestKey::get(&plain), RequestKey::get(&with_fragment));
        prop_assert!(!RequestKey::get(&with_fragment).as_str().contains('#'));
    }
}
