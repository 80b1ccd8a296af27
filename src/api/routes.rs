//! API Routes
//!
//! Configures the Axum router: admin endpoints under `/__sw` and the
//! intercepting proxy for everything else.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    caches_handler, health_handler, notification_click_handler, proxy_handler, push_handler,
    stats_handler, sync_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /__sw/health` - Health check with worker state
/// - `GET /__sw/stats` - Fetch interception statistics
/// - `GET /__sw/caches` - Bucket listing
/// - `POST /__sw/push` - Deliver a push event
/// - `POST /__sw/sync/:tag` - Deliver a background sync event
/// - `POST /__sw/notification-click` - Deliver a notification click
/// - anything else - Worker fetch event
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/caches", get(caches_handler))
        .route("/push", post(push_handler))
        .route("/sync/:tag", post(sync_handler))
        .route("/notification-click", post(notification_click_handler));

    Router::new()
        .nest("/__sw", admin)
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStorage;
    use crate::config::WorkerConfig;
    use crate::network::testing::StubFetcher;
    use crate::worker::CacheManager;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    const MANIFEST: &[&str] = &["/", "/static/css/custom.css"];

    async fn create_test_app(fetcher: Arc<StubFetcher>) -> Router {
        let config = WorkerConfig::new("cv-optimizer-v3", MANIFEST, "http://cv.local").unwrap();
        let manager = CacheManager::new(config, Arc::new(MemoryStorage::new()), fetcher);
        let (state, _events) = AppState::new(manager);
        state.host.start().await.unwrap();
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app(Arc::new(StubFetcher::with_routes(MANIFEST))).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/__sw/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cached_asset_served_from_cache() {
        let fetcher = Arc::new(StubFetcher::with_routes(MANIFEST));
        let app = create_test_app(fetcher.clone()).await;
        let calls_after_install = fetcher.calls().len();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/css/custom.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-sw-source"], "cache");
        assert_eq!(fetcher.calls().len(), calls_after_install);
    }

    #[tokio::test]
    async fn test_post_is_forwarded() {
        let fetcher = Arc::new(StubFetcher::with_routes(MANIFEST));
        fetcher.route("/upload-cv", 201, "uploaded");
        let app = create_test_app(fetcher.clone()).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload-cv")
                    .body(Body::from("cv"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-sw-source"], "network");
        assert!(fetcher.calls().iter().any(|u| u == "http://cv.local/upload-cv"));
    }

    #[tokio::test]
    async fn test_post_while_offline_is_bad_gateway() {
        let fetcher = Arc::new(StubFetcher::with_routes(MANIFEST));
        let app = create_test_app(fetcher.clone()).await;
        fetcher.go_offline();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process-cv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_sync_endpoint() {
        let app = create_test_app(Arc::new(StubFetcher::with_routes(MANIFEST))).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/__sw/sync/cv-upload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
