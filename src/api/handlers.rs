//! API Handlers
//!
//! The intercepting proxy handler that turns every page request into a
//! worker fetch event, plus the admin handlers under `/__sw`.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method},
    response::Response as HttpResponse,
    Json,
};
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::cache::{CacheStorage, FileStorage, MemoryStorage};
use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::models::{
    BucketSummary, CachesResponse, Destination, HealthResponse, NotificationClickRequest,
    NotificationClickResponse, Request, Response, StatsResponse, SyncResponse,
};
use crate::network::{is_hop_by_hop, Fetcher, HttpFetcher};
use crate::worker::{
    CacheManager, ClickOutcome, FetchOutcome, HostEvent, Notification, SyncKind, WorkerHost,
};

/// Largest request body forwarded upstream (CV uploads).
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Response header naming where a response came from.
pub const SOURCE_HEADER: &str = "x-sw-source";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runtime hosting the worker
    pub host: WorkerHost,
    /// Bucket storage, for the caches listing
    pub storage: Arc<dyn CacheStorage>,
    /// Network used for requests the worker passes through
    pub fetcher: Arc<dyn Fetcher>,
    /// Origin page requests are resolved against
    pub origin: Url,
}

impl AppState {
    /// Hosts `manager`. The receiver gets the worker's host events.
    pub fn new(manager: CacheManager) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let storage = manager.storage().clone();
        let fetcher = manager.fetcher().clone();
        let origin = manager.config().origin().clone();
        let (host, events) = WorkerHost::new(Arc::new(manager));

        (
            Self {
                host,
                storage,
                fetcher,
                origin,
            },
            events,
        )
    }

    /// Creates a new AppState from configuration.
    ///
    /// Buckets go to `cache_dir` when set, otherwise they live in memory.
    pub fn from_config(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<HostEvent>)> {
        let worker_config = config.worker_config()?;
        let storage: Arc<dyn CacheStorage> = match &config.cache_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)?),
            None => Arc::new(MemoryStorage::new()),
        };
        let manager = CacheManager::new(worker_config, storage, Arc::new(HttpFetcher::new()?));
        Ok(Self::new(manager))
    }

    /// Converts an incoming HTTP request into the worker's request value.
    ///
    /// The request target only supplies path and query; scheme, host and port
    /// always come from the origin.
    pub async fn to_worker_request(&self, req: axum::extract::Request) -> Result<Request> {
        let (parts, body) = req.into_parts();

        let mut url = self.origin.clone();
        url.set_path(parts.uri.path());
        url.set_query(parts.uri.query());

        if let Some(length) = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if length > MAX_BODY_BYTES {
                return Err(body_too_large());
            }
        }

        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // Bodies without a Content-Length only fail here by crossing the limit.
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
            debug!("Reading request body failed: {}", e);
            body_too_large()
        })?;

        Ok(Request {
            destination: destination_of(&parts.method, &parts.headers),
            method: parts.method,
            url,
            headers,
            body: body.to_vec(),
        })
    }

    /// Sends a request the worker passed through to the network. Only
    /// requests for the origin are forwarded.
    pub async fn forward(&self, request: Request) -> Result<Response> {
        if request.url.origin() != self.origin.origin() {
            return Err(WorkerError::InvalidRequest(format!(
                "Refusing to forward {} outside {}",
                request.url, self.origin
            )));
        }
        debug!("Forwarding {} {}", request.method, request.url);
        self.fetcher.fetch(&request).await
    }
}

fn body_too_large() -> WorkerError {
    WorkerError::PayloadTooLarge(format!(
        "Request body exceeds {} bytes",
        MAX_BODY_BYTES
    ))
}

/// Reads the request destination from `Sec-Fetch-Dest`, treating GETs that
/// accept HTML as navigations when the header is missing.
pub fn destination_of(method: &Method, headers: &HeaderMap) -> Destination {
    if let Some(dest) = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
        return Destination::from_fetch_dest(dest);
    }
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);
    if *method == Method::GET && accepts_html {
        Destination::Document
    } else {
        Destination::Empty
    }
}

/// Builds the HTTP response sent back to the browser.
pub fn into_http_response(response: Response) -> Result<HttpResponse> {
    let mut builder = axum::http::Response::builder().status(response.status);
    for (name, value) in &response.headers {
        if !is_hop_by_hop(name) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    builder
        .header(SOURCE_HEADER, response.source.as_str())
        .body(Body::from(response.body))
        .map_err(|e| WorkerError::Internal(format!("Building response: {}", e)))
}

/// Fallback handler for every non-admin path.
///
/// Dispatches a fetch event; requests the worker passes through are sent to
/// the origin unchanged.
pub async fn proxy_handler(
    State(state): State<AppState>,
    req: axum::extract::Request,
) -> Result<HttpResponse> {
    let request = state.to_worker_request(req).await?;

    let response = match state.host.fetch(request).await {
        FetchOutcome::Respond(response) => response,
        FetchOutcome::PassThrough(request) => state.forward(request).await?,
    };

    into_http_response(response)
}

/// Handler for GET /__sw/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let worker_state = state.host.state().await;
    Json(HealthResponse::healthy(worker_state.as_str(), state.host.version()))
}

/// Handler for GET /__sw/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.host.stats()))
}

/// Handler for GET /__sw/caches
///
/// Lists every bucket with its entry count.
pub async fn caches_handler(State(state): State<AppState>) -> Result<Json<CachesResponse>> {
    let current = state.host.version().to_string();

    let mut buckets = Vec::new();
    for name in state.storage.keys().await? {
        let entries = state.storage.entry_count(&name).await?;
        buckets.push(BucketSummary {
            current: name == current,
            name,
            entries,
        });
    }

    Ok(Json(CachesResponse { current, buckets }))
}

/// Handler for POST /__sw/push
///
/// The request body is the push payload, read as plain text.
pub async fn push_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<Notification>> {
    let payload = (!body.is_empty()).then(|| body.to_vec());
    let notification = state.host.push(payload).await?;
    Ok(Json(notification))
}

/// Handler for POST /__sw/sync/:tag
pub async fn sync_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Json<SyncResponse>> {
    if tag.trim().is_empty() || tag.len() > 64 {
        return Err(WorkerError::InvalidRequest(
            "Sync tag must be 1 to 64 characters".to_string(),
        ));
    }

    let outcome = state.host.sync(&tag, SyncKind::Background).await?;
    Ok(Json(SyncResponse::completed(outcome.tag)))
}

/// Handler for POST /__sw/notification-click
pub async fn notification_click_handler(
    State(state): State<AppState>,
    Json(req): Json<NotificationClickRequest>,
) -> Result<Json<NotificationClickResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(WorkerError::InvalidRequest(error_msg));
    }

    let opened = match state.host.notification_click(req.action.as_deref()).await? {
        ClickOutcome::OpenWindow(url) => Some(url.to_string()),
        ClickOutcome::Ignored => None,
    };

    Ok(Json(NotificationClickResponse { opened }))
}
