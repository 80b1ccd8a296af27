//! Cache Manager
//!
//! The worker's event handlers: pre-cache the manifest on install, serve GETs
//! cache-first on fetch, evict stale buckets on activate, and the inert push,
//! sync and notification-click handlers.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStats, CacheStorage, CachedResponse, RequestKey, StatsRecorder};
use crate::config::{VersionTag, WorkerConfig};
use crate::error::{Result, WorkerError};
use crate::models::{Request, Response};
use crate::network::Fetcher;

use super::notification::{ClickOutcome, Notification, OPEN_ACTION};

/// Body of the synthetic 503 served to sub-resource requests while offline.
pub const OFFLINE_MESSAGE: &str =
    "Brak połączenia z internetem. Aplikacja CV Optimizer Pro działa w trybie offline.";

// == Outcomes ==
/// Result of the install handler. A failed pre-cache is not an error: the
/// worker still installs, with an empty bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InstallOutcome {
    /// Every manifest entry was cached.
    Complete { cached: usize },
    /// The bulk write failed; nothing from it was stored.
    Degraded { reason: String },
}

impl InstallOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, InstallOutcome::Complete { .. })
    }
}

/// A stale bucket that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub name: String,
    pub reason: String,
}

/// Result of the activate handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Bucket kept by this version
    pub current: String,
    /// Stale buckets removed
    pub deleted: Vec<String>,
    /// Stale buckets whose deletion failed
    pub failed: Vec<DeletionFailure>,
    /// Set when bucket names could not be listed at all
    pub enumeration_error: Option<String>,
}

impl ActivateReport {
    /// Returns true if every stale bucket was removed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.enumeration_error.is_none()
    }
}

/// Result of the fetch handler.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host applies default network behaviour.
    PassThrough(Request),
    /// Intercepted; answer the page with this response.
    Respond(Response),
}

/// Which sync event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncKind {
    Background,
    Periodic,
}

/// Result of a sync handler. Sync work is not queued or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub tag: String,
    pub kind: SyncKind,
}

// == Cache Manager ==
/// Event handlers of one deployed worker version.
pub struct CacheManager {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    stats: StatsRecorder,
}

impl CacheManager {
    // == Constructor ==
    /// Creates the handlers for `config`, reading and writing buckets in
    /// `storage` and reaching the network through `fetcher`.
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            fetcher,
            stats: StatsRecorder::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Install ==
    /// Opens the current bucket and pre-caches the manifest.
    ///
    /// Failures are logged and reported as [`InstallOutcome::Degraded`]; there
    /// is no retry.
    pub async fn install(&self) -> InstallOutcome {
        let name = self.config.cache_name();
        info!("Installing worker, opening cache {}", name);

        if let Err(e) = self.storage.open(name).await {
            warn!("Install failed, could not open cache {}: {}", name, e);
            return InstallOutcome::Degraded {
                reason: e.to_string(),
            };
        }

        match self.precache(name).await {
            Ok(cached) => {
                info!("Cached {} manifest entries in {}", cached, name);
                InstallOutcome::Complete { cached }
            }
            Err(e) => {
                warn!("Install failed, continuing without pre-cached assets: {}", e);
                InstallOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Fetches every manifest entry and stores them in one bulk write. Any
    /// network error or non-2xx status aborts the whole write.
    async fn precache(&self, name: &str) -> Result<usize> {
        let requests = self
            .config
            .manifest()
            .iter()
            .map(|path| self.config.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>>>()?;

        let responses = join_all(requests.iter().map(|req| self.fetcher.fetch(req))).await;

        let mut entries = Vec::with_capacity(requests.len());
        for (request, response) in requests.iter().zip(responses) {
            let response = response?;
            if !response.is_success() {
                return Err(WorkerError::Network(format!(
                    "{} returned status {}",
                    request.url, response.status
                )));
            }
            entries.push((
                RequestKey::get(&request.url),
                CachedResponse::from_response(&response),
            ));
        }

        let count = entries.len();
        self.storage.put_all(name, entries).await?;
        Ok(count)
    }

    // == Fetch ==
    /// Serves a request cache-first.
    ///
    /// Non-GET requests (and cross-origin requests when restricted to the
    /// origin) are passed through. Misses go to the network and are never
    /// written back. When the network fails, navigations get the cached `/`
    /// and everything else gets a 503 offline response.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        let Some(key) = RequestKey::from_request(&request) else {
            self.stats.record_pass_through();
            return FetchOutcome::PassThrough(request);
        };

        if self.config.same_origin_only() && !self.config.is_same_origin(&request.url) {
            debug!("Passing through cross-origin request {}", request.url);
            self.stats.record_pass_through();
            return FetchOutcome::PassThrough(request);
        }

        match self.storage.match_any(&key).await {
            Ok(Some(hit)) => {
                debug!("Cache hit {}", key);
                self.stats.record_hit();
                return FetchOutcome::Respond(hit.to_response());
            }
            Ok(None) => debug!("Cache miss {}", key),
            Err(e) => warn!("Cache lookup failed for {}, treating as miss: {}", key, e),
        }
        self.stats.record_miss();

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                self.stats.record_network();
                FetchOutcome::Respond(response)
            }
            Err(e) => {
                warn!("Fetch failed for {}: {}", request.url, e);
                self.stats.record_offline_fallback();
                FetchOutcome::Respond(self.offline_fallback(&request).await)
            }
        }
    }

    async fn offline_fallback(&self, request: &Request) -> Response {
        if request.destination.is_document() {
            match self.config.resolve("/") {
                Ok(root) => match self.storage.match_any(&RequestKey::get(&root)).await {
                    Ok(Some(shell)) => return shell.to_response(),
                    Ok(None) => debug!("No cached app shell for offline navigation"),
                    Err(e) => warn!("Cache lookup for app shell failed: {}", e),
                },
                Err(e) => warn!("Cannot resolve app shell: {}", e),
            }
        }
        Response::offline(OFFLINE_MESSAGE)
    }

    // == Activate ==
    /// Deletes every bucket not named by the current version tag.
    ///
    /// Deletions run concurrently; one failing deletion does not stop the
    /// others.
    pub async fn activate(&self) -> ActivateReport {
        let current = self.config.cache_name().to_string();
        info!("Activating worker {}", current);

        let mut report = ActivateReport {
            current: current.clone(),
            ..Default::default()
        };

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                error!("Could not list caches during activation: {}", e);
                report.enumeration_error = Some(e.to_string());
                return report;
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| *name != current).collect();
        for name in &stale {
            if let Ok(tag) = VersionTag::parse(name) {
                if tag.supersedes(self.config.version()) {
                    warn!("Deleting newer cache {} while activating {}", name, current);
                }
            }
        }

        let results = join_all(stale.iter().map(|name| async move {
            info!("Deleting old cache: {}", name);
            (name, self.storage.delete(name).await)
        }))
        .await;

        for (name, result) in results {
            match result {
                Ok(true) => report.deleted.push(name.clone()),
                Ok(false) => debug!("Cache {} was already gone", name),
                Err(e) => {
                    warn!("Failed to delete old cache {}: {}", name, e);
                    report.failed.push(DeletionFailure {
                        name: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    // == Push ==
    /// Builds the fixed app notification for a push payload.
    pub fn handle_push(&self, payload: Option<&[u8]>) -> Notification {
        let notification = Notification::from_push(payload);
        info!("Push received, showing notification");
        notification
    }

    // == Sync ==
    /// Handles a background or periodic sync tag. Resolves immediately.
    pub fn handle_sync(&self, tag: &str, kind: SyncKind) -> SyncOutcome {
        info!("Sync event {:?} for tag {}", kind, tag);
        SyncOutcome {
            tag: tag.to_string(),
            kind,
        }
    }

    // == Notification Click ==
    /// Opens the app root for the `open` action or a click on the
    /// notification body; other actions are ignored.
    pub fn handle_notification_click(&self, action: Option<&str>) -> ClickOutcome {
        match action {
            None | Some(OPEN_ACTION) => match self.config.resolve("/") {
                Ok(root) => ClickOutcome::OpenWindow(root),
                Err(e) => {
                    warn!("Cannot resolve app root for notification click: {}", e);
                    ClickOutcome::Ignored
                }
            },
            Some(other) => {
                debug!("Ignoring notification action {}", other);
                ClickOutcome::Ignored
            }
        }
    }
}
