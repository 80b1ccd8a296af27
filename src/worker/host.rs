//! Worker host runtime.
//!
//! [`ServiceWorker`] is the set of named event handlers a worker registers;
//! [`WorkerHost`] drives the lifecycle, dispatches events to the handlers and
//! awaits each handler's deferred work before the event counts as handled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::cache::CacheStats;
use crate::error::{Result, WorkerError};
use crate::models::Request;

use super::manager::{
    ActivateReport, CacheManager, FetchOutcome, InstallOutcome, SyncKind, SyncOutcome,
};
use super::notification::{ClickOutcome, HostEvent, Notification};
use super::WorkerState;

// == Handler Trait ==
/// Event handlers of a worker.
#[async_trait]
pub trait ServiceWorker: Send + Sync {
    /// Bucket name / version tag of this worker.
    fn version(&self) -> &str;

    async fn install(&self) -> InstallOutcome;

    async fn activate(&self) -> ActivateReport;

    async fn fetch(&self, request: Request) -> FetchOutcome;

    async fn push(&self, payload: Option<Vec<u8>>) -> Notification;

    async fn sync(&self, tag: &str, kind: SyncKind) -> SyncOutcome;

    async fn notification_click(&self, action: Option<&str>) -> ClickOutcome;

    /// Fetch statistics, if the worker keeps any.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[async_trait]
impl ServiceWorker for CacheManager {
    fn version(&self) -> &str {
        self.config().cache_name()
    }

    async fn install(&self) -> InstallOutcome {
        CacheManager::install(self).await
    }

    async fn activate(&self) -> ActivateReport {
        CacheManager::activate(self).await
    }

    async fn fetch(&self, request: Request) -> FetchOutcome {
        self.handle_fetch(request).await
    }

    async fn push(&self, payload: Option<Vec<u8>>) -> Notification {
        self.handle_push(payload.as_deref())
    }

    async fn sync(&self, tag: &str, kind: SyncKind) -> SyncOutcome {
        self.handle_sync(tag, kind)
    }

    async fn notification_click(&self, action: Option<&str>) -> ClickOutcome {
        self.handle_notification_click(action)
    }

    fn stats(&self) -> CacheStats {
        CacheManager::stats(self)
    }
}

// == Events ==
/// Events the host delivers to the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(Option<Vec<u8>>),
    Sync(String),
    PeriodicSync(String),
    NotificationClick(Option<String>),
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Push(_) => "push",
            WorkerEvent::Sync(_) => "sync",
            WorkerEvent::PeriodicSync(_) => "periodicsync",
            WorkerEvent::NotificationClick(_) => "notificationclick",
        }
    }
}

/// What a dispatched event settled to.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Notified(Notification),
    Synced(SyncOutcome),
    Clicked(ClickOutcome),
}

// == Worker Host ==
struct HostInner {
    worker: Arc<dyn ServiceWorker>,
    state: RwLock<WorkerState>,
    events: mpsc::UnboundedSender<HostEvent>,
}

/// Runs one worker: lifecycle state plus event dispatch.
///
/// Cheap to clone; clones share the same worker and state.
#[derive(Clone)]
pub struct WorkerHost {
    inner: Arc<HostInner>,
}

impl WorkerHost {
    /// Creates a host for `worker`. The receiver gets notifications, window
    /// requests and state changes.
    pub fn new(worker: Arc<dyn ServiceWorker>) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            inner: Arc::new(HostInner {
                worker,
                state: RwLock::new(WorkerState::Parsed),
                events,
            }),
        };
        (host, rx)
    }

    pub fn worker(&self) -> &Arc<dyn ServiceWorker> {
        &self.inner.worker
    }

    pub fn version(&self) -> &str {
        self.inner.worker.version()
    }

    pub async fn state(&self) -> WorkerState {
        *self.inner.state.read().await
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.worker.stats()
    }

    /// Installs then activates the worker.
    pub async fn start(&self) -> Result<(InstallOutcome, ActivateReport)> {
        let install = self.install().await?;
        let activate = self.activate().await?;
        Ok((install, activate))
    }

    /// Runs the install handler. Allowed once, from `Parsed`.
    pub async fn install(&self) -> Result<InstallOutcome> {
        self.transition(WorkerState::Installing).await?;
        let outcome = self.inner.worker.install().await;
        self.transition(WorkerState::Installed).await?;
        Ok(outcome)
    }

    /// Runs the activate handler. Allowed once, after install.
    pub async fn activate(&self) -> Result<ActivateReport> {
        self.transition(WorkerState::Activating).await?;
        let report = self.inner.worker.activate().await;
        self.transition(WorkerState::Activated).await?;
        Ok(report)
    }

    /// Delivers a fetch event. Before activation the worker does not control
    /// pages, so the request is passed through.
    pub async fn fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().await.is_active() {
            debug!("Worker not active, passing through {}", request.url);
            return FetchOutcome::PassThrough(request);
        }
        self.inner.worker.fetch(request).await
    }

    /// Delivers a push event and asks the host to show the notification.
    pub async fn push(&self, payload: Option<Vec<u8>>) -> Result<Notification> {
        self.require_active("push").await?;
        let notification = self.inner.worker.push(payload).await;
        self.emit(HostEvent::ShowNotification(notification.clone()));
        Ok(notification)
    }

    /// Delivers a background or periodic sync event.
    pub async fn sync(&self, tag: &str, kind: SyncKind) -> Result<SyncOutcome> {
        self.require_active("sync").await?;
        Ok(self.inner.worker.sync(tag, kind).await)
    }

    /// Delivers a notification click and forwards any window request.
    pub async fn notification_click(&self, action: Option<&str>) -> Result<ClickOutcome> {
        self.require_active("notificationclick").await?;
        let outcome = self.inner.worker.notification_click(action).await;
        if let ClickOutcome::OpenWindow(url) = &outcome {
            self.emit(HostEvent::OpenWindow(url.clone()));
        }
        Ok(outcome)
    }

    /// Dispatches any event and waits for its handler to settle.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
        debug!("Dispatching {} event", event.name());
        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch(request) => Ok(EventOutcome::Fetched(self.fetch(request).await)),
            WorkerEvent::Push(payload) => self.push(payload).await.map(EventOutcome::Notified),
            WorkerEvent::Sync(tag) => self
                .sync(&tag, SyncKind::Background)
                .await
                .map(EventOutcome::Synced),
            WorkerEvent::PeriodicSync(tag) => self
                .sync(&tag, SyncKind::Periodic)
                .await
                .map(EventOutcome::Synced),
            WorkerEvent::NotificationClick(action) => self
                .notification_click(action.as_deref())
                .await
                .map(EventOutcome::Clicked),
        }
    }

    /// Marks the worker as replaced. No further events are handled.
    pub async fn retire(&self) -> Result<()> {
        self.transition(WorkerState::Redundant).await
    }

    async fn transition(&self, next: WorkerState) -> Result<()> {
        {
            let mut state = self.inner.state.write().await;
            if !state.can_transition_to(next) {
                return Err(WorkerError::State(format!(
                    "Cannot move worker {} from {} to {}",
                    self.version(),
                    *state,
                    next
                )));
            }
            *state = next;
        }
        info!("Worker {} is {}", self.version(), next);
        self.emit(HostEvent::StateChange {
            version: self.version().to_string(),
            state: next,
        });
        Ok(())
    }

    async fn require_active(&self, event: &str) -> Result<()> {
        let state = self.state().await;
        if state.is_active() {
            Ok(())
        } else {
            Err(WorkerError::State(format!(
                "Cannot deliver {} to a worker in state {}",
                event, state
            )))
        }
    }

    fn emit(&self, event: HostEvent) {
        if self.inner.events.send(event).is_err() {
            warn!("Host event receiver dropped");
        }
    }
}
