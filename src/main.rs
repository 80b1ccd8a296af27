//! CV Optimizer Pro offline worker host
//!
//! Serves the application through the worker: installs and activates it on
//! startup, then routes every page request through its fetch handler.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cv_optimizer_sw::api::create_router;
use cv_optimizer_sw::worker::HostEvent;
use cv_optimizer_sw::{spawn_periodic_sync_task, AppState, Config};

/// Main entry point for the worker host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create cache storage and the worker
/// 4. Install and activate the worker
/// 5. Start background periodic sync task, if configured
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cv_optimizer_sw=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Optimizer Pro worker host");

    let config = Config::from_env();
    info!(
        "Configuration loaded: version={}, upstream={}, port={}, manifest_entries={}, periodic_sync_interval={}s",
        config.version_tag,
        config.upstream_origin,
        config.server_port,
        config.manifest.len(),
        config.periodic_sync_interval
    );

    let (state, events) =
        AppState::from_config(&config).context("Failed to create worker from configuration")?;
    let events_handle = spawn_event_logger(events);

    let (install, report) = state
        .host
        .start()
        .await
        .context("Failed to start worker")?;
    if !install.is_complete() {
        warn!("Worker running without pre-cached assets");
    }
    if !report.is_clean() {
        warn!("Some old caches could not be removed: {:?}", report.failed);
    }

    let sync_handle = (config.periodic_sync_interval > 0).then(|| {
        info!("Background periodic sync task started");
        spawn_periodic_sync_task(
            state.host.clone(),
            config.periodic_sync_tag.clone(),
            config.periodic_sync_interval,
        )
    });

    let host = state.host.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sync_handle))
        .await
        .context("Server error")?;

    if let Err(e) = host.retire().await {
        warn!("Could not retire worker: {}", e);
    }
    events_handle.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Logs what the worker asks of its host. There is no browser to show
/// notifications or open windows, so the requests are recorded.
fn spawn_event_logger(mut events: mpsc::UnboundedReceiver<HostEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                HostEvent::StateChange { version, state } => {
                    info!("Worker {} entered state {}", version, state)
                }
                HostEvent::ShowNotification(notification) => info!(
                    "Notification requested: {} - {}",
                    notification.title, notification.body
                ),
                HostEvent::OpenWindow(url) => info!("Window requested for {}", url),
            }
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the periodic sync task and allows graceful shutdown.
async fn shutdown_signal(sync_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = sync_handle {
        handle.abort();
        warn!("Periodic sync task aborted");
    }
}
