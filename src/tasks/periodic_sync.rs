//! Periodic Sync Task
//!
//! Background task that delivers a `periodicsync` event to the worker at a
//! fixed interval.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::worker::{SyncKind, WorkerHost};

/// Spawns a background task that fires periodic sync events.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between events. Events hitting a worker that is not active are logged and
/// skipped; nothing is queued for later.
///
/// # Arguments
/// * `host` - Host of the worker receiving the events
/// * `tag` - Periodic sync tag
/// * `interval_secs` - Interval in seconds between events
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_periodic_sync_task(host.clone(), "content-sync".to_string(), 3600);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_periodic_sync_task(host: WorkerHost, tag: String, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting periodic sync task '{}' with interval of {} seconds",
            tag,
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match host.sync(&tag, SyncKind::Periodic).await {
                Ok(outcome) => debug!("Periodic sync '{}' completed", outcome.tag),
                Err(e) => warn!("Periodic sync '{}' skipped: {}", tag, e),
            }
        }
    })
}
