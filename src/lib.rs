//! CV Optimizer Pro offline worker
//!
//! Versioned cache buckets, cache-first request interception with offline
//! fallbacks, and the push, sync and notification event handlers of the
//! application's service worker, hosted behind an HTTP proxy.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod tasks;
pub mod worker;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_periodic_sync_task;
pub use worker::{CacheManager, WorkerHost};
