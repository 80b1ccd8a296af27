//! Background Tasks Module
//!
//! Contains background tasks that run periodically during host operation.
//!
//! # Tasks
//! - Periodic Sync: Delivers `periodicsync` events at the configured interval

mod periodic_sync;

pub use periodic_sync::spawn_periodic_sync_task;
