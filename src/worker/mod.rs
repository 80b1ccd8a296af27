//! Worker Module
//!
//! The offline cache worker: its event handlers ([`CacheManager`]), the
//! lifecycle it moves through, and the host runtime that delivers events.
//!
//! # Events
//! - `install`: pre-cache the asset manifest into the current bucket
//! - `activate`: delete buckets of previous versions
//! - `fetch`: cache-first for GET, offline fallbacks when the network fails
//! - `push`, `sync`, `periodicsync`, `notificationclick`: inert handlers

mod host;
mod lifecycle;
mod manager;
mod notification;

pub use host::{EventOutcome, ServiceWorker, WorkerEvent, WorkerHost};
pub use lifecycle::WorkerState;
pub use manager::{
    ActivateReport, CacheManager, DeletionFailure, FetchOutcome, InstallOutcome, SyncKind,
    SyncOutcome, OFFLINE_MESSAGE,
};
pub use notification::{
    ClickOutcome, HostEvent, Notification, NotificationAction, NOTIFICATION_TITLE, OPEN_ACTION,
};
