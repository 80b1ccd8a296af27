//! API Module
//!
//! HTTP host for the worker: every page request becomes a fetch event, and a
//! small admin surface exposes lifecycle, statistics and the event stubs.
//!
//! # Endpoints
//! - `GET /__sw/health` - Health check endpoint
//! - `GET /__sw/stats` - Fetch statistics
//! - `GET /__sw/caches` - Cache buckets
//! - `POST /__sw/push` - Push event
//! - `POST /__sw/sync/:tag` - Background sync event
//! - `POST /__sw/notification-click` - Notification click event
//! - `*` - Intercepting proxy

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
