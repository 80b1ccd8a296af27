//! Request and Response models
//!
//! [`fetch`] holds the values the worker's fetch handler consumes and
//! produces; [`requests`] and [`responses`] are the JSON DTOs of the host's
//! admin endpoints.

pub mod fetch;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use fetch::{Destination, Request, Response, ResponseSource};
pub use requests::NotificationClickRequest;
pub use responses::{
    BucketSummary, CachesResponse, ErrorResponse, HealthResponse, NotificationClickResponse,
    StatsResponse, SyncResponse,
};
