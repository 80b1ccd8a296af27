//! Error types for the offline cache worker
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Worker Error Enum ==
/// Unified error type for the cache worker and its HTTP host.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Requested resource or bucket does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network fetch failed before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Cache storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration value is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request body exceeds the forwarding limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Operation is not allowed in the worker's current lifecycle state
    #[error("Invalid state: {0}")]
    State(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkerError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkerError::Network(_) => StatusCode::BAD_GATEWAY,
            WorkerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            WorkerError::State(_) => StatusCode::CONFLICT,
            WorkerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            WorkerError::Storage(_)
            | WorkerError::InvalidConfig(_)
            | WorkerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache worker.
pub type Result<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_maps_to_bad_gateway() {
        let response = WorkerError::Network("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_state_error_maps_to_conflict() {
        let response = WorkerError::State("not activated".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_payload_too_large_maps_to_413() {
        let response = WorkerError::PayloadTooLarge("17 MiB".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_io_error_becomes_storage_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: WorkerError = io.into();
        assert!(matches!(err, WorkerError::Storage(_)));
    }
}
