//! Response DTOs for the host's admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the health endpoint (GET /__sw/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Worker lifecycle state
    pub state: String,
    /// Current version tag
    pub version: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(state: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            state: state.into(),
            version: version.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /__sw/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Requests served from the cache
    pub hits: u64,
    /// Intercepted requests with no cached match
    pub misses: u64,
    /// Misses answered by the network
    pub network_responses: u64,
    /// Misses answered with cached `/` or a 503
    pub offline_fallbacks: u64,
    /// Requests left to default network handling
    pub pass_through: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            network_responses: stats.network_responses,
            offline_fallbacks: stats.offline_fallbacks,
            pass_through: stats.pass_through,
        }
    }
}

/// One bucket in the caches listing.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

/// Response body for GET /__sw/caches
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    /// Bucket owned by the running version
    pub current: String,
    pub buckets: Vec<BucketSummary>,
}

/// Response body for POST /__sw/sync/:tag
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub tag: String,
    pub status: String,
}

impl SyncResponse {
    pub fn completed(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: "completed".to_string(),
        }
    }
}

/// Response body for POST /__sw/notification-click
#[derive(Debug, Clone, Serialize)]
pub struct NotificationClickResponse {
    /// Window URL the host was asked to open, if any
    pub opened: Option<String>,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy("activated", "cv-optimizer-v3");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("cv-optimizer-v3"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            hits: 8,
            misses: 2,
            network_responses: 2,
            offline_fallbacks: 0,
            pass_through: 5,
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.pass_through, 5);
    }

    #[test]
    fn test_sync_response_serialize() {
        let json = serde_json::to_string(&SyncResponse::completed("cv-sync")).unwrap();
        assert!(json.contains("cv-sync"));
        assert!(json.contains("completed"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
