//! Cache Entry Module
//!
//! Defines request identity keys and the stored form of cached responses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Request, Response, ResponseSource};

// == Request Key ==
/// Identity of a cacheable request: method plus absolute URL.
///
/// Only GET requests have a key. The URL fragment is not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Builds the key of a GET request for `url`.
    pub fn get(url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self(format!("GET {}", url))
    }

    /// Builds the key of `request`, or None if the request is not a GET.
    pub fn from_request(request: &Request) -> Option<Self> {
        request.is_get().then(|| Self::get(&request.url))
    }

    /// The URL part of the key.
    pub fn url(&self) -> &str {
        self.0.strip_prefix("GET ").unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Cached Response ==
/// A response as stored in a cache bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
    /// When the response was written to the bucket
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    // == Constructor ==
    /// Captures a response for storage.
    pub fn from_response(response: &Response) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            cached_at: Utc::now(),
        }
    }

    /// Rebuilds the response served to the page. Stored entries are served
    /// verbatim.
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            source: ResponseSource::Cache,
        }
    }

    /// Body length in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}
