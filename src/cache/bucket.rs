//! Cache Bucket Module
//!
//! A named map from request identity to stored response. One bucket exists
//! per deployed version.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::{CachedResponse, RequestKey};

// == Cache Bucket ==
/// A named, versioned store of cached responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheBucket {
    /// Bucket name (the version tag)
    name: String,
    /// Stored responses keyed by request identity
    entries: HashMap<RequestKey, CachedResponse>,
}

impl CacheBucket {
    // == Constructor ==
    /// Creates an empty bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Match ==
    /// Returns the stored response for an exact key match.
    pub fn match_request(&self, key: &RequestKey) -> Option<&CachedResponse> {
        self.entries.get(key)
    }

    // == Put All ==
    /// Stores every entry of a bulk write.
    pub fn put_all(&mut self, entries: impl IntoIterator<Item = (RequestKey, CachedResponse)>) {
        self.entries.extend(entries);
    }

    // == Entry Count ==
    /// Returns the current number of entries in the bucket.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Response;
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::get(&Url::parse("https://example.com").unwrap().join(path).unwrap())
    }

    fn cached(body: &str) -> CachedResponse {
        CachedResponse::from_response(&Response::network(200, vec![], body.as_bytes().to_vec()))
    }

    #[test]
    fn test_bucket_new() {
        let bucket = CacheBucket::new("cv-optimizer-v3");
        assert_eq!(bucket.name(), "cv-optimizer-v3");
        assert_eq!(bucket.entry_count(), 0);
    }

    #[test]
    fn test_bucket_put_all_and_match() {
        let mut bucket = CacheBucket::new("v1");
        bucket.put_all(vec![(key("/static/css/custom.css"), cached("body{}"))]);

        let hit = bucket.match_request(&key("/static/css/custom.css")).unwrap();
        assert_eq!(hit.body, b"body{}".to_vec());
        assert!(bucket.match_request(&key("/static/css/other.css")).is_none());
    }

    #[test]
    fn test_bucket_put_all_overwrites() {
        let mut bucket = CacheBucket::new("v1");
        bucket.put_all(vec![(key("/"), cached("old"))]);
        bucket.put_all(vec![(key("/"), cached("new"))]);

        assert_eq!(bucket.entry_count(), 1);
        assert_eq!(bucket.match_request(&key("/")).unwrap().body, b"new".to_vec());
    }

    #[test]
    fn test_bucket_put_all() {
        let mut bucket = CacheBucket::new("v1");
        bucket.put_all(vec![(key("/"), cached("shell")), (key("/a.js"), cached("js"))]);
        assert_eq!(bucket.entry_count(), 2);
    }
}
