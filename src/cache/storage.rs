//! Cache Storage Module
//!
//! The origin-scoped set of named buckets the worker controls, behind the
//! [`CacheStorage`] trait so buckets can live in memory or on disk.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheBucket, CachedResponse, RequestKey};
use crate::error::{Result, WorkerError};

// == Storage Trait ==
/// Named cache buckets owned by one origin.
///
/// Bulk writes through [`CacheStorage::put_all`] are all-or-nothing: either
/// every entry is stored or none is.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Opens a bucket, creating it if absent.
    async fn open(&self, name: &str) -> Result<()>;

    /// Returns true if the bucket exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Lists bucket names.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Deletes a bucket. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Writes every entry into an existing bucket, atomically.
    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<()>;

    /// Looks up an exact match in one bucket.
    async fn match_in(&self, name: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

    /// Looks up an exact match across all buckets in [`CacheStorage::keys`] order.
    async fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
        for name in self.keys().await? {
            if let Some(hit) = self.match_in(&name, key).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    /// Number of entries in a bucket.
    async fn entry_count(&self, name: &str) -> Result<usize>;
}

// == Memory Storage ==
/// In-memory buckets, kept in creation order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<Vec<CacheBucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        if !buckets.iter().any(|b| b.name() == name) {
            debug!("Creating cache bucket {}", name);
            buckets.push(CacheBucket::new(name));
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.buckets.read().await.iter().any(|b| b.name() == name))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .await
            .iter()
            .map(|b| b.name().to_string())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|b| b.name() != name);
        Ok(buckets.len() != before)
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .iter_mut()
            .find(|b| b.name() == name)
            .ok_or_else(|| WorkerError::NotFound(format!("Cache bucket '{}'", name)))?;
        bucket.put_all(entries);
        Ok(())
    }

    async fn match_in(&self, name: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|b| b.name() == name)
            .and_then(|b| b.match_request(key))
            .cloned())
    }

    async fn match_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().find_map(|b| b.match_request(key)).cloned())
    }

    async fn entry_count(&self, name: &str) -> Result<usize> {
        let buckets = self.buckets.read().await;
        buckets
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.entry_count())
            .ok_or_else(|| WorkerError::NotFound(format!("Cache bucket '{}'", name)))
    }
}
