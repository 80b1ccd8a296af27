//! File-backed cache storage.
//!
//! Each bucket is one JSON file `<name>.json` in the cache directory, so
//! buckets survive host restarts the way browser cache storage does. Writes go
//! to a temporary file that is renamed over the bucket file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{CacheBucket, CacheStorage, CachedResponse, RequestKey};
use crate::error::{Result, WorkerError};

const BUCKET_EXTENSION: &str = "json";

/// Buckets persisted as JSON files in a directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on bucket files
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Opens (creating if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bucket_path(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(WorkerError::InvalidRequest(format!(
                "Bucket name '{}' is not a valid file name",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.{}", name, BUCKET_EXTENSION)))
    }

    async fn load(&self, name: &str) -> Result<Option<CacheBucket>> {
        let path = self.bucket_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, bucket: &CacheBucket) -> Result<()> {
        let path = self.bucket_path(bucket.name())?;
        let tmp = path.with_extension("tmp");
        let bytes = serde_json::to_vec(bucket)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for FileStorage {
    async fn open(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.load(name).await?.is_none() {
            debug!("Creating cache bucket file for {}", name);
            self.save(&CacheBucket::new(name)).await?;
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.bucket_path(name)?).await?)
    }

    /// Bucket names in sorted order.
    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BUCKET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.bucket_path(name)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_all(&self, name: &str, entries: Vec<(RequestKey, CachedResponse)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut bucket = self
            .load(name)
            .await?
            .ok_or_else(|| WorkerError::NotFound(format!("Cache bucket '{}'", name)))?;
        bucket.put_all(entries);
        self.save(&bucket).await
    }

    async fn match_in(&self, name: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
        Ok(self
            .load(name)
            .await?
            .and_then(|bucket| bucket.match_request(key).cloned()))
    }

    async fn entry_count(&self, name: &str) -> Result<usize> {
        self.load(name)
            .await?
            .map(|bucket| bucket.entry_count())
            .ok_or_else(|| WorkerError::NotFound(format!("Cache bucket '{}'", name)))
    }
}
