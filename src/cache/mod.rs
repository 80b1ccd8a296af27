//! Cache Module
//!
//! Versioned cache buckets mapping GET request identity to stored responses,
//! in memory or persisted to disk.

mod bucket;
mod entry;
mod file;
mod stats;
mod storage;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bucket::CacheBucket;
pub use entry::{CachedResponse, RequestKey};
pub use file::FileStorage;
pub use stats::{CacheStats, StatsRecorder};
pub use storage::{CacheStorage, MemoryStorage};
