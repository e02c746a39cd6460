//! Persistent storage for extracted dictionary files.
//!
//! A [`CacheStore`] holds named buckets, one per dictionary identifier. Each
//! [`CacheBucket`] maps request-style keys (`/ipadic/dicrc`) derived from
//! in-archive entry names to the entry bytes, and remembers the order in
//! which keys were first written so cached dictionaries replay in archive
//! order.

mod disk;
mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A collection of named cache buckets
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether a bucket named `name` exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Open the bucket `name`, creating it if needed.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>>;

    /// Remove the bucket `name` and everything in it.
    ///
    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, name: &str) -> Result<bool>;
}

/// One named set of cached blobs
#[async_trait]
pub trait CacheBucket: Send + Sync {
    /// Look up a stored blob.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a blob, replacing any previous value for `key`.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// All keys, in the order they were first written.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Derive the cache key for an in-archive entry name.
///
/// Keys are normalized to `/a/b/c`. Names that try to escape the bucket
/// (`..`, `.`) or that are empty are rejected.
pub fn cache_key(entry_name: &str) -> Result<String> {
    let mut key = String::with_capacity(entry_name.len() + 1);
    for part in entry_name.split(['/', '\\']).filter(|p| !p.is_empty()) {
        if part == ".." || part == "." {
            return Err(Error::InvalidCacheKey(entry_name.to_string()));
        }
        key.push('/');
        key.push_str(part);
    }
    if key.is_empty() {
        return Err(Error::InvalidCacheKey(entry_name.to_string()));
    }
    Ok(key)
}

/// Recover the entry name a cache key was derived from.
pub fn entry_name(key: &str) -> &str {
    key.trim_start_matches('/')
}

pub(crate) fn check_bucket_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(Error::InvalidCacheKey(name.to_string()));
    }
    Ok(())
}
