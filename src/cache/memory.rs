use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{CacheBucket, CacheStore, check_bucket_name};
use crate::error::Result;

/// Process-local cache store, lost when dropped
#[derive(Default)]
pub struct MemoryCache {
    buckets: Mutex<BTreeMap<String, Arc<MemoryBucket>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<MemoryBucket>>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.lock().contains_key(name))
    }

    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        check_bucket_name(name)?;
        let bucket = self.lock().entry(name.to_string()).or_default().clone();
        Ok(bucket)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.lock().remove(name).is_some())
    }
}

#[derive(Default)]
struct MemoryBucket {
    entries: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryBucket {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<u8>)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheBucket for MemoryBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, data)| data.clone()))
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut entries = self.lock();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = data.to_vec(),
            None => entries.push((key.to_string(), data.to_vec())),
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().iter().map(|(k, _)| k.clone()).collect())
    }
}
