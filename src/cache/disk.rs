use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{CacheBucket, CacheStore, cache_key, check_bucket_name, entry_name};
use crate::error::{Error, Result};

/// File holding a bucket's keys, one per line, in write order
const MANIFEST: &str = "manifest";
const FILES_DIR: &str = "files";

/// Cache store backed by a directory tree.
///
/// Layout: `<root>/<bucket>/manifest` plus `<root>/<bucket>/files/<key path>`.
/// A bucket counts as present once its manifest exists, i.e. after the first
/// successful `put`.
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if let Err(e) = fs::create_dir_all(&root).await {
            return Err(Error::Capability(format!(
                "Cache storage is not available at {}: {}",
                root.display(),
                e
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> Result<PathBuf> {
        check_bucket_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn has(&self, name: &str) -> Result<bool> {
        let manifest = self.bucket_dir(name)?.join(MANIFEST);
        Ok(fs::try_exists(manifest).await?)
    }

    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        let dir = self.bucket_dir(name)?;
        fs::create_dir_all(dir.join(FILES_DIR)).await?;

        let keys = match fs::read_to_string(dir.join(MANIFEST)).await {
            Ok(text) => text
                .lines()
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Arc::new(DiskBucket {
            dir,
            keys: Mutex::new(keys),
        }))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.bucket_dir(name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

struct DiskBucket {
    dir: PathBuf,
    keys: Mutex<Vec<String>>,
}

impl DiskBucket {
    fn blob_path(&self, key: &str) -> Result<PathBuf> {
        let normalized = cache_key(key)?;
        Ok(self.dir.join(FILES_DIR).join(entry_name(&normalized)))
    }
}

#[async_trait]
impl CacheBucket for DiskBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(key)?).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        let mut keys = self.keys.lock().await;
        if !keys.iter().any(|k| k == key) {
            let mut manifest = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(MANIFEST))
                .await?;
            manifest.write_all(format!("{}\n", key).as_bytes()).await?;
            manifest.flush().await?;
            keys.push(key.to_string());
        }
        log::debug!("cached {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.keys.lock().await.clone())
    }
}
