//! Getting dictionary files from the cache or the network.
//!
//! The acquirer makes one pass and never retries. On the network path the
//! archive is streamed through [`ZipStreamReader`] and each file is written
//! to the cache bucket as soon as it is decoded; if anything fails along the
//! way the whole bucket is discarded so a later run never sees a partial
//! dictionary. On the cache path the stored files are replayed directly.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::files::{DictionaryFile, DictionaryFiles};
use crate::cache::{CacheBucket, CacheStore, cache_key, entry_name};
use crate::error::{Error, Result};
use crate::io::{ByteStream, Fetcher};
use crate::zip::ZipStreamReader;

/// Where acquired files came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionarySource {
    pub origin: Origin,
    /// Archive size when the network reported one; always `None` for the
    /// cache, whose entries are already split
    pub total_bytes: Option<u64>,
}

/// Emitted once per acquired file, in acquisition order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub origin: Origin,
    pub name: String,
    pub size: u64,
    pub total: Option<u64>,
}

pub struct DictionaryAcquirer {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn CacheStore>,
}

impl DictionaryAcquirer {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn CacheStore>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Decide which path an acquisition of `identifier` would take.
    pub async fn choose_origin(&self, identifier: &str, skip_cache: bool) -> Result<Origin> {
        if skip_cache || !self.cache.has(identifier).await? {
            Ok(Origin::Network)
        } else {
            Ok(Origin::Cache)
        }
    }

    /// Acquire the dictionary files for `identifier`.
    ///
    /// With `skip_cache` the archive at `url` is always fetched and the cache
    /// is left untouched. Otherwise a cached copy is used when present, and a
    /// fresh download is written to the cache as it is extracted.
    /// `on_progress` sees one event per file, in order.
    pub async fn acquire<F>(
        &self,
        identifier: &str,
        url: &str,
        skip_cache: bool,
        mut on_progress: F,
    ) -> Result<DictionaryFiles>
    where
        F: FnMut(&ProgressEvent) + Send,
    {
        let origin = self.choose_origin(identifier, skip_cache).await?;
        log::info!(
            "acquiring dictionary {} from {:?} (skip_cache={})",
            identifier,
            origin,
            skip_cache
        );

        let files = match origin {
            Origin::Network => {
                self.acquire_from_network(identifier, url, skip_cache, &mut on_progress)
                    .await?
            }
            Origin::Cache => self.acquire_from_cache(identifier, &mut on_progress).await?,
        };

        log::info!(
            "acquired {} files ({} bytes) for {}",
            files.len(),
            files.total_size(),
            identifier
        );
        Ok(files)
    }

    async fn acquire_from_network<F>(
        &self,
        identifier: &str,
        url: &str,
        skip_cache: bool,
        on_progress: &mut F,
    ) -> Result<DictionaryFiles>
    where
        F: FnMut(&ProgressEvent) + Send,
    {
        let response = self.fetcher.fetch(url).await?;
        let total = response.content_length;

        if skip_cache {
            return extract(response.body, total, None, on_progress).await;
        }

        let result = async {
            let bucket = self.cache.open(identifier).await?;
            extract(response.body, total, Some(bucket.as_ref()), on_progress).await
        }
        .await;
        self.discard_on_error(identifier, result).await
    }

    async fn acquire_from_cache<F>(
        &self,
        identifier: &str,
        on_progress: &mut F,
    ) -> Result<DictionaryFiles>
    where
        F: FnMut(&ProgressEvent) + Send,
    {
        let result = async {
            let bucket = self.cache.open(identifier).await?;
            let mut files = Vec::new();

            for key in bucket.keys().await? {
                let data = bucket
                    .get(&key)
                    .await?
                    .ok_or_else(|| Error::NotCached(key.clone()))?;
                let file = DictionaryFile {
                    name: entry_name(&key).to_string(),
                    data,
                };
                on_progress(&ProgressEvent {
                    origin: Origin::Cache,
                    name: file.name.clone(),
                    size: file.size(),
                    total: None,
                });
                files.push(file);
            }

            if files.is_empty() {
                return Err(Error::NoFilesExtracted);
            }
            Ok(DictionaryFiles {
                source: DictionarySource {
                    origin: Origin::Cache,
                    total_bytes: None,
                },
                files,
            })
        }
        .await;

        self.discard_on_error(identifier, result).await
    }

    /// Drop the bucket for `identifier` if `result` failed, then pass the
    /// result through unchanged.
    async fn discard_on_error<T>(&self, identifier: &str, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            log::warn!("discarding cache {} after error: {}", identifier, e);
            if let Err(delete_err) = self.cache.delete(identifier).await {
                log::warn!("failed to discard cache {}: {}", identifier, delete_err);
            }
        }
        result
    }
}

/// Stream `body` through the ZIP reader, persisting each file to `bucket`
/// when one is given.
async fn extract<F>(
    body: Box<dyn ByteStream>,
    total: Option<u64>,
    bucket: Option<&dyn CacheBucket>,
    on_progress: &mut F,
) -> Result<DictionaryFiles>
where
    F: FnMut(&ProgressEvent) + Send,
{
    let mut reader = ZipStreamReader::new(body);
    let mut files = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        if entry.is_directory() {
            continue;
        }

        let key = cache_key(&entry.name)?;
        if let Some(bucket) = bucket {
            bucket.put(&key, &entry.data).await?;
        }

        let file = DictionaryFile {
            name: entry_name(&key).to_string(),
            data: entry.data,
        };
        on_progress(&ProgressEvent {
            origin: Origin::Network,
            name: file.name.clone(),
            size: file.size(),
            total,
        });
        files.push(file);
    }

    if files.is_empty() {
        return Err(Error::NoFilesExtracted);
    }
    Ok(DictionaryFiles {
        source: DictionarySource {
            origin: Origin::Network,
            total_bytes: total,
        },
        files,
    })
}
