use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::{ByteStream, FetchResponse, Fetcher};
use crate::error::{Error, Result};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Fetcher reading archives from the local filesystem
pub struct LocalFileFetcher {
    chunk_size: usize,
}

impl LocalFileFetcher {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for LocalFileFetcher {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

#[async_trait]
impl Fetcher for LocalFileFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchResponse> {
        let file = match File::open(source).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Fetch {
                    url: source.to_string(),
                    status: "404 Not Found".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();

        Ok(FetchResponse {
            content_length: Some(size),
            body: Box::new(FileStream {
                file,
                buf: vec![0u8; self.chunk_size],
            }),
        })
    }
}

struct FileStream {
    file: File,
    buf: Vec<u8>,
}

#[async_trait]
impl ByteStream for FileStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let n = self.file.read(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }
}
