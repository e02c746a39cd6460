use async_trait::async_trait;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ByteStream, FetchResponse, Fetcher};
use crate::error::{Error, Result};

/// HTTP fetcher streaming dictionary archives with plain GET requests
pub struct HttpFetcher {
    client: Client,
    transferred_bytes: Arc<AtomicU64>,
}

impl HttpFetcher {
    /// Create a fetcher with the default 30 second timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// `timeout` bounds connecting and each wait for body data. The transfer
    /// as a whole has no deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            transferred_bytes: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get total body bytes received from the network so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchResponse> {
        let resp = self.client.get(source).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Fetch {
                url: source.to_string(),
                status: resp.status().to_string(),
            });
        }

        let content_length = resp.content_length();
        log::debug!("GET {} -> {:?} bytes", source, content_length);

        Ok(FetchResponse {
            content_length,
            body: Box::new(HttpBodyStream {
                response: resp,
                transferred_bytes: self.transferred_bytes.clone(),
            }),
        })
    }
}

struct HttpBodyStream {
    response: Response,
    transferred_bytes: Arc<AtomicU64>,
}

#[async_trait]
impl ByteStream for HttpBodyStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.response.chunk().await? {
                Some(bytes) if bytes.is_empty() => continue,
                Some(bytes) => {
                    self.transferred_bytes
                        .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                    return Ok(Some(bytes.to_vec()));
                }
                None => return Ok(None),
            }
        }
    }
}
