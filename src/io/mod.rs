mod http;
mod local;

pub use http::HttpFetcher;
pub use local::LocalFileFetcher;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for pulling an ordered byte stream one chunk at a time
#[async_trait]
pub trait ByteStream: Send {
    /// Pull the next chunk, or `None` once the stream has ended.
    ///
    /// Implementations never return an empty chunk before the end.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
impl<S: ByteStream + ?Sized> ByteStream for Box<S> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_chunk().await
    }
}

/// A successfully opened archive source
pub struct FetchResponse {
    /// Total body size, when the source reports one
    pub content_length: Option<u64>,
    pub body: Box<dyn ByteStream>,
}

/// Trait for opening an archive source by URL or path
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open `source` for streaming.
    ///
    /// A source that exists but cannot be served (non-success HTTP status,
    /// missing file) fails with [`Error::Fetch`](crate::Error::Fetch).
    async fn fetch(&self, source: &str) -> Result<FetchResponse>;
}

pub fn is_http_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetcher that routes `http(s)://` URLs to [`HttpFetcher`] and everything
/// else to [`LocalFileFetcher`]
pub struct SourceFetcher {
    http: HttpFetcher,
    local: LocalFileFetcher,
}

impl SourceFetcher {
    pub fn new(http: HttpFetcher) -> Self {
        Self {
            http,
            local: LocalFileFetcher::default(),
        }
    }

    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchResponse> {
        if is_http_url(source) {
            self.http.fetch(source).await
        } else {
            self.local.fetch(source).await
        }
    }
}

/// In-memory byte stream handing out fixed-size chunks
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl ByteStream for MemoryStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}
