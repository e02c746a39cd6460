//! # mecab-worker
//!
//! Acquire MeCab dictionaries and drive a tagger through a message channel.
//!
//! Dictionaries ship as ZIP archives. The archive is read front to back as
//! it streams in, without ever seeking to the central directory, so files
//! are available as soon as their bytes arrive. Extracted files are kept in a
//! named cache bucket and later runs replay them from there without touching
//! the network.
//!
//! The tagger lives behind an RPC channel: [`TaggerHost`] owns the tagger
//! and serves calls, [`MecabWorker`] is the caller's handle.
//!
//! ## Features
//!
//! - Streaming ZIP reader for STORED and DEFLATE entries, with ZIP64 sizes
//! - Cache-first dictionary acquisition with per-file progress events
//! - Correlation-id RPC with out-of-order replies and sentinel notifications
//! - Built-in IPAdic, JUMAN and UniDic presets
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mecab_worker::{DictionaryAcquirer, DiskCache, HttpFetcher, SourceFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = Arc::new(SourceFetcher::new(HttpFetcher::new()?));
//!     let cache = Arc::new(DiskCache::new(".mecab-cache").await?);
//!     let acquirer = DictionaryAcquirer::new(fetcher, cache);
//!
//!     let url = "https://example.com/ipadic-2.7.0_bin.zip";
//!     let files = acquirer
//!         .acquire("ipadic-2.7.0_bin", url, false, |event| {
//!             println!("{:?} {}", event.origin, event.name);
//!         })
//!         .await?;
//!     println!("{} files", files.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod dictionary;
pub mod error;
pub mod io;
pub mod rpc;
pub mod tagger;
pub mod zip;

pub use cache::{CacheBucket, CacheStore, DiskCache, MemoryCache};
pub use cli::Cli;
pub use dictionary::{Dictionary, DictionaryAcquirer, DictionaryFiles, Origin, ProgressEvent};
pub use error::{Error, ErrorKind, Result};
pub use io::{ByteStream, Fetcher, HttpFetcher, LocalFileFetcher, SourceFetcher};
pub use rpc::{ChannelOptions, RpcChannel};
pub use tagger::{HostConfig, MecabWorker, ParsedNode, TaggerEngine, TaggerHost, WorkerOptions};
pub use zip::{ArchiveEntry, ZipStreamReader};
