//! Error type shared by every layer of the crate.
//!
//! Errors that cross the worker boundary are flattened to their `Display`
//! text, so the messages here are what a controller ultimately sees.

use thiserror::Error;

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network fetch failures and truncated byte streams.
    Transport,
    /// Archive contents that cannot be decoded.
    Format,
    /// Cache store misuse or an unexpectedly empty cache.
    Cache,
    /// Request/response protocol violations.
    Protocol,
    /// A platform facility the crate needs is missing.
    Capability,
    /// Local filesystem and serialization failures.
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to fetch dictionary: {url} ({status})")]
    Fetch { url: String, status: String },

    #[error("Truncated archive: {0}")]
    Truncated(String),

    #[error("Bad archive signature {signature:02x?} after {entries} entries")]
    BadSignature { signature: Vec<u8>, entries: usize },

    #[error("Unsupported compression method {method} for {name}")]
    UnsupportedMethod { name: String, method: u16 },

    #[error("Unsupported archive feature in {name}: {feature}")]
    UnsupportedFeature { name: String, feature: &'static str },

    #[error("Malformed deflate data in {name}: {reason}")]
    Inflate { name: String, reason: String },

    #[error("Checksum mismatch in {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("No files extracted")]
    NoFilesExtracted,

    #[error("Dictionary not cached: {0}")]
    NotCached(String),

    #[error("dicrc file not found in archive")]
    MissingDicrc,

    #[error("Invalid cache key: {0}")]
    InvalidCacheKey(String),

    #[error("{0}")]
    Capability(String),

    #[error("Failed initializing MeCab. Are the dictionaries mounted?")]
    TaggerInit,

    /// Failure reported by the worker side, already flattened to text.
    #[error("{0}")]
    Remote(String),

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("RPC channel closed")]
    ChannelClosed,

    #[error("Tagger is not initialized")]
    NotReady,

    #[error("Tagger is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch { .. } | Error::Truncated(_) | Error::Http(_) => ErrorKind::Transport,
            Error::BadSignature { .. }
            | Error::UnsupportedMethod { .. }
            | Error::UnsupportedFeature { .. }
            | Error::Inflate { .. }
            | Error::ChecksumMismatch { .. }
            | Error::NoFilesExtracted
            | Error::MissingDicrc => ErrorKind::Format,
            Error::NotCached(_) | Error::InvalidCacheKey(_) => ErrorKind::Cache,
            Error::Remote(_)
            | Error::UnexpectedMessage(_)
            | Error::ChannelClosed
            | Error::NotReady
            | Error::AlreadyInitialized => ErrorKind::Protocol,
            Error::Capability(_) | Error::TaggerInit => ErrorKind::Capability,
            Error::Io(_) | Error::Json(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
