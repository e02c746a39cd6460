//! Streaming ZIP extraction.
//!
//! This module reads ZIP archives front to back from a byte stream, which is
//! what a dictionary download looks like: an HTTP body arriving chunk by
//! chunk, with no random access and no known end.
//!
//! ## Architecture
//!
//! - [`structures`]: Local file header, extra fields and decoded entries
//! - [`reader`]: Incremental header parsing over a [`ByteStream`](crate::io::ByteStream)
//! - [`inflate`]: Payload decoding for STORED and DEFLATE entries
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Only part 1 is read. The first record that is not a local file header
//! marks the end of the entries; the central directory is never parsed.
//!
//! ## Limitations
//!
//! - No encryption support
//! - No entries whose sizes are deferred to a trailing data descriptor
//! - No BZIP2, LZMA, or other compression methods

pub mod inflate;
mod reader;
mod structures;

pub use reader::ZipStreamReader;
pub use structures::*;
