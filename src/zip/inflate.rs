//! Entry payload decoding.
//!
//! Deflated payloads are raw deflate streams (no zlib or gzip wrapper). The
//! caller has already read exactly `compressed_size` bytes, so decoding is a
//! bounded synchronous transform over one slice.

use flate2::{Decompress, FlushDecompress, Status};

use super::structures::CompressionMethod;
use crate::error::{Error, Result};

const OUTPUT_CHUNK: usize = 32 * 1024;

/// Decode one entry payload according to its compression method.
///
/// `size_hint` is the uncompressed size announced by the header. Deflated
/// output may not grow past it.
pub fn decompress(
    name: &str,
    method: CompressionMethod,
    raw: Vec<u8>,
    size_hint: u64,
) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => Ok(raw),
        CompressionMethod::Deflate => inflate(name, &raw, size_hint),
        CompressionMethod::Unknown(method) => Err(Error::UnsupportedMethod {
            name: name.to_string(),
            method,
        }),
    }
}

/// Inflate a complete raw deflate stream.
///
/// Input that ends before the final deflate block, or that contains invalid
/// codes, fails instead of returning a partial result. So does output that
/// grows past `size_hint`. The header is untrusted, so the hint caps the
/// output but never sizes the first allocation on its own.
pub fn inflate(name: &str, compressed: &[u8], size_hint: u64) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(false);
    let capacity = usize::try_from(size_hint)
        .unwrap_or(usize::MAX)
        .min(compressed.len().saturating_mul(4))
        .min(OUTPUT_CHUNK * 32)
        .max(OUTPUT_CHUNK);
    let mut out = Vec::with_capacity(capacity);

    loop {
        if out.len() == out.capacity() {
            out.reserve(OUTPUT_CHUNK);
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let status = inflater
            .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| Error::Inflate {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if out.len() as u64 > size_hint {
            return Err(Error::Inflate {
                name: name.to_string(),
                reason: format!("output exceeds declared size {}", size_hint),
            });
        }

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let stalled =
                    inflater.total_in() as usize == consumed && inflater.total_out() == produced;
                if stalled && out.len() < out.capacity() {
                    return Err(Error::Inflate {
                        name: name.to_string(),
                        reason: "deflate stream ended unexpectedly".to_string(),
                    });
                }
            }
        }
    }
}
