//! Streaming ZIP reader.
//!
//! Unlike a random-access reader, this one walks the archive front to back
//! through its local file headers, so it works on a plain byte stream such as
//! an HTTP response body. It stops at the central directory or an end
//! record. Any other signature where a header should start is an error.
//!
//! Only one entry is held in memory at a time: [`ZipStreamReader::next_entry`]
//! pulls from the source until the current entry is complete and never reads
//! ahead into the next one.

use flate2::Crc;

use super::inflate;
use super::structures::*;
use crate::error::{Error, Result};
use crate::io::ByteStream;

/// Incremental reader yielding [`ArchiveEntry`] values in archive order
pub struct ZipStreamReader<S: ByteStream> {
    source: S,
    /// Bytes pulled from the source but not consumed yet
    buffer: Vec<u8>,
    source_done: bool,
    finished: bool,
    entries_read: usize,
}

impl<S: ByteStream> ZipStreamReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            source_done: false,
            finished: false,
            entries_read: 0,
        }
    }

    /// Number of entries yielded so far
    pub fn entries_read(&self) -> usize {
        self.entries_read
    }

    /// Read up to `length` bytes, pulling source chunks only as needed.
    ///
    /// Returns fewer bytes than requested only when the source has ended.
    async fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        while self.buffer.len() < length && !self.source_done {
            match self.source.next_chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.source_done = true,
            }
        }

        let take = length.min(self.buffer.len());
        let rest = self.buffer.split_off(take);
        Ok(std::mem::replace(&mut self.buffer, rest))
    }

    async fn read_exact(&mut self, length: usize, what: &str) -> Result<Vec<u8>> {
        let data = self.read(length).await?;
        if data.len() < length {
            return Err(Error::Truncated(format!(
                "{} needs {} bytes, stream ended after {}",
                what,
                length,
                data.len()
            )));
        }
        Ok(data)
    }

    /// Parse the next local file header, or `None` at the end of entries.
    pub async fn read_header(&mut self) -> Result<Option<LocalFileHeader>> {
        if self.finished {
            return Ok(None);
        }

        let signature = self.read_exact(4, "record signature").await?;
        if signature != LFH_SIGNATURE {
            self.finished = true;
            if ends_entries(&signature) {
                return Ok(None);
            }
            return Err(Error::BadSignature {
                signature,
                entries: self.entries_read,
            });
        }

        let mut fixed = signature;
        fixed.extend(self.read_exact(LFH_SIZE - 4, "local file header").await?);
        let header = LocalFileHeader::from_fixed_bytes(&fixed)?;

        let name = self
            .read_exact(header.file_name_length as usize, "file name")
            .await?;
        let extra = self
            .read_exact(header.extra_field_length as usize, "extra field")
            .await?;
        let header = header.with_variable_fields(&name, &extra);

        log::debug!(
            "local header: {} method={} compressed={} size={}",
            header.file_name,
            header.compression_method.as_u16(),
            header.compressed_size,
            header.uncompressed_size
        );

        Ok(Some(header))
    }

    /// Pull the next decoded entry.
    ///
    /// Returns `Ok(None)` once the central directory or an end record is
    /// reached, and [`Error::BadSignature`] for any other unexpected record.
    /// A source that ends in the middle of an entry, or before any trailing
    /// record, is reported as [`Error::Truncated`].
    pub async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>> {
        let header = match self.read_header().await? {
            Some(header) => header,
            None => return Ok(None),
        };

        // Stop yielding after a failure; the stream position is unknown.
        self.finished = true;

        if header.flags & FLAG_ENCRYPTED != 0 {
            return Err(Error::UnsupportedFeature {
                name: header.file_name,
                feature: "encryption",
            });
        }
        if header.flags & FLAG_DATA_DESCRIPTOR != 0 && header.compressed_size == 0 {
            return Err(Error::UnsupportedFeature {
                name: header.file_name,
                feature: "sizes deferred to a data descriptor",
            });
        }
        if let CompressionMethod::Unknown(method) = header.compression_method {
            return Err(Error::UnsupportedMethod {
                name: header.file_name,
                method,
            });
        }

        let compressed_len = usize::try_from(header.compressed_size).map_err(|_| {
            Error::UnsupportedFeature {
                name: header.file_name.clone(),
                feature: "entry larger than addressable memory",
            }
        })?;
        let raw = self.read_exact(compressed_len, &header.file_name).await?;
        let expected_crc = if header.flags & FLAG_DATA_DESCRIPTOR != 0 {
            self.read_data_descriptor(&header).await?
        } else {
            header.crc32
        };
        let data = inflate::decompress(
            &header.file_name,
            header.compression_method,
            raw,
            header.uncompressed_size,
        )?;

        if data.len() as u64 != header.uncompressed_size {
            return Err(Error::Inflate {
                name: header.file_name,
                reason: format!(
                    "expected {} bytes, decoded {}",
                    header.uncompressed_size,
                    data.len()
                ),
            });
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != expected_crc {
            return Err(Error::ChecksumMismatch {
                name: header.file_name,
                expected: expected_crc,
                actual: crc.sum(),
            });
        }

        self.finished = false;
        self.entries_read += 1;

        Ok(Some(ArchiveEntry {
            name: header.file_name,
            size: header.uncompressed_size,
            compressed_size: header.compressed_size,
            method: header.compression_method,
            crc32: expected_crc,
            data,
        }))
    }

    /// Consume the descriptor after an entry's payload and return its CRC.
    ///
    /// The leading signature is optional. Sizes are 8 bytes each when the
    /// header carried a ZIP64 extra field, 4 bytes otherwise.
    async fn read_data_descriptor(&mut self, header: &LocalFileHeader) -> Result<u32> {
        let mut crc = self.read_exact(4, "data descriptor").await?;
        if crc == DATA_DESCRIPTOR_SIGNATURE {
            crc = self.read_exact(4, "data descriptor").await?;
        }
        let sizes = if header.extra_fields.contains_key(&ZIP64_EXTRA_ID) {
            16
        } else {
            8
        };
        self.read_exact(sizes, "data descriptor").await?;
        Ok(u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]))
    }

    /// Drain the remaining entries into a vector.
    pub async fn collect_entries(mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await? {
            entries.push(entry);
        }
        Ok(entries)
    }
}
