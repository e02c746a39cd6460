use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Local File Header (LFH) - 30 bytes before the variable-length fields
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Records that may follow the last local file header
pub const CD_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";
pub const ZIP64_EOCD_SIGNATURE: &[u8] = b"PK\x06\x06";

/// Optional marker in front of a data descriptor
pub const DATA_DESCRIPTOR_SIGNATURE: &[u8] = b"PK\x07\x08";

/// General purpose flag: entry is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: sizes and CRC follow the data in a descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Extra field id of the ZIP64 extended information block
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Extra fields keyed by their 2-byte header id
pub type ExtraFields = BTreeMap<u16, Vec<u8>>;

/// Parsed Local File Header
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_name: String,
    pub extra_fields: ExtraFields,
}

impl LocalFileHeader {
    /// Parse the fixed part of a header, signature included.
    ///
    /// The name and extra field are filled in later by
    /// [`with_variable_fields`](Self::with_variable_fields) once their
    /// lengths are known.
    pub fn from_fixed_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < LFH_SIZE {
            return Err(Error::Truncated(format!(
                "local file header needs {} bytes, got {}",
                LFH_SIZE,
                data.len()
            )));
        }

        let mut cursor = Cursor::new(&data[4..LFH_SIZE]);

        Ok(Self {
            version: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: CompressionMethod::from_u16(cursor.read_u16::<LittleEndian>()?),
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()? as u64,
            uncompressed_size: cursor.read_u32::<LittleEndian>()? as u64,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
            file_name: String::new(),
            extra_fields: ExtraFields::new(),
        })
    }

    /// Attach the file name and extra field, resolving ZIP64 sizes.
    pub fn with_variable_fields(mut self, name: &[u8], extra: &[u8]) -> Self {
        // Use lossy conversion to handle non-UTF8 filenames gracefully
        self.file_name = String::from_utf8_lossy(name).to_string();
        self.extra_fields = parse_extra_fields(extra);

        // Fields are present only if corresponding header field is 0xFFFFFFFF
        if let Some(zip64) = self.extra_fields.get(&ZIP64_EXTRA_ID) {
            let mut cursor = Cursor::new(zip64.as_slice());
            if self.uncompressed_size == 0xFFFFFFFF {
                if let Ok(v) = cursor.read_u64::<LittleEndian>() {
                    self.uncompressed_size = v;
                }
            }
            if self.compressed_size == 0xFFFFFFFF {
                if let Ok(v) = cursor.read_u64::<LittleEndian>() {
                    self.compressed_size = v;
                }
            }
        }

        self
    }

    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }
}

/// Decode an extra field block into a map of header id to payload.
///
/// A trailing record whose declared length overruns the block keeps
/// whatever bytes remain.
pub fn parse_extra_fields(extra: &[u8]) -> ExtraFields {
    let mut fields = ExtraFields::new();
    let mut i = 0;
    while i + 4 <= extra.len() {
        let id = u16::from_le_bytes([extra[i], extra[i + 1]]);
        let len = u16::from_le_bytes([extra[i + 2], extra[i + 3]]) as usize;
        let start = i + 4;
        let end = (start + len).min(extra.len());
        fields.insert(id, extra[start..end].to_vec());
        i = start + len;
    }
    fields
}

/// A decoded archive entry, owned by whoever pulled it from the reader
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    pub compressed_size: u64,
    pub method: CompressionMethod,
    pub crc32: u32,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Whether `signature` starts one of the records that follow the entries
pub fn ends_entries(signature: &[u8]) -> bool {
    [CD_SIGNATURE, EOCD_SIGNATURE, ZIP64_EOCD_SIGNATURE]
        .iter()
        .any(|s| *s == signature)
}
