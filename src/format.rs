//! Defines the physical binary layout of chunked forward-index files.
//!
//! # Layout
//! The file starts with a fixed-size header followed by the compressed
//! chunks, contiguous and unpadded:
//!
//! File: `[Header] [Chunk 0] [Chunk 1] ... [Chunk N-1]`
//!
//! ## Header Anatomy
//! Seven big-endian `i32` fields followed by the chunk offset table:
//! ```text
//! 0:  version | 4: chunks | 8: docs/chunk | 12: entry size | 16: docs
//! 20: compression id | 24: offset table start (28) | 28: offsets...
//! ```
//! Offsets are 4 bytes wide for format version 2 and 8 bytes otherwise, so a
//! reader derives the width from the version alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compression::ChunkCompressionType;
use crate::error::{ForwardIndexError, Result};

/// Number of `i32` fields preceding the chunk offset table.
pub const HEADER_FIXED_FIELDS: usize = 7;

/// Size of the fixed part of the header, which is also where the offset table starts.
pub const CHUNK_OFFSET_TABLE_START: usize = HEADER_FIXED_FIELDS * 4;

/// Upper bound for a single chunk, in bytes.
pub const MAX_CHUNK_SIZE: u64 = i32::MAX as u64;

/// The raw forward-index format version.
///
/// Determines the chunk offset width and whether variable-width entries are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FormatVersion {
    /// 4-byte chunk offsets.
    V2,
    /// 8-byte chunk offsets.
    V3,
    /// 8-byte chunk offsets, fixed-width entries only.
    V4,
    /// 8-byte chunk offsets, fixed-width entries only.
    V5,
}

impl FormatVersion {
    /// Returns the numeric tag stored in the header.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
            Self::V5 => 5,
        }
    }

    /// Width in bytes of one chunk offset table entry.
    pub fn offset_width(self) -> usize {
        match self {
            Self::V2 => 4,
            Self::V3 | Self::V4 | Self::V5 => 8,
        }
    }

    /// Returns true if entries of the given width kind may use this version.
    pub fn supports(self, fixed_width: bool) -> bool {
        match self {
            Self::V2 | Self::V3 => true,
            Self::V4 | Self::V5 => fixed_width,
        }
    }

    /// Largest chunk offset the offset table can hold.
    pub fn max_chunk_offset(self) -> u64 {
        match self {
            Self::V2 => i32::MAX as u64,
            Self::V3 | Self::V4 | Self::V5 => i64::MAX as u64,
        }
    }
}

impl TryFrom<u32> for FormatVersion {
    type Error = ForwardIndexError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            other => Err(ForwardIndexError::Configuration(format!(
                "Illegal version: {other}, supported raw format versions are 2, 3, 4 and 5"
            ))),
        }
    }
}

impl From<FormatVersion> for u32 {
    fn from(version: FormatVersion) -> Self {
        version.as_u32()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.as_u32())
    }
}

/// Returns `ceil(total_docs / docs_per_chunk)`.
///
/// `docs_per_chunk` must be non-zero; layouts are validated before this is called.
pub fn num_chunks(total_docs: u32, docs_per_chunk: u32) -> u32 {
    total_docs.div_ceil(docs_per_chunk)
}

/// Returns the header size in bytes for a file holding `num_chunks` chunks.
pub fn header_size(num_chunks: u32, version: FormatVersion) -> u64 {
    CHUNK_OFFSET_TABLE_START as u64 + u64::from(num_chunks) * version.offset_width() as u64
}

/// The file header: format metadata plus the chunk offset table.
///
/// The fixed fields are known at construction; offsets are pushed one per
/// flushed chunk and the whole header is serialized once, at close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFileHeader {
    /// Format version, drives the offset width.
    pub version: FormatVersion,
    /// Declared number of chunks, `ceil(total_docs / docs_per_chunk)`.
    pub num_chunks: u32,
    /// Documents per chunk.
    pub docs_per_chunk: u32,
    /// Entry size in bytes; the maximum entry length for variable-width values.
    pub entry_size: u32,
    /// Total documents in the file.
    pub total_docs: u32,
    /// Codec used for every chunk.
    pub compression: ChunkCompressionType,
    chunk_offsets: Vec<u64>,
}

impl ChunkFileHeader {
    /// Creates a header with an empty offset table.
    pub fn new(
        version: FormatVersion,
        total_docs: u32,
        docs_per_chunk: u32,
        entry_size: u32,
        compression: ChunkCompressionType,
    ) -> Self {
        Self {
            version,
            num_chunks: num_chunks(total_docs, docs_per_chunk),
            docs_per_chunk,
            entry_size,
            total_docs,
            compression,
            chunk_offsets: Vec::new(),
        }
    }

    /// Size of the serialized header, offset table included.
    pub fn size(&self) -> u64 {
        header_size(self.num_chunks, self.version)
    }

    /// Offsets recorded so far, in chunk order.
    pub fn chunk_offsets(&self) -> &[u64] {
        &self.chunk_offsets
    }

    /// Returns true once every declared chunk has an offset.
    pub fn is_complete(&self) -> bool {
        self.chunk_offsets.len() == self.num_chunks as usize
    }

    /// Appends the offset of the next chunk.
    ///
    /// # Errors
    /// See [`ChunkFileHeader::check_next_offset`].
    pub fn push_chunk_offset(&mut self, offset: u64) -> Result<()> {
        self.check_next_offset(offset)?;
        self.chunk_offsets.push(offset);
        Ok(())
    }

    /// Checks that `offset` can be recorded as the next chunk offset.
    ///
    /// # Errors
    /// `Usage` when the table already holds `num_chunks` offsets, `Overflow`
    /// when the offset does not fit the version's offset width.
    pub fn check_next_offset(&self, offset: u64) -> Result<()> {
        if self.is_complete() {
            return Err(ForwardIndexError::Usage(format!(
                "Header declares {} chunks, cannot record another chunk at offset {offset}",
                self.num_chunks
            )));
        }
        if offset > self.version.max_chunk_offset() {
            return Err(ForwardIndexError::Overflow {
                data_offset: offset,
                version: self.version,
            });
        }
        Ok(())
    }

    /// Serializes the header to bytes (big-endian).
    ///
    /// Offset slots without a recorded chunk are zero.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let size = usize::try_from(self.size()).map_err(|_| {
            ForwardIndexError::Configuration(format!(
                "Header of {} chunks does not fit in memory",
                self.num_chunks
            ))
        })?;
        let mut buf = Vec::with_capacity(size);
        let fields = [
            self.version.as_u32(),
            self.num_chunks,
            self.docs_per_chunk,
            self.entry_size,
            self.total_docs,
            self.compression.id(),
            CHUNK_OFFSET_TABLE_START as u32,
        ];
        for field in fields {
            buf.extend_from_slice(&field.to_be_bytes());
        }

        for &offset in &self.chunk_offsets {
            match self.version {
                // Range checked when the offset was recorded.
                FormatVersion::V2 => buf.extend_from_slice(&(offset as u32).to_be_bytes()),
                _ => buf.extend_from_slice(&offset.to_be_bytes()),
            }
        }
        buf.resize(size, 0);
        Ok(buf)
    }

    /// Decodes the seven fixed fields, leaving the offset table empty.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Format` if the bytes are truncated or carry
    /// unknown version or compression ids.
    pub fn from_bytes_prefix(bytes: &[u8]) -> Result<Self> {
        let field = |index: usize| -> Result<u32> {
            let start = index * 4;
            bytes
                .get(start..start + 4)
                .and_then(|b| b.try_into().ok())
                .map(u32::from_be_bytes)
                .ok_or_else(|| ForwardIndexError::Format("Buffer too small for header".into()))
        };

        let version = FormatVersion::try_from(field(0)?)
            .map_err(|e| ForwardIndexError::Format(e.to_string()))?;
        let compression = ChunkCompressionType::from_id(field(5)?)
            .map_err(|e| ForwardIndexError::Format(e.to_string()))?;
        let table_start = field(6)? as usize;
        if table_start != CHUNK_OFFSET_TABLE_START {
            return Err(ForwardIndexError::Format(format!(
                "Offset table starts at {table_start}, expected {CHUNK_OFFSET_TABLE_START}"
            )));
        }

        Ok(Self {
            version,
            num_chunks: field(1)?,
            docs_per_chunk: field(2)?,
            entry_size: field(3)?,
            total_docs: field(4)?,
            compression,
            chunk_offsets: Vec::new(),
        })
    }

    /// Decodes a complete header, offset table included.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Format` if the bytes are truncated or carry
    /// unknown version or compression ids.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut header = Self::from_bytes_prefix(bytes)?;
        let width = header.version.offset_width();
        let needed = (header.num_chunks as usize)
            .checked_mul(width)
            .and_then(|table| table.checked_add(CHUNK_OFFSET_TABLE_START));
        if needed.is_none_or(|needed| bytes.len() < needed) {
            return Err(ForwardIndexError::Format(format!(
                "Buffer of {} bytes too small for an offset table of {} chunks",
                bytes.len(),
                header.num_chunks
            )));
        }
        let mut chunk_offsets = Vec::with_capacity(header.num_chunks as usize);
        for i in 0..header.num_chunks as usize {
            let start = CHUNK_OFFSET_TABLE_START + i * width;
            let entry = bytes.get(start..start + width).ok_or_else(|| {
                ForwardIndexError::Format(format!("Offset table truncated at chunk {i}"))
            })?;
            let offset = match header.version {
                FormatVersion::V2 => {
                    u64::from(u32::from_be_bytes(entry.try_into().unwrap_or([0; 4])))
                }
                _ => u64::from_be_bytes(entry.try_into().unwrap_or([0; 8])),
            };
            chunk_offsets.push(offset);
        }
        header.chunk_offsets = chunk_offsets;
        Ok(header)
    }
}
