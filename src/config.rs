//! Forward-index writer settings.
//!
//! Column configs arrive as JSON alongside the rest of a table's index
//! settings. Missing keys fall back to the defaults below.
//!
//! ```json
//! {
//!   "compressionCodec": "LZ4",
//!   "rawIndexWriterVersion": 3,
//!   "targetMaxChunkSizeBytes": 1048576,
//!   "targetDocsPerChunk": 1000
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::compression::ChunkCompressionType;
use crate::error::{ForwardIndexError, Result};
use crate::format::{FormatVersion, MAX_CHUNK_SIZE};
use crate::var_byte::CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE;

/// Default raw format version.
pub const DEFAULT_RAW_WRITER_VERSION: u32 = 2;
/// Default upper bound of a chunk, 1 MiB.
pub const DEFAULT_TARGET_MAX_CHUNK_SIZE_BYTES: u64 = 1024 * 1024;
/// Default number of documents per chunk.
pub const DEFAULT_TARGET_DOCS_PER_CHUNK: u32 = 1000;

/// Settings that decide the format version and chunking of a raw column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForwardIndexConfig {
    /// Codec applied to every chunk.
    pub compression_codec: ChunkCompressionType,
    /// Raw format version (2 to 5; 4 and 5 only for fixed-width columns).
    pub raw_index_writer_version: u32,
    /// Chunks are sized to stay under this many bytes where possible.
    pub target_max_chunk_size_bytes: u64,
    /// Preferred number of documents per chunk.
    pub target_docs_per_chunk: u32,
}

impl Default for ForwardIndexConfig {
    fn default() -> Self {
        Self {
            compression_codec: ChunkCompressionType::default(),
            raw_index_writer_version: DEFAULT_RAW_WRITER_VERSION,
            target_max_chunk_size_bytes: DEFAULT_TARGET_MAX_CHUNK_SIZE_BYTES,
            target_docs_per_chunk: DEFAULT_TARGET_DOCS_PER_CHUNK,
        }
    }
}

impl ForwardIndexConfig {
    /// Parses a config from JSON.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Configuration` for malformed JSON or invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ForwardIndexError::Configuration(format!("Invalid index config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings independently of any column.
    pub fn validate(&self) -> Result<()> {
        FormatVersion::try_from(self.raw_index_writer_version)?;
        if self.target_docs_per_chunk == 0 {
            return Err(ForwardIndexError::Configuration(
                "targetDocsPerChunk must be positive".into(),
            ));
        }
        if self.target_max_chunk_size_bytes == 0
            || self.target_max_chunk_size_bytes > MAX_CHUNK_SIZE
        {
            return Err(ForwardIndexError::Configuration(format!(
                "targetMaxChunkSizeBytes must be in 1..={MAX_CHUNK_SIZE}, got {}",
                self.target_max_chunk_size_bytes
            )));
        }
        if !self.compression_codec.is_available() {
            return Err(ForwardIndexError::Configuration(format!(
                "Compression codec {} is not available in this build",
                self.compression_codec
            )));
        }
        Ok(())
    }

    /// Documents per chunk for a fixed-width column of `entry_size`-byte values.
    pub fn fixed_docs_per_chunk(&self, entry_size: u32) -> u32 {
        self.docs_per_chunk(u64::from(entry_size))
    }

    /// Documents per chunk for a variable-width column whose longest value is `max_length` bytes.
    ///
    /// Each value also costs its row-offset entry.
    pub fn var_byte_docs_per_chunk(&self, max_length: u32) -> u32 {
        self.docs_per_chunk(u64::from(max_length) + CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE as u64)
    }

    fn docs_per_chunk(&self, overhead_per_entry: u64) -> u32 {
        let by_size = self.target_max_chunk_size_bytes / overhead_per_entry.max(1);
        let docs = by_size.min(u64::from(self.target_docs_per_chunk)).max(1);
        u32::try_from(docs).unwrap_or(self.target_docs_per_chunk)
    }
}
