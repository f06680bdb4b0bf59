//! Pluggable chunk compression.
//!
//! Every chunk of a forward-index file is compressed with the single codec
//! named in the header. This module defines the [`ChunkCompressor`] trait the
//! writer drives, the [`ChunkCompressionType`] ids stored on disk, and the
//! codecs themselves:
//!
//! | id | type                  | codec                                       |
//! |----|-----------------------|---------------------------------------------|
//! | 0  | `PASS_THROUGH`        | none                                        |
//! | 1  | `SNAPPY`              | raw Snappy block (`snap`)                   |
//! | 2  | `ZSTANDARD`           | Zstandard frame (`zstd`)                    |
//! | 3  | `LZ4`                 | LZ4 block (`lz4_flex`)                      |
//! | 4  | `LZ4_LENGTH_PREFIXED` | `[u32 LE raw length]` + LZ4 block           |
//! | 5  | `GZIP`                | zlib stream + `[u64 BE raw length]` (`flate2`) |
//!
//! All codecs except pass-through sit behind the cargo feature named after
//! their crate. Asking [`compressor_for`] for a disabled codec is a
//! configuration error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ForwardIndexError, Result};

/// Compression algorithm of a forward-index file, stored as an `i32` id in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkCompressionType {
    /// Chunks are stored as-is.
    #[default]
    PassThrough,
    /// Raw Snappy blocks.
    Snappy,
    /// Zstandard frames.
    Zstandard,
    /// Raw LZ4 blocks.
    Lz4,
    /// LZ4 blocks prefixed with their decompressed length.
    Lz4LengthPrefixed,
    /// zlib-deflated chunks followed by their decompressed length.
    Gzip,
}

impl ChunkCompressionType {
    /// All known compression types, in id order.
    pub const ALL: [Self; 6] = [
        Self::PassThrough,
        Self::Snappy,
        Self::Zstandard,
        Self::Lz4,
        Self::Lz4LengthPrefixed,
        Self::Gzip,
    ];

    /// Returns the id stored in the header.
    pub fn id(self) -> u32 {
        match self {
            Self::PassThrough => 0,
            Self::Snappy => 1,
            Self::Zstandard => 2,
            Self::Lz4 => 3,
            Self::Lz4LengthPrefixed => 4,
            Self::Gzip => 5,
        }
    }

    /// Maps a header id back to its compression type.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Configuration` for unknown ids.
    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == id)
            .ok_or_else(|| {
                ForwardIndexError::Configuration(format!("Unknown compression type id: {id}"))
            })
    }

    /// Returns true if this build can compress with this type.
    pub fn is_available(self) -> bool {
        match self {
            Self::PassThrough => true,
            Self::Snappy => cfg!(feature = "snap"),
            Self::Zstandard => cfg!(feature = "zstd"),
            Self::Lz4 | Self::Lz4LengthPrefixed => cfg!(feature = "lz4_flex"),
            Self::Gzip => cfg!(feature = "flate2"),
        }
    }
}

impl fmt::Display for ChunkCompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PassThrough => "PASS_THROUGH",
            Self::Snappy => "SNAPPY",
            Self::Zstandard => "ZSTANDARD",
            Self::Lz4 => "LZ4",
            Self::Lz4LengthPrefixed => "LZ4_LENGTH_PREFIXED",
            Self::Gzip => "GZIP",
        };
        f.write_str(name)
    }
}

/// Interface for chunk compression algorithms.
///
/// A compressor is owned by exactly one writer and reused for every chunk,
/// so implementations may keep codec state between calls.
pub trait ChunkCompressor: Send + fmt::Debug {
    /// The type recorded in the file header.
    fn compression_type(&self) -> ChunkCompressionType;

    /// Compresses `data`, replacing the contents of `output`.
    ///
    /// Returns the number of compressed bytes, which equals `output.len()`.
    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize>;

    /// Decompresses one chunk whose raw size is at most `max_raw_size`.
    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>>;

    /// Upper bound of the compressed size of `raw_size` input bytes.
    fn max_compressed_size(&self, raw_size: usize) -> usize;

    /// Releases codec state. The compressor is not used afterwards.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates the compressor for `kind`.
///
/// # Errors
/// Returns `ForwardIndexError::Configuration` if the codec's feature is disabled.
pub fn compressor_for(kind: ChunkCompressionType) -> Result<Box<dyn ChunkCompressor>> {
    match kind {
        ChunkCompressionType::PassThrough => Ok(Box::new(PassThroughCompressor)),
        #[cfg(feature = "snap")]
        ChunkCompressionType::Snappy => Ok(Box::new(SnappyCompressor::new())),
        #[cfg(feature = "zstd")]
        ChunkCompressionType::Zstandard => Ok(Box::new(ZstdCompressor::new()?)),
        #[cfg(feature = "lz4_flex")]
        ChunkCompressionType::Lz4 => Ok(Box::new(Lz4Compressor)),
        #[cfg(feature = "lz4_flex")]
        ChunkCompressionType::Lz4LengthPrefixed => Ok(Box::new(Lz4LengthPrefixedCompressor)),
        #[cfg(feature = "flate2")]
        ChunkCompressionType::Gzip => Ok(Box::new(GzipCompressor::new())),
        #[allow(unreachable_patterns)]
        other => Err(ForwardIndexError::Configuration(format!(
            "Compression type {other} is not available in this build"
        ))),
    }
}

fn raw_size_check(actual: usize, max_raw_size: usize, kind: ChunkCompressionType) -> Result<()> {
    if actual > max_raw_size {
        return Err(ForwardIndexError::Compression(format!(
            "{kind} chunk decompresses to {actual} bytes, more than the {max_raw_size} allowed"
        )));
    }
    Ok(())
}

// --- Pass-through ---

/// A compressor that stores chunks unchanged (id 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCompressor;

impl ChunkCompressor for PassThroughCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::PassThrough
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        output.clear();
        output.extend_from_slice(data);
        Ok(output.len())
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        raw_size_check(data.len(), max_raw_size, self.compression_type())?;
        Ok(data.to_vec())
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        raw_size
    }
}

// --- Snappy ---

/// Raw Snappy block compression (id 1).
#[cfg(feature = "snap")]
pub struct SnappyCompressor {
    encoder: snap::raw::Encoder,
}

#[cfg(feature = "snap")]
impl SnappyCompressor {
    /// Creates a Snappy compressor with a fresh encoder.
    pub fn new() -> Self {
        Self {
            encoder: snap::raw::Encoder::new(),
        }
    }
}

#[cfg(feature = "snap")]
impl Default for SnappyCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "snap")]
impl fmt::Debug for SnappyCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnappyCompressor").finish_non_exhaustive()
    }
}

#[cfg(feature = "snap")]
impl ChunkCompressor for SnappyCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Snappy
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        output.clear();
        output.resize(self.max_compressed_size(data.len()), 0);
        match self.encoder.compress(data, output) {
            Ok(written) => {
                output.truncate(written);
                Ok(written)
            }
            Err(e) => {
                output.clear();
                Err(ForwardIndexError::Compression(e.to_string()))
            }
        }
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        let raw_len = snap::raw::decompress_len(data)
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))?;
        raw_size_check(raw_len, max_raw_size, self.compression_type())?;
        snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        snap::raw::max_compress_len(raw_size)
    }
}

// --- Zstandard ---

/// Zstandard compression at the default level (id 2).
///
/// Holds a compression context that is reused across chunks and released by `close`.
#[cfg(feature = "zstd")]
pub struct ZstdCompressor {
    context: Option<zstd::bulk::Compressor<'static>>,
}

#[cfg(feature = "zstd")]
impl ZstdCompressor {
    /// Creates a compressor at `zstd::DEFAULT_COMPRESSION_LEVEL`.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Compression` if the native context cannot be created.
    pub fn new() -> Result<Self> {
        let context = zstd::bulk::Compressor::new(zstd::DEFAULT_COMPRESSION_LEVEL)
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))?;
        Ok(Self {
            context: Some(context),
        })
    }
}

#[cfg(feature = "zstd")]
impl fmt::Debug for ZstdCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdCompressor")
            .field("open", &self.context.is_some())
            .finish()
    }
}

#[cfg(feature = "zstd")]
impl ChunkCompressor for ZstdCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Zstandard
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        let bound = self.max_compressed_size(data.len());
        let context = self.context.as_mut().ok_or_else(|| {
            ForwardIndexError::Compression("Zstandard context already released".into())
        })?;
        output.clear();
        output.resize(bound, 0);
        match context.compress_to_buffer(data, &mut output[..]) {
            Ok(written) => {
                output.truncate(written);
                Ok(written)
            }
            Err(e) => {
                output.clear();
                Err(ForwardIndexError::Compression(e.to_string()))
            }
        }
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        zstd::bulk::decompress(data, max_raw_size)
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        zstd::zstd_safe::compress_bound(raw_size)
    }

    fn close(&mut self) -> Result<()> {
        self.context = None;
        Ok(())
    }
}

// --- LZ4 ---

/// Raw LZ4 block compression (id 3).
///
/// The block carries no length; readers size the output from the chunk capacity.
#[cfg(feature = "lz4_flex")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Compressor;

#[cfg(feature = "lz4_flex")]
fn lz4_compress_block(data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
    let start = output.len();
    output.resize(start + lz4_flex::block::get_maximum_output_size(data.len()), 0);
    match lz4_flex::block::compress_into(data, &mut output[start..]) {
        Ok(written) => {
            output.truncate(start + written);
            Ok(written)
        }
        Err(e) => {
            output.truncate(start);
            Err(ForwardIndexError::Compression(e.to_string()))
        }
    }
}

#[cfg(feature = "lz4_flex")]
fn lz4_decompress_block(data: &[u8], raw_size: usize) -> Result<Vec<u8>> {
    let mut output = vec![0u8; raw_size];
    let written = lz4_flex::block::decompress_into(data, &mut output)
        .map_err(|e| ForwardIndexError::Compression(e.to_string()))?;
    output.truncate(written);
    Ok(output)
}

#[cfg(feature = "lz4_flex")]
impl ChunkCompressor for Lz4Compressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Lz4
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        output.clear();
        lz4_compress_block(data, output)
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        lz4_decompress_block(data, max_raw_size)
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(raw_size)
    }
}

/// LZ4 block compression with a 4-byte little-endian raw length prefix (id 4).
///
/// The prefix follows lz4-java's `LZ4CompressorWithLength` framing, the one
/// place in the file that is not big-endian.
#[cfg(feature = "lz4_flex")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4LengthPrefixedCompressor;

#[cfg(feature = "lz4_flex")]
impl ChunkCompressor for Lz4LengthPrefixedCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Lz4LengthPrefixed
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        let raw_len = u32::try_from(data.len()).map_err(|_| {
            ForwardIndexError::Compression(format!(
                "Chunk of {} bytes is too large for a length prefix",
                data.len()
            ))
        })?;
        output.clear();
        output.extend_from_slice(&raw_len.to_le_bytes());
        lz4_compress_block(data, output)?;
        Ok(output.len())
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        let (prefix, block) = data.split_at_checked(4).ok_or_else(|| {
            ForwardIndexError::Compression("LZ4 chunk too small for its length prefix".into())
        })?;
        let raw_len = u32::from_le_bytes(prefix.try_into().unwrap_or([0; 4])) as usize;
        raw_size_check(raw_len, max_raw_size, self.compression_type())?;
        lz4_decompress_block(block, raw_len)
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        lz4_flex::block::get_maximum_output_size(raw_size) + 4
    }
}

// --- Gzip ---

/// zlib-deflate compression followed by the 8-byte big-endian raw length (id 5).
#[cfg(feature = "flate2")]
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: flate2::Compression,
}

#[cfg(feature = "flate2")]
impl GzipCompressor {
    /// Creates a compressor at the default deflate level.
    pub fn new() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

#[cfg(feature = "flate2")]
impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "flate2")]
impl ChunkCompressor for GzipCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Gzip
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        use std::io::Write;

        output.clear();
        let mut encoder = flate2::write::ZlibEncoder::new(std::mem::take(output), self.level);
        let deflated = encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))?;
        *output = deflated;
        output.extend_from_slice(&(data.len() as u64).to_be_bytes());
        Ok(output.len())
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        use std::io::Read;

        let split = data.len().checked_sub(8).ok_or_else(|| {
            ForwardIndexError::Compression("Gzip chunk too small for its length suffix".into())
        })?;
        let (stream, suffix) = data.split_at(split);
        let raw_len = u64::from_be_bytes(suffix.try_into().unwrap_or([0; 8]));
        let raw_len = usize::try_from(raw_len).unwrap_or(usize::MAX);
        raw_size_check(raw_len, max_raw_size, self.compression_type())?;

        let mut output = Vec::with_capacity(raw_len);
        flate2::read::ZlibDecoder::new(stream)
            .read_to_end(&mut output)
            .map_err(|e| ForwardIndexError::Compression(e.to_string()))?;
        if output.len() != raw_len {
            return Err(ForwardIndexError::Compression(format!(
                "Gzip chunk inflated to {} bytes, header says {raw_len}",
                output.len()
            )));
        }
        Ok(output)
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        raw_size + (raw_size >> 12) + (raw_size >> 14) + (raw_size >> 25) + 13 + 8
    }
}
