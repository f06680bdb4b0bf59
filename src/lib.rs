//! # chunkfwd
//!
//! A chunk-based, compressed forward-index writer for column-oriented storage
//! engines. It persists one raw (non-dictionary-encoded) value per document
//! into a compact file that a reader can seek into chunk by chunk.
//!
//! ## Overview
//!
//! Documents are grouped into chunks of `docs_per_chunk` consecutive values.
//! Each chunk is compressed as a unit and appended to the file; a header at
//! the start of the file records where every chunk begins, so reading
//! document `d` only needs the header and chunk `d / docs_per_chunk`.
//!
//! ### Key Features
//!
//! *   **Versioned format:** Format versions 2 to 5 with 4- or 8-byte chunk
//!     offsets; version 2 refuses to truncate offsets past 2 GiB.
//! *   **Pluggable compression:** Pass-through, Snappy, Zstandard, LZ4,
//!     length-prefixed LZ4 and Gzip, each behind a cargo feature.
//! *   **Bounded memory:** One chunk buffer and one compression staging
//!     buffer, allocated once and reused for the whole file.
//! *   **Fixed and variable width encoders** composed on top of the core.
//!
//! ## Architecture
//!
//! ### File Format
//!
//! ```text
//! [Header: 7 x i32 + chunk offset table] [Chunk 0] [Chunk 1] ... [Chunk N-1]
//! ```
//!
//! All integers are big-endian. See [`format`] for the exact layout.
//!
//! ### Writer Lifecycle
//!
//! The [`ChunkWriter`] is single-use: construct, fill and flush chunks, close.
//! The header size is fixed at construction because the chunk count is
//! derived from the declared document count; chunk data starts right after
//! it, and the header itself is written last, once every chunk offset is known.
//!
//! ## Usage
//!
//! ```rust
//! use chunkfwd::{ChunkCompressionType, FixedByteChunkWriter};
//! use std::io::Cursor;
//!
//! let mut writer = FixedByteChunkWriter::new(
//!     Cursor::new(Vec::new()),
//!     ChunkCompressionType::PassThrough,
//!     5,  // total docs
//!     2,  // docs per chunk
//!     8,  // bytes per entry
//!     3,  // format version
//! )?;
//! for value in [10_i64, 20, 30, 40, 50] {
//!     writer.put_i64(value)?;
//! }
//! let bytes = writer.finish()?.into_inner();
//!
//! // 28-byte prefix + 3 chunks x 8-byte offsets, then 16 + 16 + 8 bytes of data.
//! assert_eq!(bytes.len(), 52 + 40);
//! # Ok::<(), chunkfwd::ForwardIndexError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **No Unsafe:** The crate denies `unsafe` code.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`ForwardIndexError`] variant.
//! * **Deterministic Release:** The file and the compressor are released on every
//!   close path, including failed ones.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod chunk;
pub mod compression;
pub mod config;
pub mod error;
pub mod fixed;
pub mod format;
pub mod inspector;
pub mod var_byte;
pub mod writer;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod io;

// --- RE-EXPORTS ---

pub use api::ForwardIndex;
pub use chunk::ChunkBuffer;
#[cfg(feature = "flate2")]
pub use compression::GzipCompressor;
#[cfg(feature = "snap")]
pub use compression::SnappyCompressor;
#[cfg(feature = "zstd")]
pub use compression::ZstdCompressor;
pub use compression::{ChunkCompressionType, ChunkCompressor, PassThroughCompressor, compressor_for};
#[cfg(feature = "lz4_flex")]
pub use compression::{Lz4Compressor, Lz4LengthPrefixedCompressor};
pub use config::ForwardIndexConfig;
pub use error::{ForwardIndexError, Result};
pub use fixed::FixedByteChunkWriter;
pub use format::{ChunkFileHeader, FormatVersion};
pub use inspector::{ChunkInfo, ForwardIndexInspector, HeaderReport};
pub use var_byte::VarByteChunkWriter;
pub use writer::{ChunkLayout, ChunkWriter};
