//! Centralized error handling for the forward-index writer.
//!
//! Every failure surfaces as a [`ForwardIndexError`] through the crate-wide
//! [`Result`] alias. Nothing is retried or swallowed internally: a failed
//! operation aborts and the caller decides whether to delete the partially
//! written file.
//!
//! ## Error Categories
//!
//! - **Configuration** ([`ForwardIndexError::Configuration`]): illegal version and
//!   entry-width combinations, chunk sizes over the 2 GiB limit, disabled codecs.
//! - **Overflow** ([`ForwardIndexError::Overflow`]): a chunk offset does not fit
//!   the 4-byte offset table of format version 2.
//! - **Compression** ([`ForwardIndexError::Compression`]): a codec rejected a chunk.
//! - **I/O** ([`ForwardIndexError::Io`]): the storage medium failed.
//! - **Usage** ([`ForwardIndexError::Usage`]): the writer was driven out of order
//!   (operation after close, empty flush, oversized value, too many chunks).
//! - **Format** ([`ForwardIndexError::Format`]): header bytes that do not decode.
//!
//! ## Usage
//!
//! ```rust
//! use chunkfwd::{ChunkLayout, ChunkWriter, ChunkCompressionType, ForwardIndexError};
//! use std::io::Cursor;
//!
//! let layout = ChunkLayout {
//!     total_docs: 10,
//!     docs_per_chunk: 5,
//!     chunk_size: 40,
//!     entry_size: 8,
//!     version: 6,
//!     fixed_width: true,
//! };
//!
//! match ChunkWriter::new(Cursor::new(Vec::new()), ChunkCompressionType::PassThrough, layout) {
//!     Err(ForwardIndexError::Configuration(msg)) => println!("rejected: {msg}"),
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::format::FormatVersion;

/// A specialized `Result` type for forward-index operations.
pub type Result<T> = std::result::Result<T, ForwardIndexError>;

/// The master error enum covering all failure domains of the writer.
///
/// The type is `Clone`; I/O errors are wrapped in an `Arc` for that purpose.
#[derive(Debug, Clone)]
pub enum ForwardIndexError {
    /// Low-level I/O failure while opening, writing or closing the data file.
    Io(Arc<io::Error>),

    /// The writer was constructed with parameters the format cannot express.
    ///
    /// Raised at construction time only and never retryable.
    Configuration(String),

    /// A chunk offset exceeds what the offset table of `version` can hold.
    ///
    /// Only format version 2 (4-byte offsets) can hit this.
    Overflow {
        /// The write offset that could not be recorded.
        data_offset: u64,
        /// The format version whose offset width was too small.
        version: FormatVersion,
    },

    /// The compressor failed on a chunk's bytes.
    Compression(String),

    /// The writer was used out of its construct → fill/flush → close order.
    Usage(String),

    /// Header bytes that do not decode into a valid chunk file header.
    Format(String),
}

impl fmt::Display for ForwardIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Configuration(s) => write!(f, "Configuration Error: {s}"),
            Self::Overflow {
                data_offset,
                version,
            } => write!(
                f,
                "Overflow Error: chunk offset {data_offset} does not fit the {}-byte offsets of \
                 format version {}. Use raw format version 3 or 4, or reduce the target docs \
                 per chunk or the target max chunk size",
                version.offset_width(),
                version.as_u32()
            ),
            Self::Compression(s) => write!(f, "Compression Error: {s}"),
            Self::Usage(s) => write!(f, "Usage Error: {s}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
        }
    }
}

impl std::error::Error for ForwardIndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ForwardIndexError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
