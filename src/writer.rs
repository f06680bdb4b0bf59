//! The chunked forward-index writer core.
//!
//! [`ChunkWriter`] owns the data file, the compressor and two scratch
//! buffers. Encoders append entry bytes to its chunk buffer; on every chunk
//! boundary the writer compresses the pending bytes, writes them at the
//! running data offset and records that offset in the header. On close the
//! last partial chunk is flushed and the header is written at offset 0.
//!
//! ```text
//! construct ──► append/flush_chunk (0..n) ──► close
//! ```
//!
//! A writer has exactly one owner; all mutating operations take `&mut self`.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use tracing::{debug, error, trace, warn};

use crate::chunk::ChunkBuffer;
use crate::compression::{ChunkCompressionType, ChunkCompressor, compressor_for};
use crate::error::{ForwardIndexError, Result};
use crate::format::{ChunkFileHeader, FormatVersion, MAX_CHUNK_SIZE};
use crate::io::PositionalWriter;

/// Sizing and format parameters of a forward-index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Total number of documents the file will hold.
    pub total_docs: u32,
    /// Documents per chunk.
    pub docs_per_chunk: u32,
    /// Capacity of the chunk buffer in bytes.
    pub chunk_size: u64,
    /// Entry size in bytes; the maximum entry length for variable-width values.
    pub entry_size: u32,
    /// Raw format version tag (2 to 5).
    pub version: u32,
    /// Whether every entry has the same size.
    pub fixed_width: bool,
}

impl ChunkLayout {
    /// Checks the layout and returns its format version.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Configuration` for unknown versions,
    /// versions 4/5 with variable-width entries, chunks over 2 GiB, zero docs
    /// per chunk, empty chunks or fixed-width entries, or counts that do not
    /// fit an `i32` header field.
    pub fn validate(&self) -> Result<FormatVersion> {
        let version = FormatVersion::try_from(self.version)?;
        if !version.supports(self.fixed_width) {
            return Err(ForwardIndexError::Configuration(format!(
                "Illegal version: {} for {} bytes values",
                self.version,
                if self.fixed_width { "fixed" } else { "variable" }
            )));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ForwardIndexError::Configuration(format!(
                "Chunk size limited to 2GB, got {} bytes",
                self.chunk_size
            )));
        }
        if self.docs_per_chunk == 0 {
            return Err(ForwardIndexError::Configuration(
                "Number of docs per chunk must be positive".into(),
            ));
        }
        if self.fixed_width && self.entry_size == 0 {
            return Err(ForwardIndexError::Configuration(
                "Fixed-width entries must be at least one byte".into(),
            ));
        }
        if self.chunk_size == 0 && self.total_docs > 0 {
            return Err(ForwardIndexError::Configuration(format!(
                "Chunk size must be positive to hold {} docs",
                self.total_docs
            )));
        }
        for (name, value) in [
            ("total docs", self.total_docs),
            ("docs per chunk", self.docs_per_chunk),
            ("entry size", self.entry_size),
        ] {
            if value > i32::MAX as u32 {
                return Err(ForwardIndexError::Configuration(format!(
                    "{name} {value} does not fit a header field"
                )));
            }
        }
        Ok(version)
    }
}

/// Writes chunk-compressed raw values into a seekable sink.
///
/// Dropping a writer without calling [`ChunkWriter::close`] releases its
/// resources but leaves the header unwritten; the caller should delete the
/// partial file.
pub struct ChunkWriter<W = File> {
    sink: Option<PositionalWriter<W>>,
    compressor: Option<Box<dyn ChunkCompressor>>,
    compression: ChunkCompressionType,
    header: ChunkFileHeader,
    chunk_buffer: ChunkBuffer,
    compressed: Vec<u8>,
    data_offset: u64,
    closed: bool,
}

impl ChunkWriter<File> {
    /// Creates (or truncates) the file at `path` and prepares a writer for it.
    ///
    /// The layout is validated before the file is touched.
    pub fn create<P: AsRef<Path>>(
        path: P,
        compression: ChunkCompressionType,
        layout: ChunkLayout,
    ) -> Result<Self> {
        layout.validate()?;
        let mut compressor = compressor_for(compression)?;
        let sink = match PositionalWriter::create(path.as_ref()) {
            Ok(sink) => sink,
            Err(e) => {
                let _released = compressor.close().inspect_err(|release| {
                    warn!(error = %release, "Failed to release chunk compressor");
                });
                return Err(e);
            }
        };
        Self::build(sink, compressor, layout)
    }
}

impl<W: Write + Seek> ChunkWriter<W> {
    /// Prepares a writer over an arbitrary seekable sink.
    pub fn new(sink: W, compression: ChunkCompressionType, layout: ChunkLayout) -> Result<Self> {
        layout.validate()?;
        let compressor = compressor_for(compression)?;
        Self::build(PositionalWriter::new(sink), compressor, layout)
    }

    /// Prepares a writer driving a caller-supplied compressor.
    ///
    /// The header records `compressor.compression_type()`.
    pub fn with_compressor(
        sink: W,
        compressor: Box<dyn ChunkCompressor>,
        layout: ChunkLayout,
    ) -> Result<Self> {
        Self::build(PositionalWriter::new(sink), compressor, layout)
    }

    fn build(
        sink: PositionalWriter<W>,
        compressor: Box<dyn ChunkCompressor>,
        layout: ChunkLayout,
    ) -> Result<Self> {
        let version = layout.validate()?;
        let compression = compressor.compression_type();
        let header = ChunkFileHeader::new(
            version,
            layout.total_docs,
            layout.docs_per_chunk,
            layout.entry_size,
            compression,
        );

        // Bounded by MAX_CHUNK_SIZE above.
        let chunk_size = layout.chunk_size as usize;
        let max_compressed = compressor.max_compressed_size(chunk_size);
        let data_offset = header.size();

        debug!(
            %version,
            %compression,
            num_chunks = header.num_chunks,
            docs_per_chunk = layout.docs_per_chunk,
            chunk_size,
            header_size = data_offset,
            "Created chunk forward index writer"
        );

        Ok(Self {
            sink: Some(sink),
            compressor: Some(compressor),
            compression,
            header,
            chunk_buffer: ChunkBuffer::with_capacity(chunk_size),
            compressed: Vec::with_capacity(max_compressed),
            data_offset,
            closed: false,
        })
    }

    /// Appends encoded entry bytes to the current chunk.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.chunk_buffer.append(bytes)
    }

    /// Mutable access to the current chunk, for encoders that patch bytes in place.
    pub fn chunk_buffer_mut(&mut self) -> Result<&mut ChunkBuffer> {
        self.ensure_open()?;
        Ok(&mut self.chunk_buffer)
    }

    /// Compresses and writes the pending chunk.
    ///
    /// # Errors
    /// - `Usage` if the writer is closed, nothing is pending, or every declared
    ///   chunk has already been written.
    /// - `Overflow` if the chunk offset does not fit the format's offset width.
    /// - `Compression` / `Io` if the codec or the sink fails.
    ///
    /// On error the chunk is not recorded in the offset table and stays pending.
    pub fn flush_chunk(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.chunk_buffer.is_empty() {
            return Err(ForwardIndexError::Usage(
                "Refusing to flush an empty chunk".into(),
            ));
        }
        self.write_chunk()
    }

    fn write_chunk(&mut self) -> Result<()> {
        let offset = self.data_offset;
        self.header.check_next_offset(offset)?;

        let chunk = self.header.chunk_offsets().len();

        let compressor = self.compressor.as_mut().ok_or_else(|| {
            ForwardIndexError::Usage("Compressor has already been released".into())
        })?;
        let size = compressor
            .compress_into(self.chunk_buffer.as_slice(), &mut self.compressed)
            .inspect_err(|e| {
                error!(chunk, error = %e, "Exception caught while compressing data chunk");
            })?;

        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| ForwardIndexError::Usage("Data file has already been closed".into()))?;
        sink.write_all_at(offset, &self.compressed).inspect_err(|e| {
            error!(chunk, offset, error = %e, "Exception caught while writing data chunk");
        })?;

        self.header.push_chunk_offset(offset)?;
        self.data_offset = offset.checked_add(size as u64).ok_or(ForwardIndexError::Overflow {
            data_offset: offset,
            version: self.header.version,
        })?;

        trace!(
            chunk,
            offset,
            raw_size = self.chunk_buffer.position(),
            compressed_size = size,
            "Wrote chunk"
        );

        self.chunk_buffer.clear();
        self.compressed.clear();
        Ok(())
    }

    /// Flushes the pending chunk, writes the header and releases every resource.
    ///
    /// The file and the compressor are released even when an earlier step
    /// fails; the first error is returned.
    ///
    /// # Errors
    /// Besides flush and I/O errors, returns `Usage` when fewer chunks were
    /// written than the header declares (the header is then not written), and
    /// when called a second time.
    pub fn close(&mut self) -> Result<()> {
        self.shutdown().map(drop)
    }

    /// Like [`ChunkWriter::close`], but hands back the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        self.shutdown()?
            .ok_or_else(|| ForwardIndexError::Usage("Data file has already been closed".into()))
    }

    fn shutdown(&mut self) -> Result<Option<W>> {
        self.ensure_open()?;
        self.closed = true;

        let finalized = self.finalize();
        let sink = match self.sink.take() {
            Some(sink) => sink.into_inner().map(Some),
            None => Ok(None),
        };
        let released = self.release_compressor();

        debug!(
            chunks = self.header.chunk_offsets().len(),
            file_size = self.data_offset,
            ok = finalized.is_ok(),
            "Closed chunk forward index writer"
        );
        finalized.and(sink).and_then(|sink| released.map(|()| sink))
    }

    fn finalize(&mut self) -> Result<()> {
        if !self.chunk_buffer.is_empty() {
            self.write_chunk()?;
        }
        if !self.header.is_complete() {
            return Err(ForwardIndexError::Usage(format!(
                "Only {} of {} declared chunks were written, header left unwritten",
                self.header.chunk_offsets().len(),
                self.header.num_chunks
            )));
        }

        let bytes = self.header.to_bytes()?;
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| ForwardIndexError::Usage("Data file has already been closed".into()))?;
        sink.write_all_at(0, &bytes)
    }
}

impl<W> ChunkWriter<W> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(ForwardIndexError::Usage("Writer is already closed".into()));
        }
        Ok(())
    }

    fn release_compressor(&mut self) -> Result<()> {
        match self.compressor.take() {
            Some(mut compressor) => compressor.close().inspect_err(|e| {
                warn!(error = %e, "Failed to release chunk compressor");
            }),
            None => Ok(()),
        }
    }

    /// The current chunk.
    pub fn chunk_buffer(&self) -> &ChunkBuffer {
        &self.chunk_buffer
    }

    /// Bytes pending in the current chunk.
    pub fn position(&self) -> usize {
        self.chunk_buffer.position()
    }

    /// Bytes that can still be appended to the current chunk.
    pub fn remaining(&self) -> usize {
        self.chunk_buffer.remaining()
    }

    /// The header as built so far.
    pub fn header(&self) -> &ChunkFileHeader {
        &self.header
    }

    /// File offset at which the next chunk will be written.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Number of chunks written so far.
    pub fn num_written_chunks(&self) -> usize {
        self.header.chunk_offsets().len()
    }

    /// Codec recorded in the header.
    pub fn compression_type(&self) -> ChunkCompressionType {
        self.compression
    }

    /// Returns true once `close` or `finish` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<W> Drop for ChunkWriter<W> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(
            written_chunks = self.header.chunk_offsets().len(),
            declared_chunks = self.header.num_chunks,
            "Chunk forward index writer dropped without close, header not written"
        );
        let _ = self.release_compressor();
    }
}
