//! Variable-width entry encoder.
//!
//! Each chunk starts with a row-offset table followed by the values:
//!
//! ```text
//! [i32 start of row 0] ... [i32 start of row docs_per_chunk-1] [row 0 bytes] [row 1 bytes] ...
//! ```
//!
//! Row starts are relative to the chunk start. In the last, partially filled
//! chunk the unused slots point at the end of the data, so every row length
//! can be derived as `start[i + 1] - start[i]`.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::compression::ChunkCompressionType;
use crate::error::{ForwardIndexError, Result};
use crate::writer::{ChunkLayout, ChunkWriter};

/// Size of one row-offset entry at the start of each chunk.
pub const CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE: usize = 4;

/// Writes variable-length byte values of at most `max_length` bytes each.
pub struct VarByteChunkWriter<W = File> {
    inner: ChunkWriter<W>,
    max_length: usize,
    docs_per_chunk: usize,
    chunk_header_size: usize,
    docs_in_chunk: usize,
    docs_written: u32,
}

/// Chunk capacity for `docs_per_chunk` values of at most `max_length` bytes.
pub fn var_byte_chunk_size(docs_per_chunk: u32, max_length: u32) -> u64 {
    u64::from(docs_per_chunk)
        * (CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE as u64 + u64::from(max_length))
}

impl VarByteChunkWriter<File> {
    /// Creates a writer at `path`. Only format versions 2 and 3 are accepted.
    pub fn create<P: AsRef<Path>>(
        path: P,
        compression: ChunkCompressionType,
        total_docs: u32,
        docs_per_chunk: u32,
        max_length: u32,
        version: u32,
    ) -> Result<Self> {
        let layout = Self::layout(total_docs, docs_per_chunk, max_length, version);
        Ok(Self::wrap(
            ChunkWriter::create(path, compression, layout)?,
            max_length,
            docs_per_chunk,
        ))
    }
}

impl<W: Write + Seek> VarByteChunkWriter<W> {
    /// Creates a writer over an arbitrary seekable sink.
    pub fn new(
        sink: W,
        compression: ChunkCompressionType,
        total_docs: u32,
        docs_per_chunk: u32,
        max_length: u32,
        version: u32,
    ) -> Result<Self> {
        let layout = Self::layout(total_docs, docs_per_chunk, max_length, version);
        Ok(Self::wrap(
            ChunkWriter::new(sink, compression, layout)?,
            max_length,
            docs_per_chunk,
        ))
    }

    fn layout(total_docs: u32, docs_per_chunk: u32, max_length: u32, version: u32) -> ChunkLayout {
        ChunkLayout {
            total_docs,
            docs_per_chunk,
            chunk_size: var_byte_chunk_size(docs_per_chunk, max_length),
            entry_size: max_length,
            version,
            fixed_width: false,
        }
    }

    fn wrap(inner: ChunkWriter<W>, max_length: u32, docs_per_chunk: u32) -> Self {
        let docs_per_chunk = docs_per_chunk as usize;
        Self {
            inner,
            max_length: max_length as usize,
            docs_per_chunk,
            chunk_header_size: docs_per_chunk * CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE,
            docs_in_chunk: 0,
            docs_written: 0,
        }
    }

    /// Appends a UTF-8 string value.
    pub fn put_str(&mut self, value: &str) -> Result<()> {
        self.put_bytes(value.as_bytes())
    }

    /// Appends one document's value of at most `max_length` bytes.
    ///
    /// # Errors
    /// `Usage` if the value is longer than `max_length` or all declared
    /// documents have already been written.
    pub fn put_bytes(&mut self, value: &[u8]) -> Result<()> {
        let total_docs = self.inner.header().total_docs;
        if self.docs_written == total_docs {
            return Err(ForwardIndexError::Usage(format!(
                "All {total_docs} declared documents have already been written"
            )));
        }
        if value.len() > self.max_length {
            return Err(ForwardIndexError::Usage(format!(
                "Value of {} bytes exceeds the declared max length of {}",
                value.len(),
                self.max_length
            )));
        }

        let chunk_header_size = self.chunk_header_size;
        let slot = self.docs_in_chunk * CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE;
        let buffer = self.inner.chunk_buffer_mut()?;
        if buffer.is_empty() {
            buffer.append_zeros(chunk_header_size)?;
        }
        let row_start = row_offset(buffer.position())?;
        buffer.put_i32_at(slot, row_start)?;
        buffer.append(value)?;

        self.docs_written += 1;
        self.docs_in_chunk += 1;
        if self.docs_in_chunk == self.docs_per_chunk {
            self.write_chunk()?;
        }
        Ok(())
    }

    fn write_chunk(&mut self) -> Result<()> {
        let buffer = self.inner.chunk_buffer_mut()?;
        let data_end = row_offset(buffer.position())?;
        for doc in self.docs_in_chunk..self.docs_per_chunk {
            buffer.put_i32_at(doc * CHUNK_HEADER_ENTRY_ROW_OFFSET_SIZE, data_end)?;
        }
        self.inner.flush_chunk()?;
        self.docs_in_chunk = 0;
        Ok(())
    }

    /// Flushes the last partial chunk and writes the header.
    ///
    /// The underlying writer is closed even if the last chunk fails to flush.
    pub fn close(&mut self) -> Result<()> {
        let flushed = self.flush_partial_chunk();
        let closed = self.inner.close();
        flushed.and(closed)
    }

    /// Closes the writer and returns the underlying sink.
    pub fn finish(mut self) -> Result<W> {
        let flushed = self.flush_partial_chunk();
        let sink = self.inner.finish();
        flushed.and(sink)
    }

    fn flush_partial_chunk(&mut self) -> Result<()> {
        if self.docs_in_chunk == 0 {
            return Ok(());
        }
        self.write_chunk()
    }

    /// The underlying chunk writer.
    pub fn chunk_writer(&self) -> &ChunkWriter<W> {
        &self.inner
    }
}

fn row_offset(position: usize) -> Result<i32> {
    i32::try_from(position).map_err(|_| {
        ForwardIndexError::Usage(format!("Row offset {position} does not fit in a chunk"))
    })
}
