//! Fixed-width entry encoder.
//!
//! Every document occupies exactly `entry_size` big-endian bytes, so a chunk
//! is `docs_per_chunk * entry_size` bytes and the value of document `d` sits
//! at `(d % docs_per_chunk) * entry_size` inside chunk `d / docs_per_chunk`.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::compression::ChunkCompressionType;
use crate::error::{ForwardIndexError, Result};
use crate::writer::{ChunkLayout, ChunkWriter};

/// Writes fixed-width values (ints, longs, floats, doubles, fixed byte strings).
pub struct FixedByteChunkWriter<W = File> {
    inner: ChunkWriter<W>,
    entry_size: usize,
    docs_per_chunk: u32,
    docs_in_chunk: u32,
    docs_written: u32,
}

impl FixedByteChunkWriter<File> {
    /// Creates a writer for `total_docs` values of `entry_size` bytes at `path`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        compression: ChunkCompressionType,
        total_docs: u32,
        docs_per_chunk: u32,
        entry_size: u32,
        version: u32,
    ) -> Result<Self> {
        let layout = Self::layout(total_docs, docs_per_chunk, entry_size, version);
        Ok(Self::wrap(
            ChunkWriter::create(path, compression, layout)?,
            entry_size,
            docs_per_chunk,
        ))
    }
}

impl<W: Write + Seek> FixedByteChunkWriter<W> {
    /// Creates a writer over an arbitrary seekable sink.
    pub fn new(
        sink: W,
        compression: ChunkCompressionType,
        total_docs: u32,
        docs_per_chunk: u32,
        entry_size: u32,
        version: u32,
    ) -> Result<Self> {
        let layout = Self::layout(total_docs, docs_per_chunk, entry_size, version);
        Ok(Self::wrap(
            ChunkWriter::new(sink, compression, layout)?,
            entry_size,
            docs_per_chunk,
        ))
    }

    fn layout(total_docs: u32, docs_per_chunk: u32, entry_size: u32, version: u32) -> ChunkLayout {
        ChunkLayout {
            total_docs,
            docs_per_chunk,
            chunk_size: u64::from(entry_size) * u64::from(docs_per_chunk),
            entry_size,
            version,
            fixed_width: true,
        }
    }

    fn wrap(inner: ChunkWriter<W>, entry_size: u32, docs_per_chunk: u32) -> Self {
        Self {
            inner,
            entry_size: entry_size as usize,
            docs_per_chunk,
            docs_in_chunk: 0,
            docs_written: 0,
        }
    }

    /// Appends a 4-byte integer.
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends an 8-byte integer.
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a 4-byte float.
    pub fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends an 8-byte float.
    pub fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends one document's value, which must be exactly `entry_size` bytes.
    ///
    /// The chunk is written as soon as it holds `docs_per_chunk` documents.
    ///
    /// # Errors
    /// `Usage` if the value has the wrong size or all declared documents
    /// have already been written.
    pub fn put_bytes(&mut self, value: &[u8]) -> Result<()> {
        let total_docs = self.inner.header().total_docs;
        if self.docs_written == total_docs {
            return Err(ForwardIndexError::Usage(format!(
                "All {total_docs} declared documents have already been written"
            )));
        }
        if value.len() != self.entry_size {
            return Err(ForwardIndexError::Usage(format!(
                "Value of {} bytes written to a column of {}-byte entries",
                value.len(),
                self.entry_size
            )));
        }
        self.inner.append(value)?;
        self.docs_written += 1;
        self.docs_in_chunk += 1;
        if self.docs_in_chunk == self.docs_per_chunk {
            self.inner.flush_chunk()?;
            self.docs_in_chunk = 0;
        }
        Ok(())
    }

    /// Flushes the last partial chunk and writes the header.
    pub fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    /// Closes the writer and returns the underlying sink.
    pub fn finish(self) -> Result<W> {
        self.inner.finish()
    }

    /// The underlying chunk writer.
    pub fn chunk_writer(&self) -> &ChunkWriter<W> {
        &self.inner
    }
}
