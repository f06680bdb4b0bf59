//! Low-level positional writes into the data file.
//!
//! Chunks are appended at the writer's running offset while the header is
//! written last, at offset 0, so the sink must be seekable. Any
//! `Write + Seek` works: files in production, `Cursor<Vec<u8>>` in memory.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

/// A seekable sink that writes complete buffers at absolute offsets.
#[derive(Debug)]
pub struct PositionalWriter<W> {
    inner: W,
}

impl PositionalWriter<File> {
    /// Opens `path` for read/write, creating it and truncating any previous content.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek> PositionalWriter<W> {
    /// Wraps an existing sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes the whole buffer starting at `offset`.
    pub fn write_all_at(&mut self, offset: u64, buffer: &[u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buffer)?;
        Ok(())
    }

    /// Flushes buffered bytes to the underlying medium.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}
