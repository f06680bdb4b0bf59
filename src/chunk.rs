//! The reusable scratch region a chunk is assembled in.

use crate::error::{ForwardIndexError, Result};

/// A fixed-capacity byte buffer holding the entries of the chunk being built.
///
/// Encoders append bytes until the chunk is full; the writer compresses the
/// filled prefix and clears the buffer for the next chunk. The allocation is
/// made once and reused for the writer's whole lifetime.
#[derive(Debug)]
pub struct ChunkBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl ChunkBuffer {
    /// Allocates an empty buffer able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `bytes` at the current position.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Usage` if the bytes do not fit; nothing is
    /// appended in that case.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(ForwardIndexError::Usage(format!(
                "Cannot append {} bytes to chunk buffer, only {} of {} bytes remain",
                bytes.len(),
                self.remaining(),
                self.capacity
            )));
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends `count` zero bytes, reserving space to be patched later.
    pub fn append_zeros(&mut self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(ForwardIndexError::Usage(format!(
                "Cannot reserve {count} bytes in chunk buffer, only {} remain",
                self.remaining()
            )));
        }
        self.data.resize(self.data.len() + count, 0);
        Ok(())
    }

    /// Overwrites already appended bytes starting at `position`.
    ///
    /// # Errors
    /// Returns `ForwardIndexError::Usage` if the range is not fully inside the
    /// filled part of the buffer.
    pub fn write_at(&mut self, position: usize, bytes: &[u8]) -> Result<()> {
        let filled = self.data.len();
        let target = position
            .checked_add(bytes.len())
            .and_then(|end| self.data.get_mut(position..end))
            .ok_or_else(|| {
                ForwardIndexError::Usage(format!(
                    "Cannot patch {} bytes at {position}, only {filled} bytes are filled",
                    bytes.len()
                ))
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Appends a big-endian `i32`.
    pub fn put_i32(&mut self, value: i32) -> Result<()> {
        self.append(&value.to_be_bytes())
    }

    /// Appends a big-endian `i64`.
    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.append(&value.to_be_bytes())
    }

    /// Overwrites four filled bytes at `position` with a big-endian `i32`.
    pub fn put_i32_at(&mut self, position: usize, value: i32) -> Result<()> {
        self.write_at(position, &value.to_be_bytes())
    }

    /// Number of bytes appended since the last flush.
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// The fixed capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The pending bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Discards the pending bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
