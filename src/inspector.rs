// src/inspector.rs

//! Tools for inspecting the physical structure of forward-index files.
//! Useful for debugging chunking parameters and verifying finished files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::error::{ForwardIndexError, Result};
use crate::format::{CHUNK_OFFSET_TABLE_START, ChunkFileHeader};

/// A structural report of a forward-index file.
#[derive(Debug, Serialize)]
pub struct HeaderReport {
    /// Total size of the file on disk.
    pub file_size: u64,
    /// Size of the header, offset table included.
    pub header_size: u64,
    /// Format version tag.
    pub version: u32,
    /// Compression codec name.
    pub compression: String,
    /// Documents in the file.
    pub total_docs: u32,
    /// Documents per chunk.
    pub docs_per_chunk: u32,
    /// Declared entry size (max length for variable-width columns).
    pub entry_size: u32,
    /// One entry per chunk, in file order.
    pub chunks: Vec<ChunkInfo>,
}

/// Location of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    /// Chunk index.
    pub index: u32,
    /// Absolute offset.
    pub offset: u64,
    /// Compressed length on disk.
    pub length: u64,
    /// Documents stored in the chunk.
    pub docs: u32,
}

/// The forward-index inspector tool.
#[derive(Debug)]
pub struct ForwardIndexInspector;

impl ForwardIndexInspector {
    /// Reads the header of the file at `path` and reports its chunk layout.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<HeaderReport> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        let mut fixed = [0u8; CHUNK_OFFSET_TABLE_START];
        file.read_exact(&mut fixed)?;
        let prefix = ChunkFileHeader::from_bytes_prefix(&fixed)?;

        let header_size = prefix.size();
        if header_size > file_size {
            return Err(ForwardIndexError::Format(format!(
                "Header of {header_size} bytes does not fit a {file_size}-byte file"
            )));
        }
        let mut bytes = fixed.to_vec();
        bytes.resize(header_size as usize, 0);
        file.read_exact(&mut bytes[CHUNK_OFFSET_TABLE_START..])?;

        let header = ChunkFileHeader::from_bytes(&bytes)?;
        Self::report(&header, file_size)
    }

    /// Builds the report for an already decoded header.
    pub fn report(header: &ChunkFileHeader, file_size: u64) -> Result<HeaderReport> {
        let offsets = header.chunk_offsets();
        let mut chunks = Vec::with_capacity(offsets.len());
        for (i, &offset) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(file_size);
            let length = end.checked_sub(offset).ok_or_else(|| {
                ForwardIndexError::Format(format!(
                    "Chunk {i} at offset {offset} ends before it starts ({end})"
                ))
            })?;
            let index = i as u32;
            let first_doc = u64::from(index) * u64::from(header.docs_per_chunk);
            let docs = u64::from(header.total_docs)
                .saturating_sub(first_doc)
                .min(u64::from(header.docs_per_chunk)) as u32;
            chunks.push(ChunkInfo {
                index,
                offset,
                length,
                docs,
            });
        }

        Ok(HeaderReport {
            file_size,
            header_size: header.size(),
            version: header.version.as_u32(),
            compression: header.compression.to_string(),
            total_docs: header.total_docs,
            docs_per_chunk: header.docs_per_chunk,
            entry_size: header.entry_size,
            chunks,
        })
    }
}
