#![allow(dead_code)]

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chunkfwd::{
    ChunkCompressionType, ChunkCompressor, ChunkFileHeader, ForwardIndexError,
    ForwardIndexInspector, PassThroughCompressor, Result, compressor_for,
};

/// Splits a finished file into its header and decompressed chunks.
pub fn decode_chunks(bytes: &[u8], max_chunk_size: usize) -> Result<(ChunkFileHeader, Vec<Vec<u8>>)> {
    let header = ChunkFileHeader::from_bytes(bytes)?;
    let report = ForwardIndexInspector::report(&header, bytes.len() as u64)?;
    let mut compressor = compressor_for(header.compression)?;

    let mut chunks = Vec::with_capacity(report.chunks.len());
    for info in &report.chunks {
        let start = info.offset as usize;
        let end = start + info.length as usize;
        chunks.push(compressor.decompress(&bytes[start..end], max_chunk_size)?);
    }
    Ok((header, chunks))
}

/// Reads back the values of a fixed-width file.
pub fn decode_fixed(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let header = ChunkFileHeader::from_bytes(bytes)?;
    let entry = header.entry_size as usize;
    let (_, chunks) = decode_chunks(bytes, entry * header.docs_per_chunk as usize)?;
    Ok(chunks
        .iter()
        .flat_map(|chunk| chunk.chunks(entry).map(<[u8]>::to_vec))
        .collect())
}

/// Reads back the values of a variable-width file.
pub fn decode_var_byte(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let header = ChunkFileHeader::from_bytes(bytes)?;
    let docs_per_chunk = header.docs_per_chunk as usize;
    let max_chunk = docs_per_chunk * (4 + header.entry_size as usize);
    let (_, chunks) = decode_chunks(bytes, max_chunk)?;

    let mut values = Vec::new();
    let mut remaining = header.total_docs as usize;
    for chunk in &chunks {
        let starts: Vec<usize> = (0..docs_per_chunk)
            .map(|i| i32::from_be_bytes(chunk[i * 4..i * 4 + 4].try_into().unwrap()) as usize)
            .collect();
        let docs = remaining.min(docs_per_chunk);
        for i in 0..docs {
            let end = starts.get(i + 1).copied().unwrap_or(chunk.len());
            values.push(chunk[starts[i]..end].to_vec());
        }
        remaining -= docs;
    }
    Ok(values)
}

/// Pass-through compressor that counts how often it is closed.
#[derive(Debug)]
pub struct CountingCompressor {
    pub closes: Arc<AtomicUsize>,
}

impl CountingCompressor {
    pub fn new() -> (Box<Self>, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                closes: Arc::clone(&closes),
            }),
            closes,
        )
    }
}

impl ChunkCompressor for CountingCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::PassThrough
    }

    fn compress_into(&mut self, data: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        PassThroughCompressor.compress_into(data, output)
    }

    fn decompress(&mut self, data: &[u8], max_raw_size: usize) -> Result<Vec<u8>> {
        PassThroughCompressor.decompress(data, max_raw_size)
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        raw_size
    }

    fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Compressor that rejects every chunk.
#[derive(Debug)]
pub struct BrokenCompressor;

impl ChunkCompressor for BrokenCompressor {
    fn compression_type(&self) -> ChunkCompressionType {
        ChunkCompressionType::Lz4
    }

    fn compress_into(&mut self, _data: &[u8], _output: &mut Vec<u8>) -> Result<usize> {
        Err(ForwardIndexError::Compression("corrupt input".into()))
    }

    fn decompress(&mut self, _data: &[u8], _max_raw_size: usize) -> Result<Vec<u8>> {
        Err(ForwardIndexError::Compression("corrupt input".into()))
    }

    fn max_compressed_size(&self, raw_size: usize) -> usize {
        raw_size
    }
}

/// In-memory sink whose writes at offset 0 (the header) fail.
#[derive(Debug, Default)]
pub struct HeaderFailingSink {
    inner: Cursor<Vec<u8>>,
}

impl Write for HeaderFailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.inner.position() == 0 {
            return Err(io::Error::other("disk full"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for HeaderFailingSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Sink that discards bytes but tracks its position, for multi-GiB offsets.
#[derive(Debug, Default)]
pub struct NullSink {
    position: u64,
    pub bytes: u64,
}

impl Write for NullSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.position += buf.len() as u64;
        self.bytes += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for NullSink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => self.position = offset,
            _ => return Err(io::Error::other("only absolute seeks are supported")),
        }
        Ok(self.position)
    }
}
