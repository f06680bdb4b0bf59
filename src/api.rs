//! One-call entry points that size and open writers from a [`ForwardIndexConfig`].

use std::fs::File;
use std::path::Path;

use crate::config::ForwardIndexConfig;
use crate::error::{ForwardIndexError, Result};
use crate::fixed::FixedByteChunkWriter;
use crate::var_byte::VarByteChunkWriter;

/// Config-driven entry points for writing raw forward indexes.
#[derive(Debug)]
pub struct ForwardIndex;

impl ForwardIndex {
    /// Opens a fixed-width writer sized by `config`.
    ///
    /// # Arguments
    /// * `path`: Destination file path.
    /// * `total_docs`: Number of values that will be written.
    /// * `entry_size`: Width of every value in bytes.
    pub fn fixed_writer<P: AsRef<Path>>(
        path: P,
        config: &ForwardIndexConfig,
        total_docs: u32,
        entry_size: u32,
    ) -> Result<FixedByteChunkWriter<File>> {
        config.validate()?;
        FixedByteChunkWriter::create(
            path,
            config.compression_codec,
            total_docs,
            config.fixed_docs_per_chunk(entry_size),
            entry_size,
            config.raw_index_writer_version,
        )
    }

    /// Opens a variable-width writer sized by `config`.
    ///
    /// # Arguments
    /// * `path`: Destination file path.
    /// * `total_docs`: Number of values that will be written.
    /// * `max_length`: Length in bytes of the longest value.
    pub fn var_byte_writer<P: AsRef<Path>>(
        path: P,
        config: &ForwardIndexConfig,
        total_docs: u32,
        max_length: u32,
    ) -> Result<VarByteChunkWriter<File>> {
        config.validate()?;
        VarByteChunkWriter::create(
            path,
            config.compression_codec,
            total_docs,
            config.var_byte_docs_per_chunk(max_length),
            max_length,
            config.raw_index_writer_version,
        )
    }

    /// Writes a complete column of 8-byte integers in one call.
    pub fn write_i64s<P: AsRef<Path>>(
        path: P,
        config: &ForwardIndexConfig,
        values: &[i64],
    ) -> Result<()> {
        let mut writer = Self::fixed_writer(path, config, doc_count(values.len())?, 8)?;
        for &value in values {
            writer.put_i64(value)?;
        }
        writer.close()
    }

    /// Writes a complete column of byte strings in one call.
    ///
    /// The longest value decides the declared max length.
    pub fn write_bytes<P, V>(path: P, config: &ForwardIndexConfig, values: &[V]) -> Result<()>
    where
        P: AsRef<Path>,
        V: AsRef<[u8]>,
    {
        let longest = values.iter().map(|v| v.as_ref().len()).max().unwrap_or(0);
        let max_length = u32::try_from(longest).map_err(|_| {
            ForwardIndexError::Configuration(format!("Value of {longest} bytes is too long"))
        })?;
        let mut writer =
            Self::var_byte_writer(path, config, doc_count(values.len())?, max_length)?;
        for value in values {
            writer.put_bytes(value.as_ref())?;
        }
        writer.close()
    }
}

fn doc_count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        ForwardIndexError::Configuration(format!("{len} documents do not fit a single file"))
    })
}
