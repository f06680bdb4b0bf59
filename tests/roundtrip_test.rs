#![allow(missing_docs)]

mod common;

use std::io::Cursor;

use chunkfwd::{
    ChunkCompressionType, ChunkFileHeader, FixedByteChunkWriter, ForwardIndexError, Result,
    VarByteChunkWriter,
};
use common::{decode_fixed, decode_var_byte};

fn available_codecs() -> impl Iterator<Item = ChunkCompressionType> {
    ChunkCompressionType::ALL
        .into_iter()
        .filter(|kind| kind.is_available())
}

#[test]
fn test_fixed_width_longs_with_every_codec() -> Result<()> {
    let values: Vec<i64> = (0..1_003).map(|i| i * 7 - 500).collect();

    for codec in available_codecs() {
        let mut writer =
            FixedByteChunkWriter::new(Cursor::new(Vec::new()), codec, 1_003, 100, 8, 3)?;
        for &value in &values {
            writer.put_i64(value)?;
        }
        let bytes = writer.finish()?.into_inner();

        let header = ChunkFileHeader::from_bytes(&bytes)?;
        assert_eq!(header.compression, codec);
        assert_eq!(header.num_chunks, 11);

        let decoded: Vec<i64> = decode_fixed(&bytes)?
            .iter()
            .map(|entry| i64::from_be_bytes(entry.as_slice().try_into().unwrap()))
            .collect();
        assert_eq!(decoded, values, "codec {codec}");
    }
    Ok(())
}

#[test]
fn test_fixed_width_floats_across_versions() -> Result<()> {
    let values = [1.5_f64, -0.25, f64::MAX, 0.0, 42.0];

    for version in 2..=5 {
        let mut writer = FixedByteChunkWriter::new(
            Cursor::new(Vec::new()),
            ChunkCompressionType::PassThrough,
            values.len() as u32,
            2,
            8,
            version,
        )?;
        for value in values {
            writer.put_f64(value)?;
        }
        let bytes = writer.finish()?.into_inner();

        let decoded: Vec<f64> = decode_fixed(&bytes)?
            .iter()
            .map(|entry| f64::from_be_bytes(entry.as_slice().try_into().unwrap()))
            .collect();
        assert_eq!(decoded, values, "version {version}");
    }
    Ok(())
}

#[test]
fn test_fixed_width_rejects_wrong_entry_size() -> Result<()> {
    let mut writer = FixedByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::PassThrough,
        2,
        2,
        4,
        2,
    )?;
    assert!(matches!(
        writer.put_i64(1),
        Err(ForwardIndexError::Usage(_))
    ));
    writer.put_i32(1)?;
    writer.put_f32(2.0)?;
    assert_eq!(writer.chunk_writer().num_written_chunks(), 1);
    writer.close()
}

#[test]
fn test_var_byte_strings_with_every_codec() -> Result<()> {
    let values: Vec<String> = (0..23)
        .map(|i| "forward".repeat(i % 4) + &i.to_string())
        .collect();
    let max_length = values.iter().map(String::len).max().unwrap_or(0) as u32;

    for codec in available_codecs() {
        let mut writer = VarByteChunkWriter::new(
            Cursor::new(Vec::new()),
            codec,
            values.len() as u32,
            5,
            max_length,
            2,
        )?;
        for value in &values {
            writer.put_str(value)?;
        }
        let bytes = writer.finish()?.into_inner();

        let header = ChunkFileHeader::from_bytes(&bytes)?;
        assert_eq!(header.entry_size, max_length);
        assert_eq!(header.num_chunks, 5);

        let decoded: Vec<String> = decode_var_byte(&bytes)?
            .into_iter()
            .map(|v| String::from_utf8(v).unwrap())
            .collect();
        assert_eq!(decoded, values, "codec {codec}");
    }
    Ok(())
}

#[test]
fn test_var_byte_partial_chunk_points_unused_slots_at_data_end() -> Result<()> {
    let mut writer = VarByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::PassThrough,
        2,
        4,
        8,
        3,
    )?;
    writer.put_bytes(b"ab")?;
    writer.put_bytes(b"")?;
    let bytes = writer.finish()?.into_inner();

    let header = ChunkFileHeader::from_bytes(&bytes)?;
    let chunk = &bytes[header.chunk_offsets()[0] as usize..];
    let slots: Vec<i32> = chunk[..16]
        .chunks(4)
        .map(|slot| i32::from_be_bytes(slot.try_into().unwrap()))
        .collect();
    assert_eq!(slots, vec![16, 18, 18, 18]);
    assert_eq!(&chunk[16..], b"ab");

    assert_eq!(decode_var_byte(&bytes)?, vec![b"ab".to_vec(), Vec::new()]);
    Ok(())
}

#[test]
fn test_var_byte_rejects_values_over_max_length() -> Result<()> {
    let mut writer = VarByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::PassThrough,
        1,
        1,
        3,
        2,
    )?;
    assert!(matches!(
        writer.put_str("four"),
        Err(ForwardIndexError::Usage(_))
    ));
    writer.put_str("ok")?;
    writer.close()
}

#[test]
fn test_var_byte_refuses_fixed_width_only_versions() {
    for version in [4, 5] {
        let result = VarByteChunkWriter::new(
            Cursor::new(Vec::new()),
            ChunkCompressionType::PassThrough,
            10,
            5,
            16,
            version,
        );
        assert!(matches!(result, Err(ForwardIndexError::Configuration(_))));
    }
}

#[cfg(feature = "lz4_flex")]
#[test]
fn test_length_prefixed_lz4_chunks_carry_raw_size() -> Result<()> {
    let mut writer = FixedByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::Lz4LengthPrefixed,
        4,
        4,
        4,
        3,
    )?;
    for value in [1, 2, 3, 4] {
        writer.put_i32(value)?;
    }
    let bytes = writer.finish()?.into_inner();

    let header = ChunkFileHeader::from_bytes(&bytes)?;
    let start = header.chunk_offsets()[0] as usize;
    assert_eq!(&bytes[start..start + 4], &16_u32.to_le_bytes());
    Ok(())
}

#[cfg(feature = "zstd")]
#[test]
fn test_compressible_column_shrinks() -> Result<()> {
    let mut writer = FixedByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::Zstandard,
        10_000,
        1_000,
        8,
        3,
    )?;
    for _ in 0..10_000 {
        writer.put_i64(12_345)?;
    }
    let bytes = writer.finish()?.into_inner();
    assert!(bytes.len() < 10_000 * 8 / 10);
    assert_eq!(decode_fixed(&bytes)?.len(), 10_000);
    Ok(())
}

#[test]
fn test_documents_beyond_declared_total_are_refused() -> Result<()> {
    let mut fixed = FixedByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::PassThrough,
        5,
        2,
        8,
        3,
    )?;
    for value in 0..5 {
        fixed.put_i64(value)?;
    }
    assert!(matches!(fixed.put_i64(5), Err(ForwardIndexError::Usage(_))));
    let bytes = fixed.finish()?.into_inner();
    assert_eq!(decode_fixed(&bytes)?.len(), 5);

    let mut var_byte = VarByteChunkWriter::new(
        Cursor::new(Vec::new()),
        ChunkCompressionType::PassThrough,
        3,
        2,
        4,
        2,
    )?;
    for value in ["a", "b", "c"] {
        var_byte.put_str(value)?;
    }
    assert!(matches!(
        var_byte.put_str("d"),
        Err(ForwardIndexError::Usage(_))
    ));
    let bytes = var_byte.finish()?.into_inner();
    assert_eq!(
        decode_var_byte(&bytes)?,
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    );
    Ok(())
}
