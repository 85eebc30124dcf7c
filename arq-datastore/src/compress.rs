//! Payload decompression after the encryption envelope is removed.
//!
//! LZ4 payloads carry a big-endian `i32` expected size followed by a
//! single raw LZ4 block. Store payloads pass through verbatim. Gzip is
//! recognized in headers but never produced by the stores this reader
//! targets, so it stays unsupported.

use crate::error::{DecodeCtx, StoreError};
use crate::file_formats::CompressionType;
use arq_tools::byte_reader::ByteReader;

pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>, StoreError> {
    match compression {
        CompressionType::Store => Ok(data.to_vec()),
        CompressionType::Lz4 => decompress_lz4(data),
        CompressionType::Gzip => Err(StoreError::Unsupported(CompressionType::Gzip.as_i32())),
    }
}

fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    const CTX: &str = "lz4 payload";

    let mut r = ByteReader::new(data);
    let expected = r.read_i32().ctx(CTX)?;
    let expected = usize::try_from(expected).map_err(|_| StoreError::Overflow {
        context: CTX.to_string(),
        msg: format!("invalid expected size {expected}"),
    })?;

    let block = r.read_remaining();
    let out = lz4_flex::block::decompress(block, expected)
        .map_err(|err| StoreError::format(CTX, err.to_string()))?;
    if out.len() != expected {
        return Err(StoreError::integrity(
            CTX,
            format!("decompressed to {} bytes, expected {expected}", out.len()),
        ));
    }
    Ok(out)
}
