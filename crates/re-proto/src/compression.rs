//! Zlib bodies of compressed frames.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::ProtoError;

pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>, ProtoError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a stream that must expand to exactly `size` bytes.
///
/// Output is capped one byte past `size`, so an oversized stream is caught
/// without inflating all of it.
pub fn inflate(data: &[u8], size: usize) -> Result<Vec<u8>, ProtoError> {
    let mut out = Vec::with_capacity(size);
    ZlibDecoder::new(data)
        .take(size as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() != size {
        return Err(ProtoError::SizeMismatch {
            declared: size,
            actual: out.len(),
        });
    }
    Ok(out)
}
