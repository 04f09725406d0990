//! Decompression wrappers for 3TZ payloads.
//!
//! Every method returns exactly `expected_size` bytes on success; a length
//! mismatch is always an error, never a silent truncation or pad.

use crate::error::{Error, Result};
use std::io::Read;

/// Compression methods a 3TZ archive entry may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Deflate,
    /// Zstandard, method id 93 (0x5D).
    Zstd,
    /// Legacy Zstandard, method id 23 (0x17), decode-only.
    ZstdLegacy,
}

impl CompressionMethod {
    pub fn raw(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Zstd => 93,
            CompressionMethod::ZstdLegacy => 23,
        }
    }
}

impl TryFrom<u16> for CompressionMethod {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(CompressionMethod::Store),
            8 => Ok(CompressionMethod::Deflate),
            93 => Ok(CompressionMethod::Zstd),
            23 => Ok(CompressionMethod::ZstdLegacy),
            other => Err(Error::UnsupportedCompressionMethod(other)),
        }
    }
}

/// Decompresses `input`, which was compressed with `method`, expecting
/// exactly `expected_size` bytes of output.
///
/// # Errors
///
/// Returns [`Error::DecompressionFailed`] if the backend rejects the input,
/// or a length mismatch against `expected_size`.
pub fn decompress(method: CompressionMethod, expected_size: u64, input: &[u8]) -> Result<Vec<u8>> {
    let out = match method {
        CompressionMethod::Store => input.to_vec(),
        CompressionMethod::Deflate => decompress_deflate(input, expected_size)?,
        CompressionMethod::Zstd | CompressionMethod::ZstdLegacy => {
            decompress_zstd(input, expected_size)?
        }
    };
    if out.len() as u64 != expected_size {
        return Err(Error::DecompressionBoundExceeded {
            declared: expected_size,
        });
    }
    Ok(out)
}

fn decompress_deflate(input: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::DeflateDecoder::new(input);
    let mut out = Vec::with_capacity(expected_size as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
    Ok(out)
}

fn decompress_zstd(input: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    zstd::bulk::decompress(input, expected_size as usize)
        .map_err(|e| Error::DecompressionFailed(e.to_string()))
}
