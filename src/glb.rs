//! GLB (binary glTF) container framing.
//!
//! Header: `(magic: u32, version: u32, totalLength: u32)` followed by
//! chunks, each `(chunkLength: u32, chunkType: u32, chunkData)`. The first
//! chunk must be JSON; an optional BIN chunk may follow.

use crate::error::{Error, Result};

pub const GLB_MAGIC: u32 = 0x4654_6c67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_TYPE_JSON: u32 = 0x4e4f_534a;
pub const CHUNK_TYPE_BIN: u32 = 0x004e_4942;

const HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;

/// The two chunks a GLB container may carry.
#[derive(Debug)]
pub struct GlbChunks {
    pub json: String,
    pub bin: Option<Vec<u8>>,
}

/// Returns `true` if `bytes` begins with the GLB magic number.
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && u32::from_le_bytes(bytes[0..4].try_into().unwrap()) == GLB_MAGIC
}

/// Parses a GLB container's header and chunks.
///
/// The JSON chunk text returned is the verbatim byte range `20..20+jsonLen`
/// of the input, UTF-8 decoded with no trailing whitespace added or
/// stripped.
pub fn read_glb_chunks(bytes: &[u8]) -> Result<GlbChunks> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::MissingJsonChunk);
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if magic != GLB_MAGIC {
        return Err(Error::BadGlbMagic(magic));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != GLB_VERSION {
        return Err(Error::UnsupportedGlbVersion(version));
    }

    let mut cursor = HEADER_SIZE;
    if cursor + CHUNK_HEADER_SIZE > bytes.len() {
        return Err(Error::MissingJsonChunk);
    }
    let json_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
    let json_type = u32::from_le_bytes(bytes[cursor + 4..cursor + 8].try_into().unwrap());
    if json_type != CHUNK_TYPE_JSON {
        return Err(Error::BadChunkType {
            expected: CHUNK_TYPE_JSON,
            found: json_type,
        });
    }
    if json_len == 0 {
        return Err(Error::MissingJsonChunk);
    }
    cursor += CHUNK_HEADER_SIZE;
    if cursor + json_len > bytes.len() {
        return Err(Error::MissingJsonChunk);
    }
    let json = String::from_utf8(bytes[cursor..cursor + json_len].to_vec())?;
    cursor += json_len;

    let bin = if cursor + CHUNK_HEADER_SIZE <= bytes.len() {
        let bin_len = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap()) as usize;
        let bin_type = u32::from_le_bytes(bytes[cursor + 4..cursor + 8].try_into().unwrap());
        if bin_type != CHUNK_TYPE_BIN {
            None
        } else {
            cursor += CHUNK_HEADER_SIZE;
            if cursor + bin_len > bytes.len() {
                return Err(Error::SubtreeLengthMismatch);
            }
            Some(bytes[cursor..cursor + bin_len].to_vec())
        }
    } else {
        None
    };

    Ok(GlbChunks { json, bin })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        let json_bytes = json.as_bytes();
        let bin_bytes = bin.unwrap_or(&[]);

        let total_len = HEADER_SIZE
            + CHUNK_HEADER_SIZE
            + json_bytes.len()
            + if bin.is_some() {
                CHUNK_HEADER_SIZE + bin_bytes.len()
            } else {
                0
            };

        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&(total_len as u32).to_le_bytes());

        out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
        out.extend_from_slice(json_bytes);

        if let Some(bin_bytes) = bin {
            out.extend_from_slice(&(bin_bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
            out.extend_from_slice(bin_bytes);
        }
        out
    }

    #[test]
    fn splits_json_and_bin_chunks() {
        let json = r#"{"asset":{"version":"2.0"}}"#;
        let bin = vec![1u8, 2, 3, 4, 5];
        let glb = build_glb(json, Some(&bin));
        let chunks = read_glb_chunks(&glb).unwrap();
        assert_eq!(chunks.json, json);
        assert_eq!(chunks.bin, Some(bin));
    }

    #[test]
    fn json_only_has_no_bin_chunk() {
        let json = r#"{"asset":{"version":"2.0"}}"#;
        let glb = build_glb(json, None);
        let chunks = read_glb_chunks(&glb).unwrap();
        assert_eq!(chunks.json, json);
        assert!(chunks.bin.is_none());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut glb = build_glb("{}", None);
        glb[0] = 0;
        let err = read_glb_chunks(&glb).unwrap_err();
        assert!(matches!(err, Error::BadGlbMagic(_)));
    }

    #[test]
    fn rejects_empty_json_chunk() {
        let glb = build_glb("", None);
        let err = read_glb_chunks(&glb).unwrap_err();
        assert!(matches!(err, Error::MissingJsonChunk));
    }

    #[test]
    fn bin_chunk_type_matches_wire_bytes() {
        // On-disk chunk type is the ASCII bytes `B I N \0`, little-endian.
        assert_eq!(CHUNK_TYPE_BIN.to_le_bytes(), [0x42, 0x49, 0x4e, 0x00]);
    }
}
