//! Local File Header parsing.

use super::constants::{LOCAL_FILE_HEADER_SIGNATURE, LOCAL_FILE_HEADER_SIZE};
use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub compression_method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename: String,
    pub extra_field_length: u16,
    /// Absolute offset, in the archive, of this header's signature.
    pub header_offset: u64,
}

impl LocalFileHeader {
    /// Offset in the archive at which the member's payload begins.
    pub fn payload_offset(&self) -> u64 {
        self.header_offset
            + LOCAL_FILE_HEADER_SIZE
            + self.filename.len() as u64
            + self.extra_field_length as u64
    }
}

/// Reads the fixed 30-byte local file header at `offset`, plus up to 100
/// probe bytes to cover the filename and a modest extra field, the way
/// `getLocalFileHeaderAtOffset` does against the source archive.
pub fn parse_local_file_header<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
) -> Result<LocalFileHeader> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut fixed = [0u8; 30];
    reader.read_exact(&mut fixed)?;

    let signature = u32::from_le_bytes(fixed[0..4].try_into().unwrap());
    if signature != LOCAL_FILE_HEADER_SIGNATURE {
        return Err(Error::MalformedLocalFileHeader);
    }
    let compression_method = u16::from_le_bytes(fixed[8..10].try_into().unwrap());
    let compressed_size = u32::from_le_bytes(fixed[18..22].try_into().unwrap());
    let uncompressed_size = u32::from_le_bytes(fixed[22..26].try_into().unwrap());
    let filename_length = u16::from_le_bytes(fixed[26..28].try_into().unwrap()) as usize;
    let extra_field_length = u16::from_le_bytes(fixed[28..30].try_into().unwrap());

    let mut filename_buf = vec![0u8; filename_length];
    reader.read_exact(&mut filename_buf)?;
    let filename = String::from_utf8(filename_buf)?;

    Ok(LocalFileHeader {
        compression_method,
        compressed_size,
        uncompressed_size,
        filename,
        extra_field_length,
        header_offset: offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_lfh(filename: &str, method: u16, comp: u32, uncomp: u32, extra_len: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&comp.to_le_bytes());
        out.extend_from_slice(&uncomp.to_le_bytes());
        out.extend_from_slice(&(filename.len() as u16).to_le_bytes());
        out.extend_from_slice(&extra_len.to_le_bytes());
        out.extend_from_slice(filename.as_bytes());
        out.extend(std::iter::repeat(0u8).take(extra_len as usize));
        out
    }

    #[test]
    fn parses_fixed_fields_and_filename() {
        let bytes = encode_lfh("0/0/0/0.glb", 8, 512, 1500, 0);
        let mut cur = Cursor::new(bytes);
        let lfh = parse_local_file_header(&mut cur, 0).unwrap();
        assert_eq!(lfh.filename, "0/0/0/0.glb");
        assert_eq!(lfh.compression_method, 8);
        assert_eq!(lfh.compressed_size, 512);
        assert_eq!(lfh.uncompressed_size, 1500);
        assert_eq!(lfh.payload_offset(), 30 + "0/0/0/0.glb".len() as u64);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut bytes = encode_lfh("x", 0, 1, 1, 0);
        bytes[0] = 0;
        let mut cur = Cursor::new(bytes);
        let err = parse_local_file_header(&mut cur, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedLocalFileHeader));
    }
}
