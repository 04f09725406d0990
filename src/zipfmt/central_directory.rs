//! End-of-Central-Directory and Central Directory Entry parsing.

use super::constants::{
    CENTRAL_DIRECTORY_ENTRY_FIXED_SIZE, CENTRAL_DIRECTORY_SIGNATURE, EOCD_SCAN_WINDOW,
    EOCD_SIGNATURE, ZIP64_EXTRA_FIELD_TAG,
};
use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub general_purpose_flags: u16,
    pub compression_method: u16,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename: String,
    pub extra_field: Vec<u8>,
    /// The raw 32-bit field; `0xFFFFFFFF` means "see ZIP64 extra field".
    pub relative_offset_of_local_header: u32,
}

impl CentralDirectoryEntry {
    /// Resolves the true local-header offset, walking the ZIP64 extra field
    /// when the 32-bit field is the ZIP64 sentinel.
    pub fn resolve_local_header_offset(&self) -> Result<u64> {
        if self.relative_offset_of_local_header != 0xFFFF_FFFF {
            return Ok(self.relative_offset_of_local_header as u64);
        }
        let mut i = 0usize;
        while i + 4 <= self.extra_field.len() {
            let tag = u16::from_le_bytes(self.extra_field[i..i + 2].try_into().unwrap());
            let size = u16::from_le_bytes(self.extra_field[i + 2..i + 4].try_into().unwrap())
                as usize;
            let payload_start = i + 4;
            let payload_end = payload_start
                .checked_add(size)
                .ok_or(Error::MalformedZip64ExtraField)?;
            if payload_end > self.extra_field.len() {
                return Err(Error::MalformedZip64ExtraField);
            }
            if tag == ZIP64_EXTRA_FIELD_TAG && size == 8 {
                let offset = u64::from_le_bytes(
                    self.extra_field[payload_start..payload_end]
                        .try_into()
                        .unwrap(),
                );
                return Ok(offset);
            }
            i = payload_end;
        }
        Err(Error::MalformedZip64ExtraField)
    }
}

/// Parses a fixed-size Central Directory Entry starting at the current
/// reader position, which must already sit on its signature.
pub fn parse_central_directory_entry<R: Read>(reader: &mut R) -> Result<CentralDirectoryEntry> {
    let mut fixed = [0u8; CENTRAL_DIRECTORY_ENTRY_FIXED_SIZE];
    reader.read_exact(&mut fixed)?;

    let signature = u32::from_le_bytes(fixed[0..4].try_into().unwrap());
    if signature != CENTRAL_DIRECTORY_SIGNATURE {
        return Err(Error::MalformedCentralDirectoryEntry);
    }

    let general_purpose_flags = u16::from_le_bytes(fixed[8..10].try_into().unwrap());
    let compression_method = u16::from_le_bytes(fixed[10..12].try_into().unwrap());
    let compressed_size = u32::from_le_bytes(fixed[20..24].try_into().unwrap());
    let uncompressed_size = u32::from_le_bytes(fixed[24..28].try_into().unwrap());
    let filename_length = u16::from_le_bytes(fixed[28..30].try_into().unwrap()) as usize;
    let extra_field_length = u16::from_le_bytes(fixed[30..32].try_into().unwrap()) as usize;
    let file_comment_length = u16::from_le_bytes(fixed[32..34].try_into().unwrap()) as usize;
    let relative_offset_of_local_header = u32::from_le_bytes(fixed[42..46].try_into().unwrap());

    let mut filename_buf = vec![0u8; filename_length];
    reader.read_exact(&mut filename_buf)?;
    let filename = String::from_utf8(filename_buf)?;

    let mut extra_field = vec![0u8; extra_field_length];
    reader.read_exact(&mut extra_field)?;

    let mut comment = vec![0u8; file_comment_length];
    reader.read_exact(&mut comment)?;

    Ok(CentralDirectoryEntry {
        general_purpose_flags,
        compression_method,
        compressed_size,
        uncompressed_size,
        filename,
        extra_field,
        relative_offset_of_local_header,
    })
}

/// Finds the archive's trailing Central Directory Entry: seeks to
/// `file_size - EOCD_SCAN_WINDOW` (or the start of the file if shorter),
/// reads to the end, locates the last EOCD signature, then the last CD
/// signature preceding it, and parses that entry.
///
/// The 3TZ index is always stored as the final archive member, so its CDE
/// is always the last one before the EOCD record.
pub fn read_trailing_central_directory_entry<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
) -> Result<CentralDirectoryEntry> {
    let window_start = file_size.saturating_sub(EOCD_SCAN_WINDOW);
    reader.seek(SeekFrom::Start(window_start))?;

    let mut tail = Vec::with_capacity((file_size - window_start) as usize);
    reader.read_to_end(&mut tail)?;

    let eocd_sig_bytes = EOCD_SIGNATURE.to_le_bytes();
    let eocd_pos_in_tail = tail
        .windows(4)
        .rposition(|w| w == eocd_sig_bytes)
        .ok_or(Error::EocdNotFound)?;

    let cd_sig_bytes = CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes();
    let cd_pos_in_tail = tail[..eocd_pos_in_tail]
        .windows(4)
        .rposition(|w| w == cd_sig_bytes)
        .ok_or(Error::EocdNotFound)?;

    reader.seek(SeekFrom::Start(window_start + cd_pos_in_tail as u64))?;
    parse_central_directory_entry(reader)
}
