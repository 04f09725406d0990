//! Constrained ZIP/ZIP64 parsing for 3TZ containers.
//!
//! 3TZ deliberately supports only the subset of ZIP the source format
//! needs: Store/Deflate/Zstd payloads, an optional per-entry ZIP64 extra
//! field, and no data descriptors, encryption, or split archives.

pub mod central_directory;
pub mod constants;
pub mod index;
pub mod local_header;

pub use central_directory::{parse_central_directory_entry, read_trailing_central_directory_entry, CentralDirectoryEntry};
pub use index::{build_index, Index};
pub use local_header::{parse_local_file_header, LocalFileHeader};

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};

/// Reads a member's raw (still-compressed, if applicable) payload bytes,
/// given its local file header. Does NOT decompress.
pub fn read_payload<R: Read + Seek>(reader: &mut R, lfh: &LocalFileHeader) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(lfh.payload_offset()))?;
    let mut buf = vec![0u8; lfh.compressed_size as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parses a header's general-purpose validation for 3TZ admissibility,
/// surfacing the specific forbidden feature instead of a generic reject.
pub fn check_zip_flags(general_purpose_flags: u16) -> Result<()> {
    if general_purpose_flags & constants::DISALLOWED_FLAG_BITS != 0 {
        return Err(Error::DisallowedZipFlags(general_purpose_flags));
    }
    Ok(())
}
