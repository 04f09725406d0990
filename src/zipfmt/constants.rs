//! Signatures and fixed sizes from the ZIP / ZIP64 specification used by
//! the 3TZ container.

pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const ZIP64_EXTRA_FIELD_TAG: u16 = 0x0001;

pub const LOCAL_FILE_HEADER_SIZE: u64 = 30;
pub const CENTRAL_DIRECTORY_ENTRY_FIXED_SIZE: usize = 46;
pub const EOCD_FIXED_SIZE: usize = 22;

/// How far back from end-of-file to start scanning for the trailing EOCD.
/// The 3TZ index entry is small and always last, so this comfortably covers
/// its CDE + LFH + filename + any short comment.
pub const EOCD_SCAN_WINDOW: u64 = 320;

pub const INDEX_ENTRY_NAME: &str = "@3dtilesIndex1@";
pub const INDEX_ENTRY_STRIDE: usize = 24;

/// Disallowed general-purpose bit flags for 3TZ member validation:
/// bit 0 (encrypted), bit 3 (sizes in data descriptor), bit 5 (patched
/// data), bit 13 (encrypted central directory).
pub const DISALLOWED_FLAG_BITS: u16 = (1 << 0) | (1 << 3) | (1 << 5) | (1 << 13);
