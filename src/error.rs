//! Crate-wide error type.
//!
//! Every failure mode named by the archive, framing and metadata decoders is
//! a distinct variant here rather than a string. Call sites match on the
//! variant instead of parsing a message.

use std::string::FromUtf8Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("end of central directory record not found")]
    EocdNotFound,

    #[error("central directory entry is truncated or malformed")]
    MalformedCentralDirectoryEntry,

    #[error("local file header is truncated or malformed")]
    MalformedLocalFileHeader,

    #[error("zip64 extra field is malformed")]
    MalformedZip64ExtraField,

    #[error("zip entry uses disallowed general-purpose flag bits: {0:#06x}")]
    DisallowedZipFlags(u16),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompressionMethod(u16),

    #[error("zero-length compressed data for a non-empty file")]
    ZeroLengthCompressedData,

    #[error("decompressed output exceeded the declared bound ({declared} bytes)")]
    DecompressionBoundExceeded { declared: u64 },

    #[error("decompression backend failed: {0}")]
    DecompressionFailed(String),

    #[error("'{0}' was not found in the 3tz index")]
    EntryNotFound(String),

    #[error("archive has no 3tz index and is not a valid fallback zip: {0}")]
    NotA3tzArchive(String),

    #[error("index is malformed: {0}")]
    MalformedIndex(String),

    #[error("GLB magic mismatch: expected 0x46546c67, found {0:#010x}")]
    BadGlbMagic(u32),

    #[error("unsupported glTF binary version: {0}")]
    UnsupportedGlbVersion(u32),

    #[error("GLB is missing its JSON chunk")]
    MissingJsonChunk,

    #[error("GLB chunk type mismatch: expected {expected:#010x}, found {found:#010x}")]
    BadChunkType { expected: u32, found: u32 },

    #[error("subtree magic mismatch: expected 0x74627573, found {0:#010x}")]
    BadSubtreeMagic(u32),

    #[error("unsupported subtree version: {0}")]
    UnsupportedSubtreeVersion(u32),

    #[error("subtree binary chunk length does not match the declared byte length")]
    SubtreeLengthMismatch,

    #[error("unsupported glTF asset version: {0}")]
    UnsupportedGltfVersion(String),

    #[error("buffer {0} could not be resolved (no uri, no GLB bin chunk)")]
    UnresolvedBuffer(usize),

    #[error("malformed data URI")]
    MalformedDataUri,

    #[error("property table '{0}' was not found")]
    PropertyTableNotFound(String),

    #[error("property '{0}' was not found on class '{1}'")]
    PropertyNotFound(String, String),

    #[error("class '{0}' was not found")]
    ClassNotFound(String),

    #[error("enum '{0}' was not found")]
    EnumNotFound(String),

    #[error("enum value {0} has no matching name in enum '{1}'")]
    UnknownEnumValue(i64, String),

    #[error("bufferView {0} is out of range")]
    BufferViewOutOfRange(usize),

    #[error("property '{0}' has no '{1}' buffer view where one is required for its shape")]
    MissingBufferView(String, &'static str),

    #[error("property data buffer is too short: needed at least {needed} bytes, had {had}")]
    PropertyBufferTooShort { needed: usize, had: usize },

    #[error("unrecognized metadata extension generation")]
    UnknownMetadataGeneration,

    #[error("image buffer too short to sniff or measure")]
    ImageBufferTooShort,

    #[error("unrecognized image magic bytes")]
    UnrecognizedImageFormat,

    #[error("malformed PNG IHDR chunk")]
    MalformedPngHeader,

    #[error("malformed JPEG: no SOF0 marker found")]
    MalformedJpegHeader,

    #[error("sampling rectangle lies outside the image bounds")]
    SampleRectOutOfBounds,
}
