//! The external HTTP service contract (component J): described only at its
//! interface. No networking is implemented in this crate — an embedded
//! HTTP server is explicitly out of scope.

use crate::codec::CompressionMethod;

/// Bytes for a single fetched file plus enough information for an HTTP
/// layer to decide on `Content-Encoding`.
pub struct FetchedFile {
    pub compression_method: CompressionMethod,
    pub uncompressed_size: u64,
    /// Still-compressed bytes as stored in the archive; the caller decides
    /// whether to forward them verbatim (with a matching
    /// `Content-Encoding`) or decompress first.
    pub raw_bytes: Vec<u8>,
}

/// The seam an HTTP front-end implements against to serve files out of an
/// [`crate::archive::Archive`] (or any other backing store).
pub trait TileFetch {
    type Error;

    fn fetch(&mut self, inner_path: &str) -> Result<FetchedFile, Self::Error>;
}

/// The MAXAR_content_3tz token a tileset.json's `extensionsUsed` /
/// `extensionsRequired` lists are post-processed to strip before serving,
/// per the filesystem-collaborator rewrite rule.
pub const MAXAR_CONTENT_3TZ_EXTENSION: &str = "MAXAR_content_3tz";

/// Removes `MAXAR_CONTENT_3TZ_EXTENSION` from a tileset JSON's
/// `extensionsUsed` / `extensionsRequired` arrays, preserving everything
/// else, the way the filesystem collaborator is expected to before serving
/// an embedded-3tz tileset.
pub fn strip_3tz_extension_token(tileset_json: &mut serde_json::Value) {
    for key in ["extensionsUsed", "extensionsRequired"] {
        if let Some(arr) = tileset_json.get_mut(key).and_then(serde_json::Value::as_array_mut) {
            arr.retain(|v| v.as_str() != Some(MAXAR_CONTENT_3TZ_EXTENSION));
        }
    }
}
