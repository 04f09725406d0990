//! MD5 halving used by the 3TZ index.
//!
//! The index compares paths by the MD5 digest of their UTF-8 bytes,
//! reinterpreted as two little-endian `u64` halves rather than as a raw
//! 16-byte digest, so ordering is plain unsigned integer comparison.

use md5::{Digest, Md5};

/// Computes `MD5(utf8_bytes)` and splits it into `(lo, hi)`, both read as
/// little-endian `u64`, `lo` being the first eight digest bytes.
pub fn md5_halves(utf8_bytes: &[u8]) -> (u64, u64) {
    let digest = Md5::digest(utf8_bytes);
    let lo = u64::from_le_bytes(digest[0..8].try_into().unwrap());
    let hi = u64::from_le_bytes(digest[8..16].try_into().unwrap());
    (lo, hi)
}
