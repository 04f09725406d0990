//! The 3TZ MD5 index: a flat, sorted, fixed-stride blob enabling O(log N)
//! path lookups without copying the blob into a dynamic container.

use super::constants::{DISALLOWED_FLAG_BITS, INDEX_ENTRY_NAME, INDEX_ENTRY_STRIDE};
use crate::error::{Error, Result};
use crate::hash::md5_halves;
use std::io::Read;

/// A borrowed view over an index blob: `N` 24-byte entries, each
/// `(md5_lo: u64 LE, md5_hi: u64 LE, offset: u64 LE)`, sorted ascending.
#[derive(Debug)]
pub struct Index {
    blob: Vec<u8>,
}

impl Index {
    /// Wraps a raw index blob with no copying beyond taking ownership of the
    /// buffer the caller already read.
    pub fn from_blob(blob: Vec<u8>) -> Result<Self> {
        if blob.len() % INDEX_ENTRY_STRIDE != 0 {
            return Err(Error::MalformedIndex(format!(
                "index blob length {} is not a multiple of {}",
                blob.len(),
                INDEX_ENTRY_STRIDE
            )));
        }
        Ok(Self { blob })
    }

    pub fn len(&self) -> usize {
        self.blob.len() / INDEX_ENTRY_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }

    /// Returns a copy of the raw backing blob, e.g. to rebuild an
    /// independent [`Index`] view for a cloned reader.
    pub fn to_blob(&self) -> Vec<u8> {
        self.blob.clone()
    }

    /// Returns `(lo, hi, offset)` for entry `i`.
    pub fn entry(&self, i: usize) -> (u64, u64, u64) {
        let base = i * INDEX_ENTRY_STRIDE;
        let lo = u64::from_le_bytes(self.blob[base..base + 8].try_into().unwrap());
        let hi = u64::from_le_bytes(self.blob[base + 8..base + 16].try_into().unwrap());
        let offset = u64::from_le_bytes(self.blob[base + 16..base + 24].try_into().unwrap());
        (lo, hi, offset)
    }

    /// Binary searches for `filepath`'s MD5 halves, `lo` primary key, `hi`
    /// tiebreak, both compared as unsigned integers.
    pub fn lookup(&self, filepath: &str) -> Option<u64> {
        let (target_lo, target_hi) = md5_halves(filepath.as_bytes());
        let mut low = 0isize;
        let mut high = self.len() as isize - 1;
        while low <= high {
            let mid = low + (high - low) / 2;
            let (lo, hi, offset) = self.entry(mid as usize);
            match (lo, hi).cmp(&(target_lo, target_hi)) {
                std::cmp::Ordering::Equal => return Some(offset),
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid - 1,
            }
        }
        None
    }
}

/// Validates a plain-ZIP central directory entry against the 3TZ member
/// rules before it is admitted into a synthesized index.
pub fn is_entry_admissible(general_purpose_flags: u16, compression_method: u16, compressed_size: u64, uncompressed_size: u64) -> bool {
    if general_purpose_flags & DISALLOWED_FLAG_BITS != 0 {
        return false;
    }
    if !matches!(compression_method, 0 | 8 | 93) {
        return false;
    }
    if compressed_size == 0 && uncompressed_size != 0 {
        return false;
    }
    true
}

/// Builds a 3TZ index blob from a plain ZIP file by walking its central
/// directory with the `zip` crate, filtering directories and any existing
/// index member, validating each entry, and packing `(lo, hi, offset)`
/// triples sorted ascending.
pub fn build_index<R: Read + std::io::Seek>(reader: R) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| Error::NotA3tzArchive(e.to_string()))?;

    let mut entries: Vec<(u64, u64, u64)> = Vec::new();
    for i in 0..archive.len() {
        let file = archive
            .by_index_raw(i)
            .map_err(|e| Error::NotA3tzArchive(e.to_string()))?;

        let name = file.name().to_string();
        if file.is_dir() || name == INDEX_ENTRY_NAME {
            continue;
        }

        // The `zip` crate's safe API does not expose the raw general-purpose
        // flag word; it already refuses to open entries using most of the
        // disallowed features (encryption, split archives) during
        // `by_index_raw`, so the only bit worth re-checking here is
        // "encrypted", which it does expose directly.
        let flags: u16 = if file.encrypted() { 0b1 } else { 0 };
        let compression_method: u16 = match file.compression() {
            zip::CompressionMethod::Stored => 0,
            zip::CompressionMethod::Deflated => 8,
            zip::CompressionMethod::Zstd => 93,
            _ => continue,
        };
        let compressed_size = file.compressed_size();
        let uncompressed_size = file.size();

        if !is_entry_admissible(flags, compression_method, compressed_size, uncompressed_size) {
            continue;
        }

        let (lo, hi) = md5_halves(name.as_bytes());
        entries.push((lo, hi, file.header_start()));
    }

    entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut blob = Vec::with_capacity(entries.len() * INDEX_ENTRY_STRIDE);
    for (lo, hi, offset) in entries {
        blob.extend_from_slice(&lo.to_le_bytes());
        blob.extend_from_slice(&hi.to_le_bytes());
        blob.extend_from_slice(&offset.to_le_bytes());
    }
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blob(entries: &[(u64, u64, u64)]) -> Vec<u8> {
        let mut blob = Vec::new();
        for (lo, hi, offset) in entries {
            blob.extend_from_slice(&lo.to_le_bytes());
            blob.extend_from_slice(&hi.to_le_bytes());
            blob.extend_from_slice(&offset.to_le_bytes());
        }
        blob
    }

    #[test]
    fn rejects_blob_with_bad_stride() {
        let err = Index::from_blob(vec![0u8; 23]).unwrap_err();
        assert!(matches!(err, Error::MalformedIndex(_)));
    }

    #[test]
    fn single_entry_index_converges() {
        let (lo, hi) = md5_halves(b"only.glb");
        let blob = make_blob(&[(lo, hi, 42)]);
        let index = Index::from_blob(blob).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("only.glb"), Some(42));
        assert_eq!(index.lookup("missing.glb"), None);
    }

    #[test]
    fn binary_search_over_many_entries() {
        let names: Vec<String> = (0..64).map(|i| format!("tile_{i}.glb")).collect();
        let mut entries: Vec<(u64, u64, u64)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let (lo, hi) = md5_halves(n.as_bytes());
                (lo, hi, i as u64 * 100)
            })
            .collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        let blob = make_blob(&entries);
        let index = Index::from_blob(blob).unwrap();

        for (i, n) in names.iter().enumerate() {
            let expected = entries
                .iter()
                .find(|(lo, hi, _)| (*lo, *hi) == md5_halves(n.as_bytes()))
                .map(|(_, _, off)| *off);
            assert_eq!(index.lookup(n), expected);
            let _ = i;
        }
    }

    #[test]
    fn admissibility_rejects_forbidden_flags_and_methods() {
        assert!(!is_entry_admissible(0b1, 0, 10, 10));
        assert!(!is_entry_admissible(0, 12, 10, 10));
        assert!(!is_entry_admissible(0, 0, 0, 10));
        assert!(is_entry_admissible(0, 8, 10, 20));
    }
}
