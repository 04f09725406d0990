//! 3TZ archive reader: composes the ZIP parser and index into a
//! file-handle service.
//!
//! This mirrors the teacher's auto-detecting `Body`/`BodyFormat` pattern:
//! an [`Archive`] tries to read a trailing 3TZ index first and falls back
//! to synthesizing one from a plain ZIP central directory.

use crate::codec::{self, CompressionMethod};
use crate::error::{Error, Result};
use crate::zipfmt::{
    self, constants, parse_local_file_header, read_trailing_central_directory_entry,
    CentralDirectoryEntry, Index, LocalFileHeader,
};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// An open 3TZ (or plain-ZIP, index built on the fly) archive.
///
/// Single-owner and stateful, like the teacher's format readers: concurrent
/// access requires independent handles (via [`Archive::try_clone`]), not a
/// shared instance.
pub struct Archive {
    file: File,
    file_size: u64,
    index: Index,
}

/// The raw (possibly still compressed) bytes of an archive member, plus
/// enough metadata for a caller to decide whether to decompress or to
/// forward the payload verbatim (see the HTTP service contract).
pub struct RawFetch {
    pub compression_method: u16,
    pub uncompressed_size: u64,
    pub bytes: Vec<u8>,
}

impl Archive {
    /// Opens `path`. Reads the trailing Central Directory Entry; if its
    /// filename is the 3TZ index sentinel, ingests the index blob.
    /// Otherwise falls back to [`zipfmt::build_index`] over the plain ZIP.
    pub fn open(path: &str) -> Result<Self> {
        let mut file = File::open(Path::new(path))?;
        let file_size = file.metadata()?.len();

        match read_trailing_central_directory_entry(&mut file, file_size) {
            Ok(cde) if cde.filename == constants::INDEX_ENTRY_NAME => {
                debug!("found 3tz index entry in {path}");
                let index = Self::load_index_from_cde(&mut file, &cde)?;
                Ok(Self {
                    file,
                    file_size,
                    index,
                })
            }
            _ => {
                info!("{path} has no 3tz index; synthesizing one from its central directory");
                file.seek(SeekFrom::Start(0))?;
                let blob = zipfmt::build_index(&mut file)?;
                let index = Index::from_blob(blob)?;
                Ok(Self {
                    file,
                    file_size,
                    index,
                })
            }
        }
    }

    fn load_index_from_cde(file: &mut File, cde: &CentralDirectoryEntry) -> Result<Index> {
        zipfmt::check_zip_flags(cde.general_purpose_flags)?;
        let offset = cde.resolve_local_header_offset()?;
        let lfh = parse_local_file_header(file, offset)?;
        if lfh.filename != constants::INDEX_ENTRY_NAME {
            return Err(Error::MalformedIndex(
                "central directory and local header disagree on index filename".into(),
            ));
        }
        let blob = zipfmt::read_payload(file, &lfh)?;
        Index::from_blob(blob)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Looks up `inner_path`, reads its local file header, and verifies the
    /// header's own filename matches the request (a mismatch means the
    /// index and the archive have drifted apart).
    fn resolve(&mut self, inner_path: &str) -> Result<LocalFileHeader> {
        let offset = self
            .index
            .lookup(inner_path)
            .ok_or_else(|| Error::EntryNotFound(inner_path.to_string()))?;
        if offset >= self.file_size.saturating_sub(constants::LOCAL_FILE_HEADER_SIZE) {
            return Err(Error::MalformedIndex(format!(
                "index offset {offset} for '{inner_path}' is outside the archive"
            )));
        }
        let lfh = parse_local_file_header(&mut self.file, offset)?;
        if lfh.filename != inner_path {
            warn!(
                "index misaligned: looked up '{inner_path}', local header says '{}'",
                lfh.filename
            );
            return Err(Error::EntryNotFound(inner_path.to_string()));
        }
        Ok(lfh)
    }

    /// Returns the member's raw (still compressed, if applicable) bytes.
    pub fn fetch_raw(&mut self, inner_path: &str) -> Result<RawFetch> {
        let lfh = self.resolve(inner_path)?;
        let bytes = zipfmt::read_payload(&mut self.file, &lfh)?;
        Ok(RawFetch {
            compression_method: lfh.compression_method,
            uncompressed_size: lfh.uncompressed_size as u64,
            bytes,
        })
    }

    /// Returns the member's bytes, decompressed.
    pub fn fetch_decoded(&mut self, inner_path: &str) -> Result<Vec<u8>> {
        let raw = self.fetch_raw(inner_path)?;
        let method = CompressionMethod::try_from(raw.compression_method)?;
        codec::decompress(method, raw.uncompressed_size, &raw.bytes)
    }

    /// Iterates archive members in index order, yielding `(filename, LFH)`
    /// for bulk scans.
    pub fn iter(&mut self) -> Result<Vec<(String, LocalFileHeader)>> {
        let mut out = Vec::with_capacity(self.index.len());
        for i in 0..self.index.len() {
            let (_, _, offset) = self.index.entry(i);
            let lfh = parse_local_file_header(&mut self.file, offset)?;
            out.push((lfh.filename.clone(), lfh));
        }
        Ok(out)
    }

    /// Duplicates the underlying file handle so a caller can use an
    /// independent, concurrently-seekable reader over the same archive.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            file_size: self.file_size,
            index: Index::from_blob(self.index.to_blob())?,
        })
    }
}

impl Read for Archive {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for Archive {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::md5_halves;
    use std::io::Write;

    fn encode_lfh(filename: &str, method: u16, comp: &[u8], uncomp_len: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&constants::LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(comp.len() as u32).to_le_bytes());
        out.extend_from_slice(&uncomp_len.to_le_bytes());
        out.extend_from_slice(&(filename.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(filename.as_bytes());
        out.extend_from_slice(comp);
        out
    }

    fn encode_cde(filename: &str, method: u16, comp_len: u32, uncomp_len: u32, offset: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&constants::CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&comp_len.to_le_bytes());
        out.extend_from_slice(&uncomp_len.to_le_bytes());
        out.extend_from_slice(&(filename.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(filename.as_bytes());
        out
    }

    #[test]
    fn opens_archive_with_explicit_index_and_fetches_a_member() {
        let member_name = "0/0/0/0.glb";
        let payload = b"hello glb payload!!!".to_vec();

        let mut archive_bytes = Vec::new();
        let member_offset = archive_bytes.len() as u32;
        archive_bytes.extend(encode_lfh(member_name, 0, &payload, payload.len() as u32));

        let (lo, hi) = md5_halves(member_name.as_bytes());
        let mut index_blob = Vec::new();
        index_blob.extend_from_slice(&lo.to_le_bytes());
        index_blob.extend_from_slice(&hi.to_le_bytes());
        index_blob.extend_from_slice(&(member_offset as u64).to_le_bytes());

        let index_offset = archive_bytes.len() as u32;
        archive_bytes.extend(encode_lfh(
            constants::INDEX_ENTRY_NAME,
            0,
            &index_blob,
            index_blob.len() as u32,
        ));

        let cd_start = archive_bytes.len() as u32;
        archive_bytes.extend(encode_cde(
            member_name,
            0,
            payload.len() as u32,
            payload.len() as u32,
            member_offset,
        ));
        archive_bytes.extend(encode_cde(
            constants::INDEX_ENTRY_NAME,
            0,
            index_blob.len() as u32,
            index_blob.len() as u32,
            index_offset,
        ));
        let cd_size = archive_bytes.len() as u32 - cd_start;

        let mut eocd = Vec::new();
        eocd.extend_from_slice(&constants::EOCD_SIGNATURE.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes());
        eocd.extend_from_slice(&2u16.to_le_bytes());
        eocd.extend_from_slice(&2u16.to_le_bytes());
        eocd.extend_from_slice(&cd_size.to_le_bytes());
        eocd.extend_from_slice(&cd_start.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes());
        archive_bytes.extend(eocd);

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&archive_bytes).unwrap();
        let path = tmp.path().to_str().unwrap().to_string();

        let mut archive = Archive::open(&path).unwrap();
        assert_eq!(archive.len(), 1);

        let fetched = archive.fetch_decoded(member_name).unwrap();
        assert_eq!(fetched, payload);

        let err = archive.fetch_decoded("does/not/exist").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }
}
