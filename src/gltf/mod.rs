//! glTF 2.0 document loading: GLB/JSON detection, buffer resolution, and
//! the two metadata-extension generations this crate must normalize.

pub mod decode;
pub mod image;
pub mod metadata;
pub mod schema;

use crate::error::{Error, Result};
use crate::glb;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Which metadata extension generation a document uses, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unknown,
    ExtFeatureMetadata,
    ExtStructuralMetadata,
}

#[derive(Debug)]
pub struct Document {
    pub json: Value,
    pub buffers: Vec<Option<Vec<u8>>>,
    pub mode: Mode,
    base_dir: PathBuf,
}

fn data_uri_regex() -> Regex {
    Regex::new(r"^data:[^;]*;base64,(.*)$").unwrap()
}

fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    let captures = data_uri_regex()
        .captures(uri)
        .ok_or(Error::MalformedDataUri)?;
    let encoded = captures.get(1).ok_or(Error::MalformedDataUri)?.as_str();
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| Error::MalformedDataUri)
}

impl Document {
    /// Loads a document from raw bytes, auto-detecting GLB framing; `base_dir`
    /// is used to resolve buffer `uri` fields that are plain file paths.
    pub fn load(bytes: &[u8], base_dir: &Path) -> Result<Self> {
        let (json_text, glb_bin) = if glb::is_glb(bytes) {
            let chunks = glb::read_glb_chunks(bytes)?;
            (chunks.json, chunks.bin)
        } else {
            (String::from_utf8(bytes.to_vec())?, None)
        };

        let json: Value = serde_json::from_str(&json_text)?;

        let version = json
            .pointer("/asset/version")
            .and_then(Value::as_str)
            .unwrap_or("");
        if version != "2.0" {
            return Err(Error::UnsupportedGltfVersion(version.to_string()));
        }

        let mode = detect_mode(&json);

        let buffer_count = json
            .get("buffers")
            .and_then(Value::as_array)
            .map(|a| a.len())
            .unwrap_or(0);
        let mut buffers: Vec<Option<Vec<u8>>> = vec![None; buffer_count];
        if buffer_count > 0 {
            buffers[0] = glb_bin;
        }

        Ok(Document {
            json,
            buffers,
            mode,
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Resolves every declared buffer's bytes: embedded base64 data URIs are
    /// decoded, external `uri`s are read relative to `base_dir`, and a
    /// buffer with no `uri` is assumed to already be populated (the GLB BIN
    /// chunk at index 0).
    pub fn load_all_buffers(&mut self) -> Result<()> {
        let Some(declared) = self.json.get("buffers").and_then(Value::as_array).cloned() else {
            return Ok(());
        };
        for (i, buffer_def) in declared.iter().enumerate() {
            if self.buffers[i].is_some() {
                continue;
            }
            match buffer_def.get("uri").and_then(Value::as_str) {
                Some(uri) if is_data_uri(uri) => {
                    self.buffers[i] = Some(decode_data_uri(uri)?);
                }
                Some(uri) => {
                    let path = self.base_dir.join(uri);
                    debug!("reading external glTF buffer from {}", path.display());
                    self.buffers[i] = Some(std::fs::read(path)?);
                }
                None => {
                    return Err(Error::UnresolvedBuffer(i));
                }
            }
        }
        Ok(())
    }

    /// Resolves a buffer-view's bytes: `buffers[view.buffer]` sliced at
    /// `[byteOffset, byteOffset + byteLength)`.
    pub fn read_buffer_view(&self, buffer_view_index: usize) -> Result<&[u8]> {
        let view = self
            .json
            .pointer("/bufferViews")
            .and_then(Value::as_array)
            .and_then(|views| views.get(buffer_view_index))
            .ok_or(Error::BufferViewOutOfRange(buffer_view_index))?;

        let buffer_index = view
            .get("buffer")
            .and_then(Value::as_u64)
            .ok_or(Error::BufferViewOutOfRange(buffer_view_index))? as usize;
        let byte_offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let byte_length = view
            .get("byteLength")
            .and_then(Value::as_u64)
            .ok_or(Error::BufferViewOutOfRange(buffer_view_index))? as usize;

        let buffer = self
            .buffers
            .get(buffer_index)
            .and_then(Option::as_ref)
            .ok_or(Error::UnresolvedBuffer(buffer_index))?;

        let end = byte_offset
            .checked_add(byte_length)
            .ok_or(Error::BufferViewOutOfRange(buffer_view_index))?;
        buffer
            .get(byte_offset..end)
            .ok_or(Error::BufferViewOutOfRange(buffer_view_index))
    }
}

fn detect_mode(json: &Value) -> Mode {
    let used = json
        .get("extensionsUsed")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if used.contains(&"EXT_structural_metadata") {
        Mode::ExtStructuralMetadata
    } else if used.contains(&"EXT_feature_metadata") {
        Mode::ExtFeatureMetadata
    } else {
        warn!("document declares neither metadata extension generation");
        Mode::Unknown
    }
}
