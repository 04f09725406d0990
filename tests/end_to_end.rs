//! End-to-end coverage across the archive, framing and metadata layers:
//! build a tiny synthetic 3TZ archive in memory, fetch a GLB member out of
//! it, split its chunks, parse the glTF document, and decode a
//! EXT_structural_metadata property table.

use std::io::Write;
use tdtiles_core::archive::Archive;
use tdtiles_core::glb;
use tdtiles_core::gltf::decode::{decode_property, PropertyValue};
use tdtiles_core::gltf::metadata::Metadata;
use tdtiles_core::gltf::Document;
use tdtiles_core::hash::md5_halves;
use tdtiles_core::zipfmt::constants;

fn encode_lfh(filename: &str, method: u16, payload: &[u8], uncompressed_len: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&constants::LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&method.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&uncompressed_len.to_le_bytes());
    out.extend_from_slice(&(filename.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(filename.as_bytes());
    out.extend_from_slice(payload);
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

fn build_glb(json: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let json_bytes = json.as_bytes();
    let total_len = 12 + 8 + json_bytes.len();
    out.extend_from_slice(&glb::GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&glb::GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_len as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&glb::CHUNK_TYPE_JSON.to_le_bytes());
    out.extend_from_slice(json_bytes);
    out
}

#[test]
fn open_archive_fetch_glb_and_decode_structural_metadata() {
    // A property-values buffer for a "height" FLOAT32 scalar property with
    // 4 elements, matching the spec's worked example.
    let values: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect();
    let values_b64 = {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&values)
    };

    let json = serde_json::json!({
        "asset": {"version": "2.0"},
        "extensionsUsed": ["EXT_structural_metadata"],
        "buffers": [{"uri": format!("data:application/octet-stream;base64,{values_b64}"), "byteLength": values.len()}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": values.len()}],
        "extensions": {
            "EXT_structural_metadata": {
                "schema": {
                    "classes": {
                        "tile": {
                            "properties": {
                                "height": {"type": "SCALAR", "componentType": "FLOAT32", "offset": 10.0, "scale": 2.0}
                            }
                        }
                    }
                },
                "propertyTables": [
                    {"class": "tile", "count": 4, "properties": {"height": {"values": 0}}}
                ]
            }
        }
    });
    let glb_bytes = build_glb(&json.to_string());

    let member_name = "0/0/0/0.glb";
    let mut archive_bytes = Vec::new();
    let member_offset = archive_bytes.len() as u32;
    archive_bytes.extend(encode_lfh(member_name, 0, &glb_bytes, glb_bytes.len() as u32));

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
        glb_bytes.len() as u32,
        glb_bytes.len() as u32,
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

    let mut archive = Archive::open(tmp.path().to_str().unwrap()).unwrap();
    let fetched = archive.fetch_decoded(member_name).unwrap();
    assert!(glb::is_glb(&fetched));

    let mut doc = Document::load(&fetched, std::path::Path::new(".")).unwrap();
    doc.load_all_buffers().unwrap();

    let metadata = Metadata::load(&doc).unwrap();
    let table = &metadata.property_tables[0];
    assert_eq!(table.element_count, 4);

    let decoded = decode_property(&doc, &metadata, table, "height").unwrap();
    let values: Vec<f64> = decoded
        .into_iter()
        .map(|v| match v {
            PropertyValue::Numbers(n) => n[0],
            _ => panic!("expected numeric scalar"),
        })
        .collect();
    assert_eq!(values, vec![12.0, 14.0, 16.0, 18.0]);
}
