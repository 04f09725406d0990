//! Normalizes EXT_feature_metadata and EXT_structural_metadata into one
//! shape so the property decoder never has to branch on generation again
//! (see the design notes on preferring a normalization layer over a
//! decoder that re-branches per call).

use super::schema::{ClassProperty, EnumSchema};
use super::{Document, Mode};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Where a property's raw bytes live, named uniformly regardless of which
/// extension generation the document actually uses.
#[derive(Debug, Clone, Default)]
pub struct PropertyBufferViews {
    pub values: Option<usize>,
    pub string_offsets: Option<usize>,
    pub array_offsets: Option<usize>,
    pub offset_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PropertyRef {
    pub class_property: ClassProperty,
    pub buffer_views: PropertyBufferViews,
}

#[derive(Debug, Clone)]
pub struct PropertyTable {
    pub name: String,
    pub class_name: String,
    pub element_count: usize,
    pub properties: HashMap<String, PropertyRef>,
}

#[derive(Debug, Clone)]
pub struct PropertyTextureProperty {
    pub texture_index: u64,
    pub channels: Vec<u8>,
    pub class_property: ClassProperty,
}

#[derive(Debug, Clone)]
pub struct PropertyTexture {
    pub name: String,
    pub class_name: String,
    pub properties: HashMap<String, PropertyTextureProperty>,
}

/// The fully normalized metadata surface of a document: its classes,
/// enums, property tables and property textures.
pub struct Metadata {
    pub classes: HashMap<String, HashMap<String, ClassProperty>>,
    pub enums: HashMap<String, EnumSchema>,
    pub property_tables: Vec<PropertyTable>,
    pub property_textures: Vec<PropertyTexture>,
}

fn extension_root<'a>(doc: &'a Document, name: &str) -> Option<&'a Value> {
    doc.json.pointer(&format!("/extensions/{name}"))
}

impl Metadata {
    /// Builds the normalized metadata model from whichever extension
    /// generation the document declares. Returns an empty model for
    /// [`Mode::Unknown`].
    pub fn load(doc: &Document) -> Result<Self> {
        match doc.mode {
            Mode::Unknown => Ok(Metadata {
                classes: HashMap::new(),
                enums: HashMap::new(),
                property_tables: Vec::new(),
                property_textures: Vec::new(),
            }),
            Mode::ExtStructuralMetadata => Self::load_structural(doc),
            Mode::ExtFeatureMetadata => Self::load_feature(doc),
        }
    }

    fn load_structural(doc: &Document) -> Result<Self> {
        let root = extension_root(doc, "EXT_structural_metadata")
            .ok_or(Error::UnknownMetadataGeneration)?;
        let (classes, enums) = load_schema(root, false)?;

        let property_tables = load_tables_array(
            root,
            "propertyTables",
            &classes,
            TableFieldNames::structural(),
        )?;
        let property_textures = load_textures_array(
            root,
            "propertyTextures",
            &classes,
            TextureFieldNames::structural(),
        )?;

        Ok(Metadata {
            classes,
            enums,
            property_tables,
            property_textures,
        })
    }

    fn load_feature(doc: &Document) -> Result<Self> {
        let root =
            extension_root(doc, "EXT_feature_metadata").ok_or(Error::UnknownMetadataGeneration)?;
        let (classes, enums) = load_schema(root, true)?;

        let property_tables = load_tables_map(
            root,
            "featureTables",
            &classes,
            TableFieldNames::feature(),
        )?;
        let property_textures = load_textures_map(
            root,
            "featureTextures",
            &classes,
            TextureFieldNames::feature(),
        )?;

        Ok(Metadata {
            classes,
            enums,
            property_tables,
            property_textures,
        })
    }
}

fn load_schema(
    root: &Value,
    legacy_array_count_field: bool,
) -> Result<(
    HashMap<String, HashMap<String, ClassProperty>>,
    HashMap<String, EnumSchema>,
)> {
    let mut classes = HashMap::new();
    if let Some(class_map) = root.pointer("/schema/classes").and_then(Value::as_object) {
        for (class_name, class_def) in class_map {
            let mut properties = HashMap::new();
            if let Some(prop_map) = class_def.get("properties").and_then(Value::as_object) {
                for (prop_name, prop_def) in prop_map {
                    properties.insert(
                        prop_name.clone(),
                        ClassProperty::from_json(prop_def, legacy_array_count_field)?,
                    );
                }
            }
            classes.insert(class_name.clone(), properties);
        }
    }

    let mut enums = HashMap::new();
    if let Some(enum_map) = root.pointer("/schema/enums").and_then(Value::as_object) {
        for (enum_name, enum_def) in enum_map {
            enums.insert(enum_name.clone(), EnumSchema::from_json(enum_def)?);
        }
    }

    Ok((classes, enums))
}

struct TableFieldNames {
    values: &'static str,
    string_offsets: &'static str,
    array_offsets: &'static str,
}

impl TableFieldNames {
    fn structural() -> Self {
        Self {
            values: "values",
            string_offsets: "stringOffsets",
            array_offsets: "arrayOffsets",
        }
    }
    fn feature() -> Self {
        // EXT_feature_metadata reuses the string-offset buffer view field
        // name for array offsets too; there is no dedicated array-offsets
        // field in the old extension.
        Self {
            values: "bufferView",
            string_offsets: "stringOffsetBufferView",
            array_offsets: "stringOffsetBufferView",
        }
    }
}

fn buffer_views_from(prop_value: &Value, fields: &TableFieldNames) -> PropertyBufferViews {
    PropertyBufferViews {
        values: prop_value.get(fields.values).and_then(Value::as_u64).map(|v| v as usize),
        string_offsets: prop_value
            .get(fields.string_offsets)
            .and_then(Value::as_u64)
            .map(|v| v as usize),
        array_offsets: prop_value
            .get(fields.array_offsets)
            .and_then(Value::as_u64)
            .map(|v| v as usize),
        offset_type: prop_value
            .get("offsetType")
            .or_else(|| prop_value.get("stringOffsetType"))
            .or_else(|| prop_value.get("arrayOffsetType"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn load_tables_array(
    root: &Value,
    key: &str,
    classes: &HashMap<String, HashMap<String, ClassProperty>>,
    fields: TableFieldNames,
) -> Result<Vec<PropertyTable>> {
    let mut out = Vec::new();
    let Some(arr) = root.get(key).and_then(Value::as_array) else {
        return Ok(out);
    };
    for table_def in arr {
        let class_name = table_def
            .get("class")
            .and_then(Value::as_str)
            .ok_or(Error::UnknownMetadataGeneration)?
            .to_string();
        let name = table_def
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&class_name)
            .to_string();
        let element_count = table_def
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let class_properties = classes
            .get(&class_name)
            .ok_or_else(|| Error::ClassNotFound(class_name.clone()))?;
        let properties = build_property_refs(table_def, class_properties, &fields)?;
        out.push(PropertyTable {
            name,
            class_name,
            element_count,
            properties,
        });
    }
    Ok(out)
}

fn load_tables_map(
    root: &Value,
    key: &str,
    classes: &HashMap<String, HashMap<String, ClassProperty>>,
    fields: TableFieldNames,
) -> Result<Vec<PropertyTable>> {
    let mut out = Vec::new();
    let Some(obj) = root.get(key).and_then(Value::as_object) else {
        return Ok(out);
    };
    for (table_key, table_def) in obj {
        let class_name = table_def
            .get("class")
            .and_then(Value::as_str)
            .ok_or(Error::UnknownMetadataGeneration)?
            .to_string();
        let name = table_def
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(table_key)
            .to_string();
        let element_count = table_def
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let class_properties = classes
            .get(&class_name)
            .ok_or_else(|| Error::ClassNotFound(class_name.clone()))?;
        let properties = build_property_refs(table_def, class_properties, &fields)?;
        out.push(PropertyTable {
            name,
            class_name,
            element_count,
            properties,
        });
    }
    Ok(out)
}

fn build_property_refs(
    table_def: &Value,
    class_properties: &HashMap<String, ClassProperty>,
    fields: &TableFieldNames,
) -> Result<HashMap<String, PropertyRef>> {
    let mut out = HashMap::new();
    let Some(props) = table_def.get("properties").and_then(Value::as_object) else {
        return Ok(out);
    };
    for (prop_name, prop_value) in props {
        let class_property = class_properties
            .get(prop_name)
            .cloned()
            .ok_or_else(|| Error::PropertyNotFound(prop_name.clone(), String::new()))?;
        out.insert(
            prop_name.clone(),
            PropertyRef {
                class_property,
                buffer_views: buffer_views_from(prop_value, fields),
            },
        );
    }
    Ok(out)
}

struct TextureFieldNames {
    legacy_nested_index: bool,
}

impl TextureFieldNames {
    fn structural() -> Self {
        Self {
            legacy_nested_index: false,
        }
    }
    fn feature() -> Self {
        Self {
            legacy_nested_index: true,
        }
    }
}

fn texture_index_and_channels(prop_value: &Value, legacy: bool) -> Option<(u64, Vec<u8>)> {
    let index = if legacy {
        prop_value.pointer("/texture/index")?.as_u64()?
    } else {
        prop_value.get("index")?.as_u64()?
    };
    let channels = prop_value
        .get("channels")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_u64).map(|v| v as u8).collect())
        .unwrap_or_default();
    Some((index, channels))
}

fn load_textures_array(
    root: &Value,
    key: &str,
    classes: &HashMap<String, HashMap<String, ClassProperty>>,
    fields: TextureFieldNames,
) -> Result<Vec<PropertyTexture>> {
    let mut out = Vec::new();
    let Some(arr) = root.get(key).and_then(Value::as_array) else {
        return Ok(out);
    };
    for tex_def in arr {
        out.push(build_property_texture(tex_def, None, classes, &fields)?);
    }
    Ok(out)
}

fn load_textures_map(
    root: &Value,
    key: &str,
    classes: &HashMap<String, HashMap<String, ClassProperty>>,
    fields: TextureFieldNames,
) -> Result<Vec<PropertyTexture>> {
    let mut out = Vec::new();
    let Some(obj) = root.get(key).and_then(Value::as_object) else {
        return Ok(out);
    };
    for (tex_key, tex_def) in obj {
        out.push(build_property_texture(tex_def, Some(tex_key), classes, &fields)?);
    }
    Ok(out)
}

fn build_property_texture(
    tex_def: &Value,
    map_key: Option<&str>,
    classes: &HashMap<String, HashMap<String, ClassProperty>>,
    fields: &TextureFieldNames,
) -> Result<PropertyTexture> {
    let class_name = tex_def
        .get("class")
        .and_then(Value::as_str)
        .ok_or(Error::UnknownMetadataGeneration)?
        .to_string();
    let name = tex_def
        .get("name")
        .and_then(Value::as_str)
        .or(map_key)
        .unwrap_or(&class_name)
        .to_string();
    let class_properties = classes
        .get(&class_name)
        .ok_or_else(|| Error::ClassNotFound(class_name.clone()))?;

    let mut properties = HashMap::new();
    if let Some(props) = tex_def.get("properties").and_then(Value::as_object) {
        for (prop_name, prop_value) in props {
            let class_property = class_properties
                .get(prop_name)
                .cloned()
                .ok_or_else(|| Error::PropertyNotFound(prop_name.clone(), class_name.clone()))?;
            let (texture_index, channels) =
                texture_index_and_channels(prop_value, fields.legacy_nested_index)
                    .ok_or_else(|| Error::PropertyNotFound(prop_name.clone(), class_name.clone()))?;
            properties.insert(
                prop_name.clone(),
                PropertyTextureProperty {
                    texture_index,
                    channels,
                    class_property,
                },
            );
        }
    }

    Ok(PropertyTexture {
        name,
        class_name,
        properties,
    })
}
