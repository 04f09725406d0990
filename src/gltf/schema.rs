//! Typed views over the glTF metadata-extension schema objects
//! (`classes`, `enums`, class properties). The document itself stays a
//! [`serde_json::Value`] (see [`super::Document`]); these types are
//! deserialized on demand from the relevant sub-objects, since the
//! surrounding extension JSON is otherwise an open-ended map callers index
//! into by name.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    String,
    Boolean,
    Enum,
    Array,
}

impl ValueType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "SCALAR" => ValueType::Scalar,
            "VEC2" => ValueType::Vec2,
            "VEC3" => ValueType::Vec3,
            "VEC4" => ValueType::Vec4,
            "MAT2" => ValueType::Mat2,
            "MAT3" => ValueType::Mat3,
            "MAT4" => ValueType::Mat4,
            "STRING" => ValueType::String,
            "BOOLEAN" => ValueType::Boolean,
            "ENUM" => ValueType::Enum,
            "ARRAY" => ValueType::Array,
            _ => return None,
        })
    }

    /// Number of scalar components this (non-array) type groups together.
    pub fn component_count(self) -> usize {
        match self {
            ValueType::Scalar => 1,
            ValueType::Vec2 => 2,
            ValueType::Vec3 => 3,
            ValueType::Vec4 => 4,
            ValueType::Mat2 => 4,
            ValueType::Mat3 => 9,
            ValueType::Mat4 => 16,
            ValueType::String | ValueType::Boolean | ValueType::Enum | ValueType::Array => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl ComponentType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "INT8" => ComponentType::Int8,
            "UINT8" => ComponentType::Uint8,
            "INT16" => ComponentType::Int16,
            "UINT16" => ComponentType::Uint16,
            "INT32" => ComponentType::Int32,
            "UINT32" => ComponentType::Uint32,
            "INT64" => ComponentType::Int64,
            "UINT64" => ComponentType::Uint64,
            "FLOAT32" => ComponentType::Float32,
            "FLOAT64" => ComponentType::Float64,
            _ => return None,
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::Int8 | ComponentType::Uint8 => 1,
            ComponentType::Int16 | ComponentType::Uint16 => 2,
            ComponentType::Int32 | ComponentType::Uint32 | ComponentType::Float32 => 4,
            ComponentType::Int64 | ComponentType::Uint64 | ComponentType::Float64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ComponentType::Int8
                | ComponentType::Int16
                | ComponentType::Int32
                | ComponentType::Int64
        )
    }
}

/// A single property definition under a metadata class, normalized across
/// both extension generations (see [`super::metadata`] for the generation
/// compatibility mapping of buffer-view field names).
#[derive(Debug, Clone)]
pub struct ClassProperty {
    pub value_type: ValueType,
    pub component_type: Option<ComponentType>,
    pub is_array: bool,
    /// Fixed array length; `None` means a dynamic (variable-length) array.
    pub array_count: Option<usize>,
    pub enum_type: Option<String>,
    pub normalized: bool,
    pub offset: Option<f64>,
    pub scale: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawClassProperty {
    #[serde(rename = "type")]
    type_: String,
    #[serde(rename = "componentType")]
    component_type: Option<String>,
    array: Option<bool>,
    count: Option<usize>,
    #[serde(rename = "componentCount")]
    component_count: Option<usize>,
    #[serde(rename = "enumType")]
    enum_type: Option<String>,
    normalized: Option<bool>,
    offset: Option<f64>,
    scale: Option<f64>,
}

impl ClassProperty {
    pub fn from_json(value: &serde_json::Value, legacy_array_count_field: bool) -> Result<Self> {
        let raw: RawClassProperty = serde_json::from_value(value.clone())?;
        let value_type = ValueType::parse(&raw.type_)
            .ok_or_else(|| Error::MalformedIndex(format!("unknown property type '{}'", raw.type_)))?;
        let component_type = raw.component_type.as_deref().and_then(ComponentType::parse);

        let is_array = raw.array.unwrap_or(false) || value_type == ValueType::Array;
        let array_count = if legacy_array_count_field {
            raw.component_count
        } else {
            raw.count
        };

        Ok(ClassProperty {
            value_type,
            component_type,
            is_array,
            array_count,
            enum_type: raw.enum_type,
            normalized: raw.normalized.unwrap_or(false),
            offset: raw.offset,
            scale: raw.scale,
        })
    }
}

/// `{ valueType, values: [(value, name)] }`. Default `valueType` is UINT16
/// when the schema omits it.
#[derive(Debug, Clone)]
pub struct EnumSchema {
    pub value_type: ComponentType,
    pub value_to_name: HashMap<i64, String>,
}

#[derive(Debug, Deserialize)]
struct RawEnumValue {
    name: String,
    value: i64,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    #[serde(rename = "valueType")]
    value_type: Option<String>,
    values: Vec<RawEnumValue>,
}

impl EnumSchema {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let raw: RawEnum = serde_json::from_value(value.clone())?;
        let value_type = raw
            .value_type
            .as_deref()
            .and_then(ComponentType::parse)
            .unwrap_or(ComponentType::Uint16);
        let value_to_name = raw.values.into_iter().map(|v| (v.value, v.name)).collect();
        Ok(EnumSchema {
            value_type,
            value_to_name,
        })
    }

    pub fn name_for(&self, value: i64) -> Option<&str> {
        self.value_to_name.get(&value).map(|s| s.as_str())
    }
}
