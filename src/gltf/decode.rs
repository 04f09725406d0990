//! The property decoder: turns a normalized [`PropertyTable`] + property
//! name into a sequence of decoded values, one per table element.
//!
//! Because [`super::metadata`] already normalized both extension
//! generations into one buffer-view naming scheme, this module never
//! branches on generation — only on the property's declared shape
//! (scalar/vector/matrix/boolean/enum/string, fixed or dynamic array).

use super::schema::{ClassProperty, ComponentType, ValueType};
use super::{metadata::Metadata, metadata::PropertyRef, metadata::PropertyTable, Document};
use crate::error::{Error, Result};

/// A single decoded property value. Numeric scalars, vectors and matrices
/// all decode to [`PropertyValue::Numbers`] (length 1 for scalars);
/// booleans, enums and strings get their own variants since normalize /
/// offset / scale never applies to them.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Numbers(Vec<f64>),
    Bool(bool),
    EnumName(String),
    Text(String),
    Array(Vec<PropertyValue>),
}

/// Decodes every element of `property_name` in `table`.
///
/// # Errors
///
/// [`Error::PropertyNotFound`] if the table has no such property,
/// [`Error::BufferViewOutOfRange`] for any out-of-bounds buffer access, and
/// [`Error::UnknownEnumValue`] if an enum's raw value has no matching name.
pub fn decode_property(
    doc: &Document,
    metadata: &Metadata,
    table: &PropertyTable,
    property_name: &str,
) -> Result<Vec<PropertyValue>> {
    let prop_ref = table
        .properties
        .get(property_name)
        .ok_or_else(|| Error::PropertyNotFound(property_name.to_string(), table.class_name.clone()))?;

    let count = table.element_count;
    if count == 0 {
        return Ok(Vec::new());
    }

    let cp = &prop_ref.class_property;

    if cp.is_array {
        match cp.array_count {
            Some(fixed) => decode_fixed_array(doc, metadata, prop_ref, cp, count, fixed),
            None => decode_dynamic_array(doc, metadata, prop_ref, cp, count),
        }
    } else {
        decode_scalar_like(doc, metadata, prop_ref, cp, count)
    }
}

fn offset_type_byte_size(offset_type: Option<&str>) -> ComponentType {
    offset_type
        .and_then(ComponentType::parse)
        .unwrap_or(ComponentType::Uint32)
}

fn read_values_buffer<'a>(doc: &'a Document, prop_ref: &PropertyRef) -> Result<&'a [u8]> {
    let view = prop_ref
        .buffer_views
        .values
        .ok_or_else(|| Error::MissingBufferView(String::new(), "values"))?;
    doc.read_buffer_view(view)
}

/// Reads a single raw numeric component at byte `offset` and returns it as
/// `f64`, preserving sign for signed integer types.
fn read_component(data: &[u8], offset: usize, ct: ComponentType) -> Result<f64> {
    let size = ct.byte_size();
    let slice = data
        .get(offset..offset + size)
        .ok_or(Error::PropertyBufferTooShort {
            needed: offset + size,
            had: data.len(),
        })?;
    Ok(match ct {
        ComponentType::Int8 => i8::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Uint8 => slice[0] as f64,
        ComponentType::Int16 => i16::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Uint16 => u16::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Int32 => i32::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Uint32 => u32::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Int64 => i64::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Uint64 => u64::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Float32 => f32::from_le_bytes(slice.try_into().unwrap()) as f64,
        ComponentType::Float64 => f64::from_le_bytes(slice.try_into().unwrap()),
    })
}

fn read_offset_at(data: &[u8], index: usize, offset_type: ComponentType) -> Result<u64> {
    let size = offset_type.byte_size();
    let start = index * size;
    let slice = data
        .get(start..start + size)
        .ok_or(Error::PropertyBufferTooShort {
            needed: start + size,
            had: data.len(),
        })?;
    Ok(match offset_type {
        ComponentType::Uint8 => slice[0] as u64,
        ComponentType::Uint16 => u16::from_le_bytes(slice.try_into().unwrap()) as u64,
        ComponentType::Uint32 => u32::from_le_bytes(slice.try_into().unwrap()) as u64,
        ComponentType::Uint64 => u64::from_le_bytes(slice.try_into().unwrap()),
        _ => return Err(Error::MalformedIndex("unsigned offset type required".into())),
    })
}

/// Maps a raw integer component to `[0,1]` (unsigned) or `[-1,1]` (signed)
/// by dividing by the type's max representable magnitude.
fn denormalize(ct: ComponentType, raw: f64) -> Result<f64> {
    Ok(match ct {
        ComponentType::Uint8 => raw / 255.0,
        ComponentType::Int8 => (raw / 127.0).max(-1.0),
        ComponentType::Uint16 => raw / 65535.0,
        ComponentType::Int16 => (raw / 32767.0).max(-1.0),
        ComponentType::Uint32 => raw / 4294967295.0,
        ComponentType::Int32 => (raw / 2147483647.0).max(-1.0),
        ComponentType::Uint64 => raw / 18446744073709551615.0,
        ComponentType::Int64 => (raw / 9223372036854775807.0).max(-1.0),
        ComponentType::Float32 | ComponentType::Float64 => {
            return Err(Error::MalformedIndex(
                "normalized flag set on a floating-point componentType".into(),
            ))
        }
    })
}

fn apply_transform(cp: &ClassProperty, ct: ComponentType, raw: f64) -> Result<f64> {
    let value = if cp.normalized {
        denormalize(ct, raw)?
    } else {
        raw
    };
    let offset = cp.offset.unwrap_or(0.0);
    let scale = cp.scale.unwrap_or(1.0);
    Ok(offset + scale * value)
}

fn decode_scalar_like(
    doc: &Document,
    metadata: &Metadata,
    prop_ref: &PropertyRef,
    cp: &ClassProperty,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    match cp.value_type {
        ValueType::Boolean => decode_boolean_scalar(doc, prop_ref, count),
        ValueType::Enum => decode_enum_scalar(doc, metadata, prop_ref, cp, count),
        ValueType::String => decode_string_scalar(doc, prop_ref, count),
        _ => decode_numeric_scalar_like(doc, prop_ref, cp, count),
    }
}

fn decode_numeric_scalar_like(
    doc: &Document,
    prop_ref: &PropertyRef,
    cp: &ClassProperty,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    let ct = cp
        .component_type
        .ok_or_else(|| Error::MalformedIndex("numeric property missing componentType".into()))?;
    let data = read_values_buffer(doc, prop_ref)?;
    let component_count = cp.value_type.component_count();
    let elem_size = ct.byte_size() * component_count;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let base = i * elem_size;
        let mut components = Vec::with_capacity(component_count);
        for c in 0..component_count {
            let raw = read_component(data, base + c * ct.byte_size(), ct)?;
            components.push(apply_transform(cp, ct, raw)?);
        }
        out.push(PropertyValue::Numbers(components));
    }
    Ok(out)
}

fn decode_boolean_scalar(
    doc: &Document,
    prop_ref: &PropertyRef,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    let data = read_values_buffer(doc, prop_ref)?;
    let needed_bytes = count.div_ceil(8);
    if data.len() < needed_bytes {
        return Err(Error::PropertyBufferTooShort {
            needed: needed_bytes,
            had: data.len(),
        });
    }
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let bit = (data[i / 8] >> (i % 8)) & 1;
        out.push(PropertyValue::Bool(bit == 1));
    }
    Ok(out)
}

fn decode_enum_scalar(
    doc: &Document,
    metadata: &Metadata,
    prop_ref: &PropertyRef,
    cp: &ClassProperty,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    let enum_name = cp
        .enum_type
        .as_deref()
        .ok_or_else(|| Error::MalformedIndex("ENUM property missing enumType".into()))?;
    let enum_schema = metadata
        .enums
        .get(enum_name)
        .ok_or_else(|| Error::EnumNotFound(enum_name.to_string()))?;
    let data = read_values_buffer(doc, prop_ref)?;
    let ct = enum_schema.value_type;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let raw = read_component(data, i * ct.byte_size(), ct)? as i64;
        let name = enum_schema
            .name_for(raw)
            .ok_or(Error::UnknownEnumValue(raw, enum_name.to_string()))?;
        out.push(PropertyValue::EnumName(name.to_string()));
    }
    Ok(out)
}

fn decode_string_scalar(
    doc: &Document,
    prop_ref: &PropertyRef,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    let offset_type = offset_type_byte_size(prop_ref.buffer_views.offset_type.as_deref());
    let string_offsets_view = prop_ref
        .buffer_views
        .string_offsets
        .ok_or_else(|| Error::MissingBufferView(String::new(), "string_offsets"))?;
    let raw_offsets = doc.read_buffer_view(string_offsets_view)?;

    let needed = (count + 1) * offset_type.byte_size();
    // The offset buffer is sometimes padded beyond what's needed; truncate
    // to the declared element count rather than reading the padding.
    let offsets_bytes = if raw_offsets.len() > needed {
        &raw_offsets[..needed]
    } else {
        raw_offsets
    };

    let values = read_values_buffer(doc, prop_ref)?;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = read_offset_at(offsets_bytes, i, offset_type)? as usize;
        let end = read_offset_at(offsets_bytes, i + 1, offset_type)? as usize;
        let bytes = values
            .get(start..end)
            .ok_or(Error::PropertyBufferTooShort { needed: end, had: values.len() })?;
        out.push(PropertyValue::Text(String::from_utf8(bytes.to_vec())?));
    }
    Ok(out)
}

fn decode_fixed_array(
    doc: &Document,
    metadata: &Metadata,
    prop_ref: &PropertyRef,
    cp: &ClassProperty,
    count: usize,
    fixed_len: usize,
) -> Result<Vec<PropertyValue>> {
    match cp.value_type {
        ValueType::Boolean => {
            let data = read_values_buffer(doc, prop_ref)?;
            let total_bits = count * fixed_len;
            let needed_bytes = total_bits.div_ceil(8);
            if data.len() < needed_bytes {
                return Err(Error::PropertyBufferTooShort {
                    needed: needed_bytes,
                    had: data.len(),
                });
            }
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let mut row = Vec::with_capacity(fixed_len);
                for j in 0..fixed_len {
                    let bit_index = i * fixed_len + j;
                    let bit = (data[bit_index / 8] >> (bit_index % 8)) & 1;
                    row.push(PropertyValue::Bool(bit == 1));
                }
                out.push(PropertyValue::Array(row));
            }
            Ok(out)
        }
        ValueType::Enum => {
            let enum_name = cp
                .enum_type
                .as_deref()
                .ok_or_else(|| Error::MalformedIndex("ENUM property missing enumType".into()))?;
            let enum_schema = metadata
                .enums
                .get(enum_name)
                .ok_or_else(|| Error::EnumNotFound(enum_name.to_string()))?;
            let data = read_values_buffer(doc, prop_ref)?;
            let ct = enum_schema.value_type;
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let mut row = Vec::with_capacity(fixed_len);
                for j in 0..fixed_len {
                    let idx = i * fixed_len + j;
                    let raw = read_component(data, idx * ct.byte_size(), ct)? as i64;
                    let name = enum_schema
                        .name_for(raw)
                        .ok_or(Error::UnknownEnumValue(raw, enum_name.to_string()))?;
                    row.push(PropertyValue::EnumName(name.to_string()));
                }
                out.push(PropertyValue::Array(row));
            }
            Ok(out)
        }
        _ => {
            let ct = cp.component_type.ok_or_else(|| {
                Error::MalformedIndex("numeric array property missing componentType".into())
            })?;
            let data = read_values_buffer(doc, prop_ref)?;
            // A fixed array of a vector/matrix type multiplies the array
            // length by the inner type's own component count.
            let inner_components = cp.value_type.component_count();
            let row_components = fixed_len * inner_components;
            let elem_size = ct.byte_size();
            let needed = count * row_components * elem_size;
            if data.len() < needed {
                return Err(Error::PropertyBufferTooShort { needed, had: data.len() });
            }
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                let mut row = Vec::with_capacity(fixed_len);
                for j in 0..fixed_len {
                    let mut components = Vec::with_capacity(inner_components);
                    for k in 0..inner_components {
                        let idx = i * row_components + j * inner_components + k;
                        let raw = read_component(data, idx * elem_size, ct)?;
                        components.push(apply_transform(cp, ct, raw)?);
                    }
                    row.push(PropertyValue::Numbers(components));
                }
                out.push(PropertyValue::Array(row));
            }
            Ok(out)
        }
    }
}

fn decode_dynamic_array(
    doc: &Document,
    metadata: &Metadata,
    prop_ref: &PropertyRef,
    cp: &ClassProperty,
    count: usize,
) -> Result<Vec<PropertyValue>> {
    let offset_type = offset_type_byte_size(prop_ref.buffer_views.offset_type.as_deref());
    let array_offsets_view = prop_ref
        .buffer_views
        .array_offsets
        .ok_or_else(|| Error::MissingBufferView(String::new(), "array_offsets"))?;
    let array_offsets = doc.read_buffer_view(array_offsets_view)?;

    if cp.value_type == ValueType::String {
        let string_offsets_view = prop_ref
            .buffer_views
            .string_offsets
            .ok_or_else(|| Error::MissingBufferView(String::new(), "string_offsets"))?;
        let string_offsets = doc.read_buffer_view(string_offsets_view)?;
        let values = read_values_buffer(doc, prop_ref)?;

        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let row_start = read_offset_at(array_offsets, i, offset_type)? as usize;
            let row_end = read_offset_at(array_offsets, i + 1, offset_type)? as usize;
            let mut row = Vec::with_capacity(row_end.saturating_sub(row_start));
            for j in row_start..row_end {
                let start = read_offset_at(string_offsets, j, offset_type)? as usize;
                let end = read_offset_at(string_offsets, j + 1, offset_type)? as usize;
                let bytes = values
                    .get(start..end)
                    .ok_or(Error::PropertyBufferTooShort { needed: end, had: values.len() })?;
                row.push(PropertyValue::Text(String::from_utf8(bytes.to_vec())?));
            }
            out.push(PropertyValue::Array(row));
        }
        return Ok(out);
    }

    if cp.value_type == ValueType::Enum {
        let enum_name = cp
            .enum_type
            .as_deref()
            .ok_or_else(|| Error::MalformedIndex("ENUM property missing enumType".into()))?;
        let enum_schema = metadata
            .enums
            .get(enum_name)
            .ok_or_else(|| Error::EnumNotFound(enum_name.to_string()))?;
        let values = read_values_buffer(doc, prop_ref)?;
        let ct = enum_schema.value_type;

        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let start = read_offset_at(array_offsets, i, offset_type)? as usize;
            let end = read_offset_at(array_offsets, i + 1, offset_type)? as usize;
            let component_count = (end - start) / ct.byte_size();
            let mut row = Vec::with_capacity(component_count);
            for k in 0..component_count {
                let raw = read_component(values, start + k * ct.byte_size(), ct)? as i64;
                let name = enum_schema
                    .name_for(raw)
                    .ok_or(Error::UnknownEnumValue(raw, enum_name.to_string()))?;
                row.push(PropertyValue::EnumName(name.to_string()));
            }
            out.push(PropertyValue::Array(row));
        }
        return Ok(out);
    }

    let ct = cp
        .component_type
        .ok_or_else(|| Error::MalformedIndex("numeric array property missing componentType".into()))?;
    let values = read_values_buffer(doc, prop_ref)?;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = read_offset_at(array_offsets, i, offset_type)? as usize;
        let end = read_offset_at(array_offsets, i + 1, offset_type)? as usize;
        let component_count = (end - start) / ct.byte_size();
        let mut row = Vec::with_capacity(component_count);
        for k in 0..component_count {
            let raw = read_component(values, start + k * ct.byte_size(), ct)?;
            row.push(PropertyValue::Numbers(vec![apply_transform(cp, ct, raw)?]));
        }
        out.push(PropertyValue::Array(row));
    }
    Ok(out)
}
