//! The in-memory model of ITK-Wasm image (IWI) and mesh (IWM) records,
//! along with their mapping to and from the generic CBOR object tree.
//!
//! Numeric buffers in the wire format are RFC 8746 typed arrays (a CBOR
//! tag wrapping a byte string). They are resolved exactly once at this
//! boundary into the [`NumericBuffer`] discriminated union, so that the
//! conversion logic itself can rely on plain `match`es over a closed set
//! of element kinds.

use byteordered::{Endian, Endianness};
use ciborium::value::Value;
use std::io::Cursor;

use crate::error::{ConvertError, Result};
use crate::typedef::{ComponentType, PixelType};

// RFC 8746 typed array tags.
const TAG_UINT8: u64 = 64;
const TAG_UINT16_BE: u64 = 65;
const TAG_UINT32_BE: u64 = 66;
const TAG_UINT64_BE: u64 = 67;
const TAG_UINT8_CLAMPED: u64 = 68;
const TAG_UINT16_LE: u64 = 69;
const TAG_UINT32_LE: u64 = 70;
const TAG_UINT64_LE: u64 = 71;
const TAG_INT8: u64 = 72;
const TAG_INT16_BE: u64 = 73;
const TAG_INT32_BE: u64 = 74;
const TAG_INT64_BE: u64 = 75;
const TAG_INT16_LE: u64 = 77;
const TAG_INT32_LE: u64 = 78;
const TAG_INT64_LE: u64 = 79;
const TAG_FLOAT32_BE: u64 = 81;
const TAG_FLOAT64_BE: u64 = 82;
const TAG_FLOAT32_LE: u64 = 85;
const TAG_FLOAT64_LE: u64 = 86;

/// A numeric buffer with its concrete element type made explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericBuffer {
    /// unsigned 8 bit integer elements
    Uint8(Vec<u8>),
    /// signed 8 bit integer elements
    Int8(Vec<i8>),
    /// unsigned 16 bit integer elements
    Uint16(Vec<u16>),
    /// signed 16 bit integer elements
    Int16(Vec<i16>),
    /// unsigned 32 bit integer elements
    Uint32(Vec<u32>),
    /// signed 32 bit integer elements
    Int32(Vec<i32>),
    /// unsigned 64 bit integer elements
    Uint64(Vec<u64>),
    /// signed 64 bit integer elements
    Int64(Vec<i64>),
    /// 32 bit float elements
    Float32(Vec<f32>),
    /// 64 bit float elements
    Float64(Vec<f64>),
}

/// Read a whole slice of multi-byte elements with the given byte order,
/// taking the cheap reinterpretation route when the byte order is native.
macro_rules! elements_from_bytes {
    ($bytes: expr, $e: expr, $t: ty, $read: ident) => {{
        if $e == Endianness::native() {
            bytemuck::pod_collect_to_vec::<u8, $t>($bytes)
        } else {
            let mut src = Cursor::new($bytes);
            (0..$bytes.len() / ::std::mem::size_of::<$t>())
                .map(|_| $e.$read(&mut src))
                .collect::<::std::io::Result<Vec<$t>>>()?
        }
    }};
}

/// Write a whole slice of multi-byte elements with the given byte order.
macro_rules! elements_to_bytes {
    ($values: expr, $e: expr, $t: ty, $write: ident) => {{
        if $e == Endianness::native() {
            bytemuck::cast_slice::<$t, u8>($values).to_vec()
        } else {
            let mut out = Vec::with_capacity($values.len() * ::std::mem::size_of::<$t>());
            for v in $values {
                $e.$write(&mut out, *v)?;
            }
            out
        }
    }};
}

impl NumericBuffer {
    /// The component type tag of this buffer's elements.
    pub fn component_type(&self) -> ComponentType {
        match self {
            NumericBuffer::Uint8(_) => ComponentType::Uint8,
            NumericBuffer::Int8(_) => ComponentType::Int8,
            NumericBuffer::Uint16(_) => ComponentType::Uint16,
            NumericBuffer::Int16(_) => ComponentType::Int16,
            NumericBuffer::Uint32(_) => ComponentType::Uint32,
            NumericBuffer::Int32(_) => ComponentType::Int32,
            NumericBuffer::Uint64(_) => ComponentType::Uint64,
            NumericBuffer::Int64(_) => ComponentType::Int64,
            NumericBuffer::Float32(_) => ComponentType::Float32,
            NumericBuffer::Float64(_) => ComponentType::Float64,
        }
    }

    /// The number of elements in the buffer.
    pub fn len(&self) -> usize {
        match self {
            NumericBuffer::Uint8(v) => v.len(),
            NumericBuffer::Int8(v) => v.len(),
            NumericBuffer::Uint16(v) => v.len(),
            NumericBuffer::Int16(v) => v.len(),
            NumericBuffer::Uint32(v) => v.len(),
            NumericBuffer::Int32(v) => v.len(),
            NumericBuffer::Uint64(v) => v.len(),
            NumericBuffer::Int64(v) => v.len(),
            NumericBuffer::Float32(v) => v.len(),
            NumericBuffer::Float64(v) => v.len(),
        }
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw byte length of the buffer's underlying storage.
    pub fn byte_len(&self) -> usize {
        self.len() * self.component_type().size_of()
    }

    /// Reinterpret a raw byte buffer as elements of the given component
    /// type, honoring the given byte order.
    pub fn from_bytes(
        component: ComponentType,
        bytes: &[u8],
        endianness: Endianness,
    ) -> Result<Self> {
        let elem_size = component.size_of();
        if bytes.len() % elem_size != 0 {
            return Err(ConvertError::InvalidFormat(format!(
                "byte buffer of {} bytes cannot hold whole {} elements",
                bytes.len(),
                component.as_tag()
            )));
        }
        let e = endianness;
        Ok(match component {
            ComponentType::Uint8 => NumericBuffer::Uint8(bytes.to_vec()),
            ComponentType::Int8 => {
                NumericBuffer::Int8(bytemuck::pod_collect_to_vec::<u8, i8>(bytes))
            }
            ComponentType::Uint16 => {
                NumericBuffer::Uint16(elements_from_bytes!(bytes, e, u16, read_u16))
            }
            ComponentType::Int16 => {
                NumericBuffer::Int16(elements_from_bytes!(bytes, e, i16, read_i16))
            }
            ComponentType::Uint32 => {
                NumericBuffer::Uint32(elements_from_bytes!(bytes, e, u32, read_u32))
            }
            ComponentType::Int32 => {
                NumericBuffer::Int32(elements_from_bytes!(bytes, e, i32, read_i32))
            }
            ComponentType::Uint64 => {
                NumericBuffer::Uint64(elements_from_bytes!(bytes, e, u64, read_u64))
            }
            ComponentType::Int64 => {
                NumericBuffer::Int64(elements_from_bytes!(bytes, e, i64, read_i64))
            }
            ComponentType::Float32 => {
                NumericBuffer::Float32(elements_from_bytes!(bytes, e, f32, read_f32))
            }
            ComponentType::Float64 => {
                NumericBuffer::Float64(elements_from_bytes!(bytes, e, f64, read_f64))
            }
        })
    }

    /// Serialize the buffer's elements to bytes with the given byte order.
    pub fn to_bytes(&self, endianness: Endianness) -> Result<Vec<u8>> {
        let e = endianness;
        Ok(match self {
            NumericBuffer::Uint8(v) => v.clone(),
            NumericBuffer::Int8(v) => bytemuck::cast_slice::<i8, u8>(v).to_vec(),
            NumericBuffer::Uint16(v) => elements_to_bytes!(v, e, u16, write_u16),
            NumericBuffer::Int16(v) => elements_to_bytes!(v, e, i16, write_i16),
            NumericBuffer::Uint32(v) => elements_to_bytes!(v, e, u32, write_u32),
            NumericBuffer::Int32(v) => elements_to_bytes!(v, e, i32, write_i32),
            NumericBuffer::Uint64(v) => elements_to_bytes!(v, e, u64, write_u64),
            NumericBuffer::Int64(v) => elements_to_bytes!(v, e, i64, write_i64),
            NumericBuffer::Float32(v) => elements_to_bytes!(v, e, f32, write_f32),
            NumericBuffer::Float64(v) => elements_to_bytes!(v, e, f64, write_f64),
        })
    }

    /// Convert all elements to `f64` by numeric cast.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NumericBuffer::Uint8(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Int8(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Uint16(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Int16(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Uint32(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Int32(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Uint64(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Int64(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Float32(v) => v.iter().map(|x| *x as f64).collect(),
            NumericBuffer::Float64(v) => v.clone(),
        }
    }

    /// Convert all elements to `f32` by numeric cast.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            NumericBuffer::Float32(v) => v.clone(),
            other => other.to_f64_vec().into_iter().map(|x| x as f32).collect(),
        }
    }

    /// Convert all elements to `u64` by numeric cast.
    pub fn to_u64_vec(&self) -> Vec<u64> {
        match self {
            NumericBuffer::Uint8(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Int8(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Uint16(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Int16(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Uint32(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Int32(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Uint64(v) => v.clone(),
            NumericBuffer::Int64(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Float32(v) => v.iter().map(|x| *x as u64).collect(),
            NumericBuffer::Float64(v) => v.iter().map(|x| *x as u64).collect(),
        }
    }

    /// Resolve a CBOR value into a typed numeric buffer.
    ///
    /// Accepts RFC 8746 typed arrays of either byte order, raw byte strings
    /// (as unsigned 8 bit elements) and untagged arrays of numbers (signed
    /// 64 bit if all elements are integers, 64 bit float otherwise).
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Tag(tag, inner) => {
                let bytes = match &**inner {
                    Value::Bytes(b) => b,
                    other => {
                        return Err(ConvertError::UnsupportedBufferType(format!(
                            "typed array tag {} over {}",
                            tag,
                            value_kind(other)
                        )))
                    }
                };
                let (component, e) = match *tag {
                    TAG_UINT8 | TAG_UINT8_CLAMPED => (ComponentType::Uint8, Endianness::Little),
                    TAG_INT8 => (ComponentType::Int8, Endianness::Little),
                    TAG_UINT16_LE => (ComponentType::Uint16, Endianness::Little),
                    TAG_UINT16_BE => (ComponentType::Uint16, Endianness::Big),
                    TAG_INT16_LE => (ComponentType::Int16, Endianness::Little),
                    TAG_INT16_BE => (ComponentType::Int16, Endianness::Big),
                    TAG_UINT32_LE => (ComponentType::Uint32, Endianness::Little),
                    TAG_UINT32_BE => (ComponentType::Uint32, Endianness::Big),
                    TAG_INT32_LE => (ComponentType::Int32, Endianness::Little),
                    TAG_INT32_BE => (ComponentType::Int32, Endianness::Big),
                    TAG_UINT64_LE => (ComponentType::Uint64, Endianness::Little),
                    TAG_UINT64_BE => (ComponentType::Uint64, Endianness::Big),
                    TAG_INT64_LE => (ComponentType::Int64, Endianness::Little),
                    TAG_INT64_BE => (ComponentType::Int64, Endianness::Big),
                    TAG_FLOAT32_LE => (ComponentType::Float32, Endianness::Little),
                    TAG_FLOAT32_BE => (ComponentType::Float32, Endianness::Big),
                    TAG_FLOAT64_LE => (ComponentType::Float64, Endianness::Little),
                    TAG_FLOAT64_BE => (ComponentType::Float64, Endianness::Big),
                    t => {
                        return Err(ConvertError::UnsupportedBufferType(format!(
                            "typed array tag {}",
                            t
                        )))
                    }
                };
                NumericBuffer::from_bytes(component, bytes, e)
            }
            Value::Bytes(b) => Ok(NumericBuffer::Uint8(b.clone())),
            Value::Array(items) => {
                if items.iter().any(|v| matches!(v, Value::Float(_))) {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(value_to_f64(item)?);
                    }
                    Ok(NumericBuffer::Float64(out))
                } else {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(value_to_i128(item)? as i64);
                    }
                    Ok(NumericBuffer::Int64(out))
                }
            }
            other => Err(ConvertError::UnsupportedBufferType(
                value_kind(other).to_owned(),
            )),
        }
    }

    /// Serialize the buffer as a little-endian RFC 8746 typed array.
    pub fn to_value(&self) -> Result<Value> {
        let tag = match self {
            NumericBuffer::Uint8(_) => TAG_UINT8,
            NumericBuffer::Int8(_) => TAG_INT8,
            NumericBuffer::Uint16(_) => TAG_UINT16_LE,
            NumericBuffer::Int16(_) => TAG_INT16_LE,
            NumericBuffer::Uint32(_) => TAG_UINT32_LE,
            NumericBuffer::Int32(_) => TAG_INT32_LE,
            NumericBuffer::Uint64(_) => TAG_UINT64_LE,
            NumericBuffer::Int64(_) => TAG_INT64_LE,
            NumericBuffer::Float32(_) => TAG_FLOAT32_LE,
            NumericBuffer::Float64(_) => TAG_FLOAT64_LE,
        };
        let bytes = self.to_bytes(Endianness::Little)?;
        Ok(Value::Tag(tag, Box::new(Value::Bytes(bytes))))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
        Value::Tag(..) => "tagged value",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown value",
    }
}

fn value_to_i128(value: &Value) -> Result<i128> {
    match value {
        Value::Integer(i) => Ok(i128::from(*i)),
        other => Err(ConvertError::UnsupportedBufferType(
            value_kind(other).to_owned(),
        )),
    }
}

fn value_to_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Integer(i) => Ok(i128::from(*i) as f64),
        Value::Float(f) => Ok(*f),
        other => Err(ConvertError::UnsupportedBufferType(
            value_kind(other).to_owned(),
        )),
    }
}

fn map_get<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries.iter().find_map(|(k, v)| match k {
        Value::Text(t) if t == key => Some(v),
        _ => None,
    })
}

fn require<'a>(entries: &'a [(Value, Value)], key: &'static str) -> Result<&'a Value> {
    map_get(entries, key).ok_or(ConvertError::MissingField(key))
}

fn as_map<'a>(value: &'a Value, what: &str) -> Result<&'a [(Value, Value)]> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ConvertError::InvalidFormat(format!(
            "expected {} to be a map, found {}",
            what,
            value_kind(other)
        ))),
    }
}

fn as_text<'a>(value: &'a Value, what: &str) -> Result<&'a str> {
    match value {
        Value::Text(t) => Ok(t),
        other => Err(ConvertError::InvalidFormat(format!(
            "expected {} to be text, found {}",
            what,
            value_kind(other)
        ))),
    }
}

fn as_u64(value: &Value, what: &str) -> Result<u64> {
    match value {
        Value::Integer(i) => Ok(i128::from(*i) as u64),
        other => Err(ConvertError::InvalidFormat(format!(
            "expected {} to be an integer, found {}",
            what,
            value_kind(other)
        ))),
    }
}

fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    ciborium::de::from_reader(&mut cursor).map_err(|e| ConvertError::InvalidFormat(e.to_string()))
}

fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out)
        .map_err(|e| ConvertError::InvalidFormat(e.to_string()))?;
    Ok(out)
}

fn text_entry(key: &str, value: &str) -> (Value, Value) {
    (Value::Text(key.to_owned()), Value::Text(value.to_owned()))
}

fn uint_entry(key: &str, value: u64) -> (Value, Value) {
    (Value::Text(key.to_owned()), Value::Integer(value.into()))
}

/// The `imageType` metadata block of an IWI record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageType {
    /// Number of spatial dimensions
    pub dimension: usize,
    /// Element type of the voxel buffer
    pub component_type: ComponentType,
    /// Interpretation of a voxel's components
    pub pixel_type: PixelType,
    /// Number of components per voxel
    pub components: u16,
}

impl ImageType {
    fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(value, "imageType")?;
        let dimension = as_u64(require(entries, "dimension")?, "dimension")? as usize;
        let component_type =
            ComponentType::from_tag(as_text(require(entries, "componentType")?, "componentType")?)?;
        let pixel_type =
            PixelType::from_tag(as_text(require(entries, "pixelType")?, "pixelType")?)?;
        let components = match map_get(entries, "components") {
            Some(v) => as_u64(v, "components")? as u16,
            None => 1,
        };
        Ok(ImageType {
            dimension,
            component_type,
            pixel_type,
            components,
        })
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            uint_entry("dimension", self.dimension as u64),
            text_entry("componentType", self.component_type.as_tag()),
            text_entry("pixelType", self.pixel_type.as_tag()),
            uint_entry("components", u64::from(self.components)),
        ])
    }
}

/// A decoded ITK-Wasm image (IWI) record.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Voxel type metadata
    pub image_type: ImageType,
    /// Free-form image name
    pub name: String,
    /// Physical-space origin in LPS convention, rank 3 when present
    pub origin: Option<Vec<f64>>,
    /// Per-axis physical spacing
    pub spacing: Option<Vec<f64>>,
    /// Row-major 3x3 direction cosine matrix, when known
    pub direction: Option<Vec<f64>>,
    /// Per-axis voxel counts
    pub size: Vec<u64>,
    /// The voxel buffer
    pub data: NumericBuffer,
}

impl ImageRecord {
    /// Decode an IWI record from its CBOR serialization.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&decode_value(bytes)?)
    }

    /// Serialize this record to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode_value(&self.to_value()?)
    }

    /// Build an image record from a decoded CBOR object tree.
    ///
    /// `imageType`, `size` and `data` are required; the geometric fields
    /// are optional. An empty `size` is reported as missing, since a rank
    /// of zero leaves the record unusable.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(value, "image record")?;
        let image_type = ImageType::from_value(require(entries, "imageType")?)?;
        let size = NumericBuffer::from_value(require(entries, "size")?)?.to_u64_vec();
        if size.is_empty() {
            return Err(ConvertError::MissingField("size"));
        }
        let data = NumericBuffer::from_value(require(entries, "data")?)?;
        let name = match map_get(entries, "name") {
            Some(v) => as_text(v, "name")?.to_owned(),
            None => "image".to_owned(),
        };
        let origin = map_get(entries, "origin")
            .map(|v| NumericBuffer::from_value(v).map(|b| b.to_f64_vec()))
            .transpose()?;
        let spacing = map_get(entries, "spacing")
            .map(|v| NumericBuffer::from_value(v).map(|b| b.to_f64_vec()))
            .transpose()?;
        let direction = map_get(entries, "direction")
            .map(|v| NumericBuffer::from_value(v).map(|b| b.to_f64_vec()))
            .transpose()?;
        Ok(ImageRecord {
            image_type,
            name,
            origin,
            spacing,
            direction,
            size,
            data,
        })
    }

    /// Turn this record into a CBOR object tree.
    pub fn to_value(&self) -> Result<Value> {
        let mut entries = vec![
            (
                Value::Text("imageType".to_owned()),
                self.image_type.to_value(),
            ),
            text_entry("name", &self.name),
        ];
        if let Some(origin) = &self.origin {
            entries.push((
                Value::Text("origin".to_owned()),
                NumericBuffer::Float64(origin.clone()).to_value()?,
            ));
        }
        if let Some(spacing) = &self.spacing {
            entries.push((
                Value::Text("spacing".to_owned()),
                NumericBuffer::Float64(spacing.clone()).to_value()?,
            ));
        }
        if let Some(direction) = &self.direction {
            entries.push((
                Value::Text("direction".to_owned()),
                NumericBuffer::Float64(direction.clone()).to_value()?,
            ));
        }
        entries.push((
            Value::Text("size".to_owned()),
            Value::Array(
                self.size
                    .iter()
                    .map(|s| Value::Integer((*s).into()))
                    .collect(),
            ),
        ));
        entries.push((Value::Text("data".to_owned()), self.data.to_value()?));
        Ok(Value::Map(entries))
    }
}

/// The `meshType` metadata block of an IWM record.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshType {
    /// Number of spatial dimensions
    pub dimension: usize,
    /// Element type of the point coordinate buffer
    pub point_component_type: ComponentType,
    /// Element type of per-point data, if any
    pub point_pixel_component_type: ComponentType,
    /// Interpretation of per-point data
    pub point_pixel_type: PixelType,
    /// Number of components of per-point data
    pub point_pixel_components: u16,
    /// Element type of the cell buffer
    pub cell_component_type: ComponentType,
    /// Element type of per-cell data, if any
    pub cell_pixel_component_type: ComponentType,
    /// Interpretation of per-cell data
    pub cell_pixel_type: PixelType,
    /// Number of components of per-cell data
    pub cell_pixel_components: u16,
}

impl MeshType {
    /// The mesh type produced by the triangle mesh encoder: 3-dimensional,
    /// 32 bit float points, 64 bit unsigned cell integers, no per-point or
    /// per-cell data.
    pub fn triangle() -> Self {
        MeshType {
            dimension: 3,
            point_component_type: ComponentType::Float32,
            point_pixel_component_type: ComponentType::Float32,
            point_pixel_type: PixelType::Scalar,
            point_pixel_components: 0,
            cell_component_type: ComponentType::Uint64,
            cell_pixel_component_type: ComponentType::Float32,
            cell_pixel_type: PixelType::Scalar,
            cell_pixel_components: 0,
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(value, "meshType")?;
        let defaults = MeshType::triangle();
        let component = |key, fallback: ComponentType| -> Result<ComponentType> {
            match map_get(entries, key) {
                Some(v) => ComponentType::from_tag(as_text(v, key)?),
                None => Ok(fallback),
            }
        };
        let pixel = |key, fallback: PixelType| -> Result<PixelType> {
            match map_get(entries, key) {
                Some(v) => PixelType::from_tag(as_text(v, key)?),
                None => Ok(fallback),
            }
        };
        let count = |key, fallback: u16| -> Result<u16> {
            match map_get(entries, key) {
                Some(v) => Ok(as_u64(v, key)? as u16),
                None => Ok(fallback),
            }
        };
        Ok(MeshType {
            dimension: match map_get(entries, "dimension") {
                Some(v) => as_u64(v, "dimension")? as usize,
                None => defaults.dimension,
            },
            point_component_type: component("pointComponentType", defaults.point_component_type)?,
            point_pixel_component_type: component(
                "pointPixelComponentType",
                defaults.point_pixel_component_type,
            )?,
            point_pixel_type: pixel("pointPixelType", defaults.point_pixel_type)?,
            point_pixel_components: count("pointPixelComponents", defaults.point_pixel_components)?,
            cell_component_type: component("cellComponentType", defaults.cell_component_type)?,
            cell_pixel_component_type: component(
                "cellPixelComponentType",
                defaults.cell_pixel_component_type,
            )?,
            cell_pixel_type: pixel("cellPixelType", defaults.cell_pixel_type)?,
            cell_pixel_components: count("cellPixelComponents", defaults.cell_pixel_components)?,
        })
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            uint_entry("dimension", self.dimension as u64),
            text_entry("pointComponentType", self.point_component_type.as_tag()),
            text_entry(
                "pointPixelComponentType",
                self.point_pixel_component_type.as_tag(),
            ),
            text_entry("pointPixelType", self.point_pixel_type.as_tag()),
            uint_entry(
                "pointPixelComponents",
                u64::from(self.point_pixel_components),
            ),
            text_entry("cellComponentType", self.cell_component_type.as_tag()),
            text_entry(
                "cellPixelComponentType",
                self.cell_pixel_component_type.as_tag(),
            ),
            text_entry("cellPixelType", self.cell_pixel_type.as_tag()),
            uint_entry("cellPixelComponents", u64::from(self.cell_pixel_components)),
        ])
    }
}

/// A decoded ITK-Wasm mesh (IWM) record.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    /// Point and cell type metadata
    pub mesh_type: MeshType,
    /// Free-form mesh name
    pub name: String,
    /// Number of 3D points in `points`
    pub number_of_points: u64,
    /// Flat point coordinate buffer, in LPS convention
    pub points: NumericBuffer,
    /// Number of per-point data pixels (always 0 here)
    pub number_of_point_pixels: u64,
    /// Number of cells encoded in `cells`
    pub number_of_cells: u64,
    /// Total element count of the cell buffer
    pub cell_buffer_size: u64,
    /// Flat generalized cell list
    pub cells: NumericBuffer,
    /// Number of per-cell data pixels (always 0 here)
    pub number_of_cell_pixels: u64,
}

impl MeshRecord {
    /// Decode an IWM record from its CBOR serialization.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Self::from_value(&decode_value(bytes)?)
    }

    /// Serialize this record to CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        encode_value(&self.to_value()?)
    }

    /// Build a mesh record from a decoded CBOR object tree.
    ///
    /// `meshType`, `points` and `cells` are required; counts default to
    /// zero when absent.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = as_map(value, "mesh record")?;
        let mesh_type = MeshType::from_value(require(entries, "meshType")?)?;
        let points = NumericBuffer::from_value(require(entries, "points")?)?;
        let cells = NumericBuffer::from_value(require(entries, "cells")?)?;
        let name = match map_get(entries, "name") {
            Some(v) => as_text(v, "name")?.to_owned(),
            None => "mesh".to_owned(),
        };
        let count = |key| -> Result<u64> {
            match map_get(entries, key) {
                Some(v) => as_u64(v, key),
                None => Ok(0),
            }
        };
        Ok(MeshRecord {
            mesh_type,
            name,
            number_of_points: count("numberOfPoints")?,
            points,
            number_of_point_pixels: count("numberOfPointPixels")?,
            number_of_cells: count("numberOfCells")?,
            cell_buffer_size: count("cellBufferSize")?,
            cells,
            number_of_cell_pixels: count("numberOfCellPixels")?,
        })
    }

    /// Turn this record into a CBOR object tree.
    pub fn to_value(&self) -> Result<Value> {
        Ok(Value::Map(vec![
            (Value::Text("meshType".to_owned()), self.mesh_type.to_value()),
            text_entry("name", &self.name),
            uint_entry("numberOfPoints", self.number_of_points),
            (Value::Text("points".to_owned()), self.points.to_value()?),
            uint_entry("numberOfPointPixels", self.number_of_point_pixels),
            (
                Value::Text("pointData".to_owned()),
                NumericBuffer::Float32(Vec::new()).to_value()?,
            ),
            uint_entry("numberOfCells", self.number_of_cells),
            uint_entry("cellBufferSize", self.cell_buffer_size),
            (Value::Text("cells".to_owned()), self.cells.to_value()?),
            uint_entry("numberOfCellPixels", self.number_of_cell_pixels),
            (
                Value::Text("cellData".to_owned()),
                NumericBuffer::Float32(Vec::new()).to_value()?,
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_array_round_trip() {
        let buffer = NumericBuffer::Int16(vec![-2, 515, 7]);
        let value = buffer.to_value().unwrap();
        match &value {
            Value::Tag(tag, inner) => {
                assert_eq!(*tag, TAG_INT16_LE);
                assert_eq!(**inner, Value::Bytes(vec![0xFE, 0xFF, 0x03, 0x02, 7, 0]));
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(NumericBuffer::from_value(&value).unwrap(), buffer);
    }

    #[test]
    fn big_endian_typed_array() {
        let value = Value::Tag(
            TAG_UINT16_BE,
            Box::new(Value::Bytes(vec![0x01, 0x00, 0x02, 0x03])),
        );
        assert_eq!(
            NumericBuffer::from_value(&value).unwrap(),
            NumericBuffer::Uint16(vec![256, 0x0203])
        );
    }

    #[test]
    fn untagged_arrays() {
        let ints = Value::Array(vec![
            Value::Integer(1.into()),
            Value::Integer((-5).into()),
        ]);
        assert_eq!(
            NumericBuffer::from_value(&ints).unwrap(),
            NumericBuffer::Int64(vec![1, -5])
        );

        let floats = Value::Array(vec![Value::Integer(1.into()), Value::Float(0.5)]);
        assert_eq!(
            NumericBuffer::from_value(&floats).unwrap(),
            NumericBuffer::Float64(vec![1.0, 0.5])
        );
    }

    #[test]
    fn misaligned_typed_array_is_rejected() {
        let value = Value::Tag(TAG_FLOAT32_LE, Box::new(Value::Bytes(vec![0; 6])));
        assert!(matches!(
            NumericBuffer::from_value(&value),
            Err(ConvertError::InvalidFormat(_))
        ));
    }
}
