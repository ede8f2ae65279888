//! This module contains the type codes used by the two record families:
//! the NIfTI-1 `datatype` codes on one side and the ITK-Wasm component and
//! pixel type tags on the other, plus the bidirectional mapping between
//! them which both image conversion directions share.

use crate::error::{ConvertError, Result};

/// Data type for representing a NIFTI value type in a volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum NiftiType {
    /// unsigned char.
    // NIFTI_TYPE_UINT8           2
    Uint8 = 2,
    /// signed short.
    // NIFTI_TYPE_INT16           4
    Int16 = 4,
    /// signed int.
    // NIFTI_TYPE_INT32           8
    Int32 = 8,
    /// 32 bit float.
    // NIFTI_TYPE_FLOAT32        16
    Float32 = 16,
    /// 64 bit complex = 2 32 bit floats.
    // NIFTI_TYPE_COMPLEX64      32
    Complex64 = 32,
    /// 64 bit float = double.
    // NIFTI_TYPE_FLOAT64        64
    Float64 = 64,
    /// 3 8 bit bytes.
    // NIFTI_TYPE_RGB24         128
    Rgb24 = 128,
    /// signed char.
    // NIFTI_TYPE_INT8          256
    Int8 = 256,
    /// unsigned short.
    // NIFTI_TYPE_UINT16        512
    Uint16 = 512,
    /// unsigned int.
    // NIFTI_TYPE_UINT32        768
    Uint32 = 768,
    /// signed long long.
    // NIFTI_TYPE_INT64        1024
    Int64 = 1024,
    /// unsigned long long.
    // NIFTI_TYPE_UINT64       1280
    Uint64 = 1280,
    /// 128 bit float = long double.
    // NIFTI_TYPE_FLOAT128     1536
    Float128 = 1536,
    /// 128 bit complex = 2 64 bit floats.
    // NIFTI_TYPE_COMPLEX128   1792
    Complex128 = 1792,
    /// 256 bit complex = 2 128 bit floats
    // NIFTI_TYPE_COMPLEX256   2048
    Complex256 = 2048,
    /// 4 8 bit bytes.
    // NIFTI_TYPE_RGBA32       2304
    Rgba32 = 2304,
}

impl NiftiType {
    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use NiftiType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Rgb24 => 3,
            Int32 | Uint32 | Float32 | Rgba32 => 4,
            Int64 | Uint64 | Float64 | Complex64 => 8,
            Float128 | Complex128 => 16,
            Complex256 => 32,
        }
    }

    /// Retrieve the number of bits per voxel of this data type.
    pub fn bitpix(self) -> usize {
        self.size_of() * 8
    }
}

/// An ITK-Wasm component type tag, identifying the element type of a
/// numeric buffer in an image or mesh record.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ComponentType {
    /// signed 8 bit integer
    Int8,
    /// unsigned 8 bit integer
    Uint8,
    /// signed 16 bit integer
    Int16,
    /// unsigned 16 bit integer
    Uint16,
    /// signed 32 bit integer
    Int32,
    /// unsigned 32 bit integer
    Uint32,
    /// signed 64 bit integer
    Int64,
    /// unsigned 64 bit integer
    Uint64,
    /// 32 bit float
    Float32,
    /// 64 bit float
    Float64,
}

impl ComponentType {
    /// The textual tag used for this component type in ITK-Wasm records.
    pub fn as_tag(self) -> &'static str {
        use ComponentType::*;
        match self {
            Int8 => "int8",
            Uint8 => "uint8",
            Int16 => "int16",
            Uint16 => "uint16",
            Int32 => "int32",
            Uint32 => "uint32",
            Int64 => "int64",
            Uint64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
        }
    }

    /// Resolve a textual component type tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        use ComponentType::*;
        Ok(match tag {
            "int8" => Int8,
            "uint8" => Uint8,
            "int16" => Int16,
            "uint16" => Uint16,
            "int32" => Int32,
            "uint32" => Uint32,
            "int64" => Int64,
            "uint64" => Uint64,
            "float32" => Float32,
            "float64" => Float64,
            _ => return Err(ConvertError::UnsupportedBufferType(tag.to_owned())),
        })
    }

    /// The size of one element of this component type, in bytes.
    pub fn size_of(self) -> usize {
        use ComponentType::*;
        match self {
            Int8 | Uint8 => 1,
            Int16 | Uint16 => 2,
            Int32 | Uint32 | Float32 => 4,
            Int64 | Uint64 | Float64 => 8,
        }
    }
}

/// An ITK-Wasm pixel type tag, describing how the components of a single
/// pixel are to be interpreted.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum PixelType {
    /// unknown pixel interpretation
    Unknown,
    /// a single value per pixel
    Scalar,
    /// red, green, blue
    Rgb,
    /// red, green, blue, alpha
    Rgba,
    /// an itk::Offset
    Offset,
    /// a fixed-length vector
    Vector,
    /// a spatial point
    Point,
    /// an itk::CovariantVector
    CovariantVector,
    /// a symmetric second rank tensor
    SymmetricSecondRankTensor,
    /// a 3D diffusion tensor
    DiffusionTensor3D,
    /// a complex value
    Complex,
    /// an itk::FixedArray
    FixedArray,
    /// an itk::Array
    Array,
    /// an itk::Matrix
    Matrix,
    /// an itk::VariableLengthVector
    VariableLengthVector,
    /// an itk::VariableSizeMatrix
    VariableSizeMatrix,
}

impl PixelType {
    /// The textual tag used for this pixel type in ITK-Wasm records.
    pub fn as_tag(self) -> &'static str {
        use PixelType::*;
        match self {
            Unknown => "Unknown",
            Scalar => "Scalar",
            Rgb => "RGB",
            Rgba => "RGBA",
            Offset => "Offset",
            Vector => "Vector",
            Point => "Point",
            CovariantVector => "CovariantVector",
            SymmetricSecondRankTensor => "SymmetricSecondRankTensor",
            DiffusionTensor3D => "DiffusionTensor3D",
            Complex => "Complex",
            FixedArray => "FixedArray",
            Array => "Array",
            Matrix => "Matrix",
            VariableLengthVector => "VariableLengthVector",
            VariableSizeMatrix => "VariableSizeMatrix",
        }
    }

    /// Resolve a textual pixel type tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        use PixelType::*;
        Ok(match tag {
            "Unknown" => Unknown,
            "Scalar" => Scalar,
            "RGB" => Rgb,
            "RGBA" => Rgba,
            "Offset" => Offset,
            "Vector" => Vector,
            "Point" => Point,
            "CovariantVector" => CovariantVector,
            "SymmetricSecondRankTensor" => SymmetricSecondRankTensor,
            "DiffusionTensor3D" => DiffusionTensor3D,
            "Complex" => Complex,
            "FixedArray" => FixedArray,
            "Array" => Array,
            "Matrix" => Matrix,
            "VariableLengthVector" => VariableLengthVector,
            "VariableSizeMatrix" => VariableSizeMatrix,
            _ => return Err(ConvertError::UnsupportedBufferType(tag.to_owned())),
        })
    }
}

/// Map a component type and pixel type to the NIfTI data type which carries
/// it, along with the number of components per voxel. Only the combinations
/// in the conversion table are supported.
pub fn nifti_datatype(component: ComponentType, pixel: PixelType) -> Result<(NiftiType, u16)> {
    match (component, pixel) {
        (ComponentType::Uint8, PixelType::Rgb) => Ok((NiftiType::Rgb24, 3)),
        (ComponentType::Uint8, _) => Ok((NiftiType::Uint8, 1)),
        (ComponentType::Int16, _) => Ok((NiftiType::Int16, 1)),
        (ComponentType::Uint16, _) => Ok((NiftiType::Uint16, 1)),
        (ComponentType::Int32, _) => Ok((NiftiType::Int32, 1)),
        (ComponentType::Float32, _) => Ok((NiftiType::Float32, 1)),
        (ComponentType::Float64, _) => Ok((NiftiType::Float64, 1)),
        (c, _) => Err(ConvertError::UnsupportedBufferType(c.as_tag().to_owned())),
    }
}

/// Map a NIfTI data type back to the ITK-Wasm component type, pixel type and
/// component count. Exact inverse of [`nifti_datatype`] over the supported
/// codes.
pub fn itk_datatype(datatype: NiftiType) -> Result<(ComponentType, PixelType, u16)> {
    match datatype {
        NiftiType::Uint8 => Ok((ComponentType::Uint8, PixelType::Scalar, 1)),
        NiftiType::Int16 => Ok((ComponentType::Int16, PixelType::Scalar, 1)),
        NiftiType::Uint16 => Ok((ComponentType::Uint16, PixelType::Scalar, 1)),
        NiftiType::Int32 => Ok((ComponentType::Int32, PixelType::Scalar, 1)),
        NiftiType::Float32 => Ok((ComponentType::Float32, PixelType::Scalar, 1)),
        NiftiType::Float64 => Ok((ComponentType::Float64, PixelType::Scalar, 1)),
        NiftiType::Rgb24 => Ok((ComponentType::Uint8, PixelType::Rgb, 3)),
        t => Err(ConvertError::UnsupportedDataType(t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn datatype_table_is_bijective() {
        for code in &[2, 4, 8, 16, 64, 128, 512] {
            let datatype: NiftiType = FromPrimitive::from_i16(*code).unwrap();
            let (component, pixel, components) = itk_datatype(datatype).unwrap();
            let (back, n) = nifti_datatype(component, pixel).unwrap();
            assert_eq!(back, datatype);
            assert_eq!(n, components);
            assert_eq!(back.bitpix(), datatype.bitpix());
        }
    }

    #[test]
    fn unsupported_codes_are_rejected() {
        assert!(matches!(
            itk_datatype(NiftiType::Complex64),
            Err(ConvertError::UnsupportedDataType(NiftiType::Complex64))
        ));
        assert!(matches!(
            nifti_datatype(ComponentType::Int64, PixelType::Scalar),
            Err(ConvertError::UnsupportedBufferType(_))
        ));
    }
}
