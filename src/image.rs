//! Conversion between ITK-Wasm image records and single-file NIfTI-1 byte
//! streams.
//!
//! The decode direction derives a NIfTI header from the record's size,
//! spacing and voxel type metadata (plus an sform affine when the record
//! carries orientation) and appends the voxel bytes after the 352-byte
//! header. The encode direction reverses every step, recovering the LPS
//! direction matrix and origin from the header's affine.

use std::convert::TryFrom;

use byteordered::Endianness;

use crate::affine::{affine_to_orientation, orientation_to_affine};
use crate::error::{ConvertError, Result};
use crate::header::NiftiHeader;
use crate::record::{ImageRecord, ImageType, NumericBuffer};
use crate::typedef::{itk_datatype, nifti_datatype};

/// Expected payload length in bytes for the given axis extents and bits
/// per voxel. Zero extents count as one voxel; the accumulation is
/// checked so that oversized extents fail instead of wrapping.
fn expected_payload_len(extents: impl Iterator<Item = u64>, bitpix: usize) -> Result<usize> {
    extents
        .map(|e| e.max(1))
        .try_fold(1usize, |acc, e| acc.checked_mul(usize::try_from(e).ok()?))
        .and_then(|nvox| nvox.checked_mul(bitpix / 8))
        .ok_or_else(|| {
            ConvertError::InvalidFormat("voxel count overflows the address space".to_owned())
        })
}

/// Convert an image record into a NIfTI-1 header and the little-endian
/// voxel byte stream that goes with it.
///
/// Axis extents are narrowed to their low 32 bits and must then fit the
/// header's 16-bit dim fields; the voxel count clamps every extent to at
/// least 1 so that a zero-extent axis does not collapse the expected
/// payload size to zero. The payload length must match the record's data
/// buffer exactly.
pub fn image_to_nifti(record: &ImageRecord) -> Result<(NiftiHeader, Vec<u8>)> {
    if record.size.is_empty() {
        return Err(ConvertError::MissingField("size"));
    }
    let extents: Vec<u32> = record.size.iter().map(|s| *s as u32).collect();
    let rank = extents.len();
    if rank > 7 {
        return Err(ConvertError::InvalidFormat(format!(
            "image of rank {} cannot be stored in a NIfTI-1 file",
            rank
        )));
    }
    if let Some(extent) = extents.iter().find(|e| **e > u32::from(u16::MAX)) {
        return Err(ConvertError::InvalidFormat(format!(
            "axis extent {} exceeds the 16-bit dim fields of a NIfTI-1 header",
            extent
        )));
    }

    let (datatype, _components) = nifti_datatype(
        record.data.component_type(),
        record.image_type.pixel_type,
    )?;

    let expected = expected_payload_len(
        extents.iter().map(|e| u64::from(*e)),
        datatype.bitpix(),
    )?;
    let actual = record.data.byte_len();
    if expected != actual {
        return Err(ConvertError::PayloadSizeMismatch(expected, actual));
    }

    let mut spacing = vec![1.0f32; rank];
    if let Some(s) = &record.spacing {
        for (axis, mm) in s.iter().take(rank).enumerate() {
            spacing[axis] = *mm as f32;
        }
    }

    let mut header = NiftiHeader {
        datatype: datatype as i16,
        bitpix: datatype.bitpix() as i16,
        scl_slope: 1.,
        scl_inter: 0.,
        ..NiftiHeader::default()
    };
    header.dim[0] = rank as u16;
    for (axis, extent) in extents.iter().enumerate() {
        header.dim[axis + 1] = *extent as u16;
    }
    for (axis, mm) in spacing.iter().enumerate() {
        header.pixdim[axis + 1] = *mm;
    }

    // orientation is only known when the record carries both fields;
    // otherwise the header stays without an sform and the consumer must
    // treat the orientation as unknown
    if let (Some(direction), Some(origin)) = (&record.direction, &record.origin) {
        let affine = orientation_to_affine(direction, &spacing, origin);
        header.set_affine(&affine);
    }

    let voxels = record.data.to_bytes(Endianness::Little)?;
    Ok((header, voxels))
}

/// Decode a CBOR-serialized image record into a single-file `.nii` byte
/// stream: the 352-byte little-endian header immediately followed by the
/// voxel data.
pub fn decode_image(bytes: &[u8]) -> Result<Vec<u8>> {
    let record = ImageRecord::from_cbor(bytes)?;
    let (header, voxels) = image_to_nifti(&record)?;
    let mut out = header.to_bytes()?;
    out.extend_from_slice(&voxels);
    Ok(out)
}

/// Build an image record from a parsed NIfTI header and its voxel buffer.
///
/// The voxel bytes are re-typed per the header's data type, honoring the
/// byte order the header was parsed with. Orientation is populated only
/// for volumes of rank above 2, by the exact algebraic inverse of the
/// affine construction in [`image_to_nifti`].
pub fn encode_image(header: &NiftiHeader, voxels: &[u8]) -> Result<ImageRecord> {
    let rank = header.rank();
    if rank == 0 {
        return Err(ConvertError::InvalidFormat(
            "header declares no axes".to_owned(),
        ));
    }
    // a byte-swapped read can still leave dim[0] out of range, so the
    // bound must hold here before dim is indexed
    if rank > 7 {
        return Err(ConvertError::InvalidFormat(format!(
            "header declares {} axes but NIfTI-1 allows at most 7",
            rank
        )));
    }
    let datatype = header.data_type()?;
    let (component_type, pixel_type, components) = itk_datatype(datatype)?;

    let size: Vec<u64> = (0..rank).map(|a| u64::from(header.dim[a + 1])).collect();
    let spacing: Vec<f64> = (0..rank).map(|a| f64::from(header.pixdim[a + 1])).collect();

    let expected = expected_payload_len(size.iter().copied(), datatype.bitpix())?;
    if expected != voxels.len() {
        return Err(ConvertError::PayloadSizeMismatch(expected, voxels.len()));
    }

    let data = NumericBuffer::from_bytes(component_type, voxels, header.endianness)?;

    let (direction, origin) = if rank > 2 {
        let spacing3: Vec<f32> = (0..3).map(|a| header.pixdim[a + 1]).collect();
        let (d, o) = affine_to_orientation(&header.affine(), &spacing3);
        (Some(d.to_vec()), Some(o.to_vec()))
    } else {
        (None, None)
    };

    Ok(ImageRecord {
        image_type: ImageType {
            dimension: rank,
            component_type,
            pixel_type,
            components,
        },
        name: "image".to_owned(),
        origin,
        spacing: Some(spacing),
        direction,
        size,
        data,
    })
}

/// Build an image record from a parsed NIfTI header and voxel buffer, then
/// serialize it to CBOR.
pub fn encode_image_bytes(header: &NiftiHeader, voxels: &[u8]) -> Result<Vec<u8>> {
    encode_image(header, voxels)?.to_cbor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::{ComponentType, PixelType};

    fn scalar_record(size: Vec<u64>, data: NumericBuffer) -> ImageRecord {
        ImageRecord {
            image_type: ImageType {
                dimension: size.len(),
                component_type: data.component_type(),
                pixel_type: PixelType::Scalar,
                components: 1,
            },
            name: "image".to_owned(),
            origin: None,
            spacing: None,
            direction: None,
            size,
            data,
        }
    }

    #[test]
    fn zero_extent_axes_count_as_one() {
        // 2x0x2 clamps to 2x1x2 = 4 voxels
        let record = scalar_record(vec![2, 0, 2], NumericBuffer::Uint8(vec![0; 4]));
        let (header, voxels) = image_to_nifti(&record).unwrap();
        assert_eq!(header.dim[..4], [3, 2, 0, 2]);
        assert_eq!(voxels.len(), 4);
    }

    #[test]
    fn unsupported_component_type_is_rejected() {
        let record = scalar_record(vec![2], NumericBuffer::Int64(vec![0, 0]));
        assert!(matches!(
            image_to_nifti(&record),
            Err(ConvertError::UnsupportedBufferType(_))
        ));
    }

    #[test]
    fn rgb_voxels_use_24_bits() {
        let mut record = scalar_record(vec![2, 2], NumericBuffer::Uint8(vec![0; 12]));
        record.image_type.pixel_type = PixelType::Rgb;
        record.image_type.components = 3;
        let (header, voxels) = image_to_nifti(&record).unwrap();
        assert_eq!(header.datatype, 128);
        assert_eq!(header.bitpix, 24);
        assert_eq!(voxels.len(), 12);

        let wrong = ImageRecord {
            data: NumericBuffer::Uint8(vec![0; 4]),
            ..record
        };
        assert!(matches!(
            image_to_nifti(&wrong),
            Err(ConvertError::PayloadSizeMismatch(12, 4))
        ));
    }

    #[test]
    fn default_component_type_is_uint8() {
        let header = NiftiHeader {
            dim: [2, 2, 2, 0, 0, 0, 0, 0],
            datatype: 2,
            bitpix: 8,
            ..NiftiHeader::default()
        };
        let record = encode_image(&header, &[1, 2, 3, 4]).unwrap();
        assert_eq!(record.image_type.component_type, ComponentType::Uint8);
        assert_eq!(record.image_type.pixel_type, PixelType::Scalar);
        assert_eq!(record.size, vec![2, 2]);
        assert!(record.direction.is_none());
    }
}
