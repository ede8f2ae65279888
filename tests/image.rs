#[macro_use]
extern crate pretty_assertions;
#[macro_use]
extern crate approx;

use ciborium::value::Value;
use itkwasm_nifti::{
    decode_image, encode_image, image_to_nifti, ConvertError, ImageRecord, ImageType, NiftiHeader,
    NumericBuffer, PixelType,
};

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
fn minimal_volume_header() {
    let record = scalar_record(vec![4, 4, 2], NumericBuffer::Uint8((0..32).collect()));
    let (header, voxels) = image_to_nifti(&record).unwrap();

    let expected = NiftiHeader {
        dim: [3, 4, 4, 2, 0, 0, 0, 0],
        datatype: 2,
        bitpix: 8,
        pixdim: [0., 1., 1., 1., 0., 0., 0., 0.],
        scl_slope: 1.,
        scl_inter: 0.,
        ..NiftiHeader::default()
    };
    assert_eq!(header, expected);
    assert_eq!(header.vox_offset, 352.);
    assert_eq!(&header.magic, b"n+1\0");
    assert_eq!(header.sform_code, 0);
    assert_eq!(voxels, (0..32).collect::<Vec<u8>>());
}

#[test]
fn nii_stream_parses_back() {
    let mut record = scalar_record(
        vec![2, 3],
        NumericBuffer::Int16(vec![-1, 0, 1, 256, -256, 513]),
    );
    record.spacing = Some(vec![0.5, 2.0]);
    let bytes = record.to_cbor().unwrap();

    let nii = decode_image(&bytes).unwrap();
    assert_eq!(nii.len(), 352 + 12);

    let header = NiftiHeader::from_reader(&nii[..352]).unwrap();
    assert_eq!(header.dim[..3], [2, 2, 3]);
    assert_eq!(header.datatype, 4);
    assert_eq!(header.bitpix, 16);
    assert_eq!(header.pixdim[1..3], [0.5, 2.0]);
    assert_eq!(header.vox_offset, 352.);
    assert_eq!(header.scl_slope, 1.);
    assert_eq!(header.scl_inter, 0.);

    // little-endian voxels follow the header
    assert_eq!(&nii[352..356], &[0xFF, 0xFF, 0x00, 0x00]);
}

#[test]
fn datatype_table_round_trips_through_both_directions() {
    let cases: Vec<(NumericBuffer, PixelType, i16, i16)> = vec![
        (NumericBuffer::Uint8(vec![0; 8]), PixelType::Scalar, 2, 8),
        (NumericBuffer::Int16(vec![0; 8]), PixelType::Scalar, 4, 16),
        (NumericBuffer::Int32(vec![0; 8]), PixelType::Scalar, 8, 32),
        (NumericBuffer::Float32(vec![0.; 8]), PixelType::Scalar, 16, 32),
        (NumericBuffer::Float64(vec![0.; 8]), PixelType::Scalar, 64, 64),
        (NumericBuffer::Uint8(vec![0; 24]), PixelType::Rgb, 128, 24),
        (NumericBuffer::Uint16(vec![0; 8]), PixelType::Scalar, 512, 16),
    ];

    for (data, pixel_type, code, bits) in cases {
        let mut record = scalar_record(vec![2, 2, 2], data);
        record.image_type.pixel_type = pixel_type;
        if pixel_type == PixelType::Rgb {
            record.image_type.components = 3;
        }

        let (header, voxels) = image_to_nifti(&record).unwrap();
        assert_eq!(header.datatype, code, "code for datatype {}", code);
        assert_eq!(header.bitpix, bits, "bitpix for datatype {}", code);

        // back through the encoder: same code, same width, same payload
        let back = encode_image(&header, &voxels).unwrap();
        assert_eq!(back.image_type.pixel_type, pixel_type);
        assert_eq!(back.image_type.components, record.image_type.components);
        let (header2, voxels2) = image_to_nifti(&back).unwrap();
        assert_eq!(header2.datatype, code);
        assert_eq!(header2.bitpix, bits);
        assert_eq!(voxels2, voxels);
    }
}

#[test]
fn payload_size_mismatch_reports_both_lengths() {
    let record = scalar_record(vec![2, 2, 2], NumericBuffer::Uint8(vec![0; 7]));
    match image_to_nifti(&record) {
        Err(ConvertError::PayloadSizeMismatch(expected, actual)) => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 7);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    // same failure through the byte-level entry point
    let bytes = record.to_cbor().unwrap();
    assert!(matches!(
        decode_image(&bytes),
        Err(ConvertError::PayloadSizeMismatch(8, 7))
    ));
}

#[test]
fn missing_size_field_is_a_schema_error() {
    let record = scalar_record(vec![2], NumericBuffer::Uint8(vec![0, 0]));
    let mut value = record.to_value().unwrap();
    if let Value::Map(entries) = &mut value {
        entries.retain(|(k, _)| !matches!(k, Value::Text(t) if t == "size"));
    }
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&value, &mut bytes).unwrap();

    assert!(matches!(
        decode_image(&bytes),
        Err(ConvertError::MissingField("size"))
    ));
}

#[test]
fn orientation_survives_a_round_trip() {
    let direction = vec![
        0.0, 1.0, 0.0, //
        -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
    ];
    let origin = vec![-90.0, 126.5, -72.25];
    let spacing = vec![2.0, 2.0, 2.5];

    let mut record = scalar_record(vec![4, 4, 4], NumericBuffer::Float32(vec![0.0; 64]));
    record.direction = Some(direction.clone());
    record.origin = Some(origin.clone());
    record.spacing = Some(spacing.clone());

    let (header, voxels) = image_to_nifti(&record).unwrap();
    assert_eq!(header.sform_code, 1);
    // first voxel axis points along -y after the LPS flip of row 1
    assert_eq!(header.srow_x, [0.0, 2.0, 0.0, 90.0]);
    assert_eq!(header.srow_y, [-2.0, 0.0, 0.0, -126.5]);
    assert_eq!(header.srow_z, [0.0, 0.0, 2.5, -72.25]);

    let back = encode_image(&header, &voxels).unwrap();
    let dir_back = back.direction.unwrap();
    let origin_back = back.origin.unwrap();
    for (got, expected) in dir_back.iter().zip(&direction) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-6);
    }
    for (got, expected) in origin_back.iter().zip(&origin) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-5);
    }
    assert_eq!(back.spacing.unwrap(), spacing);
}

#[test]
fn byte_swapped_rank_out_of_range_is_rejected() {
    // dim[0] = 2048 little-endian triggers the byte-order swap on parse
    // and comes out as 8, one past what dim can index
    let mut bytes = NiftiHeader::default().to_bytes().unwrap();
    bytes[40..42].copy_from_slice(&2048u16.to_le_bytes());

    let header = NiftiHeader::from_reader(&bytes[..]).unwrap();
    assert_eq!(header.rank(), 8);
    assert!(matches!(
        encode_image(&header, &[]),
        Err(ConvertError::InvalidFormat(_))
    ));
}

#[test]
fn huge_voxel_counts_do_not_wrap() {
    // 65535^7 voxels cannot be represented, let alone matched to a payload
    let record = scalar_record(vec![65535; 7], NumericBuffer::Uint8(vec![0; 8]));
    assert!(matches!(
        image_to_nifti(&record),
        Err(ConvertError::InvalidFormat(_))
    ));
    let bytes = record.to_cbor().unwrap();
    assert!(matches!(
        decode_image(&bytes),
        Err(ConvertError::InvalidFormat(_))
    ));

    let header = NiftiHeader {
        dim: [7, 65535, 65535, 65535, 65535, 65535, 65535, 65535],
        datatype: 2,
        bitpix: 8,
        ..NiftiHeader::default()
    };
    assert!(matches!(
        encode_image(&header, &[0; 8]),
        Err(ConvertError::InvalidFormat(_))
    ));
}

#[test]
fn extent_wider_than_dim_field_is_rejected() {
    // 70000 fits the payload check but not a 16-bit dim entry
    let record = scalar_record(vec![70_000], NumericBuffer::Uint8(vec![0; 70_000]));
    assert!(matches!(
        image_to_nifti(&record),
        Err(ConvertError::InvalidFormat(_))
    ));
}

#[test]
fn unknown_datatype_code_is_rejected() {
    let header = NiftiHeader {
        dim: [1, 4, 0, 0, 0, 0, 0, 0],
        datatype: 3,
        ..NiftiHeader::default()
    };
    assert!(matches!(
        encode_image(&header, &[0; 4]),
        Err(ConvertError::InvalidCode("datatype", 3))
    ));

    let header = NiftiHeader {
        dim: [1, 4, 0, 0, 0, 0, 0, 0],
        datatype: 256, // int8 is a valid NIfTI code with no mapping here
        bitpix: 8,
        ..NiftiHeader::default()
    };
    assert!(matches!(
        encode_image(&header, &[0; 4]),
        Err(ConvertError::UnsupportedDataType(_))
    ));
}
