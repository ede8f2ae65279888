//! This module defines the `NiftiHeader` struct, the parsed form of a
//! NIfTI-1 header. It owns the exact on-disk field layout: parsing from a
//! byte stream (with byte order auto-detection) and serialization of the
//! 352-byte single-file header.

use byteordered::{ByteOrdered, Endianness};
use num_traits::FromPrimitive;
use std::io::{Read, Write};

use crate::affine::Affine4;
use crate::error::{ConvertError, Result};
use crate::typedef::NiftiType;

/// Magic code for NIFTI-1 header files (extension ".hdr").
pub const MAGIC_CODE_NI1: &[u8; 4] = b"ni1\0";
/// Magic code for full NIFTI-1 files (extension ".nii").
pub const MAGIC_CODE_NIP1: &[u8; 4] = b"n+1\0";

/// The offset at which voxel data starts in a single-file NIfTI-1 stream:
/// the 348-byte header plus the 4-byte extender.
pub const VOXEL_OFFSET: u32 = 352;

/// The NIFTI-1 header data type.
/// All fields are public and named after the specification's header file.
/// The type of each field was adjusted according to their use and
/// array limitations.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    /// Header size, must be 348
    pub sizeof_hdr: i32,
    /// Unused in NIFTI-1
    pub data_type: [u8; 10],
    /// Unused in NIFTI-1
    pub db_name: [u8; 18],
    /// Unused in NIFTI-1
    pub extents: i32,
    /// Unused in NIFTI-1
    pub session_error: i16,
    /// Unused in NIFTI-1
    pub regular: u8,
    /// MRI slice ordering
    pub dim_info: u8,
    /// Data array dimensions
    pub dim: [u16; 8],
    /// 1st intent parameter
    pub intent_p1: f32,
    /// 2nd intent parameter
    pub intent_p2: f32,
    /// 3rd intent parameter
    pub intent_p3: f32,
    /// NIFTI_INTENT_* code
    pub intent_code: i16,
    /// Defines the data type!
    pub datatype: i16,
    /// Number of bits per voxel
    pub bitpix: i16,
    /// First slice index
    pub slice_start: i16,
    /// Grid spacings
    pub pixdim: [f32; 8],
    /// Offset into .nii file to reach the volume
    pub vox_offset: f32,
    /// Data scaling: slope
    pub scl_slope: f32,
    /// Data scaling: offset
    pub scl_inter: f32,
    /// Last slice index
    pub slice_end: i16,
    /// Slice timing order
    pub slice_code: u8,
    /// Units of pixdim[1..4]
    pub xyzt_units: u8,
    /// Max display intensity
    pub cal_max: f32,
    /// Min display intensity
    pub cal_min: f32,
    /// Time for 1 slice
    pub slice_duration: f32,
    /// Time axis shift
    pub toffset: f32,
    /// Unused in NIFTI-1
    pub glmax: i32,
    /// Unused in NIFTI-1
    pub glmin: i32,

    /// Any text you like, exactly 80 bytes
    pub descrip: Vec<u8>,
    /// Auxiliary filename
    pub aux_file: [u8; 24],
    /// NIFTI_XFORM_* code
    pub qform_code: i16,
    /// NIFTI_XFORM_* code
    pub sform_code: i16,
    /// Quaternion b param
    pub quatern_b: f32,
    /// Quaternion c param
    pub quatern_c: f32,
    /// Quaternion d param
    pub quatern_d: f32,
    /// Quaternion x shift
    pub quatern_x: f32,
    /// Quaternion y shift
    pub quatern_y: f32,
    /// Quaternion z shift
    pub quatern_z: f32,

    /// 1st row affine transform
    pub srow_x: [f32; 4],
    /// 2nd row affine transform
    pub srow_y: [f32; 4],
    /// 3rd row affine transform
    pub srow_z: [f32; 4],

    /// 'name' or meaning of data
    pub intent_name: [u8; 16],

    /// Magic code. Must be `b"ni1\0"` or `b"n+1\0"`
    pub magic: [u8; 4],

    /// Original data Endianness
    pub endianness: Endianness,
}

impl Default for NiftiHeader {
    fn default() -> NiftiHeader {
        NiftiHeader {
            sizeof_hdr: 348,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: 0,
            dim_info: 0,
            dim: [1, 0, 0, 0, 0, 0, 0, 0],
            intent_p1: 0.,
            intent_p2: 0.,
            intent_p3: 0.,
            intent_code: 0,
            datatype: 0,
            bitpix: 0,
            slice_start: 0,
            pixdim: [0.; 8],
            vox_offset: VOXEL_OFFSET as f32,
            scl_slope: 0.,
            scl_inter: 0.,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: 0,
            cal_max: 0.,
            cal_min: 0.,
            slice_duration: 0.,
            toffset: 0.,
            glmax: 0,
            glmin: 0,

            descrip: vec![0; 80],
            aux_file: [0; 24],
            qform_code: 0,
            sform_code: 0,
            quatern_b: 0.,
            quatern_c: 0.,
            quatern_d: 0.,
            quatern_x: 0.,
            quatern_y: 0.,
            quatern_z: 0.,

            srow_x: [0.; 4],
            srow_y: [0.; 4],
            srow_z: [0.; 4],

            intent_name: [0; 16],

            magic: *MAGIC_CODE_NIP1,

            endianness: Endianness::Little,
        }
    }
}

impl NiftiHeader {
    /// Read a NIfTI-1 header, along with its byte order, from the given
    /// byte source. It is assumed that the input is currently at the start
    /// of the header.
    pub fn from_reader<S: Read>(input: S) -> Result<NiftiHeader> {
        parse_header_1(input)
    }

    /// Get the data type as a validated enum.
    pub fn data_type(&self) -> Result<NiftiType> {
        FromPrimitive::from_i16(self.datatype)
            .ok_or(ConvertError::InvalidCode("datatype", self.datatype))
    }

    /// The number of axes of the data array, from `dim[0]`.
    pub fn rank(&self) -> usize {
        usize::from(self.dim[0])
    }

    /// Retrieve the sform affine from the header's `srow_*` fields.
    pub fn affine(&self) -> Affine4 {
        #[rustfmt::skip]
        let affine = Affine4::new(
            self.srow_x[0], self.srow_x[1], self.srow_x[2], self.srow_x[3],
            self.srow_y[0], self.srow_y[1], self.srow_y[2], self.srow_y[3],
            self.srow_z[0], self.srow_z[1], self.srow_z[2], self.srow_z[3],
            0.0, 0.0, 0.0, 1.0,
        );
        affine
    }

    /// Store the given affine into the `srow_*` fields and mark the sform
    /// as a scanner-based transformation (`sform_code = 1`).
    pub fn set_affine(&mut self, affine: &Affine4) {
        for c in 0..4 {
            self.srow_x[c] = affine[(0, c)];
            self.srow_y[c] = affine[(1, c)];
            self.srow_z[c] = affine[(2, c)];
        }
        self.sform_code = 1;
    }

    /// Serialize this header in the single-file NIfTI-1 layout: the 348
    /// header bytes followed by the 4-byte extender, always little-endian.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = ByteOrdered::le(writer);
        writer.write_i32(self.sizeof_hdr)?;
        writer.write_all(&self.data_type)?;
        writer.write_all(&self.db_name)?;
        writer.write_i32(self.extents)?;
        writer.write_i16(self.session_error)?;
        writer.write_u8(self.regular)?;
        writer.write_u8(self.dim_info)?;
        for s in &self.dim {
            writer.write_u16(*s)?;
        }
        writer.write_f32(self.intent_p1)?;
        writer.write_f32(self.intent_p2)?;
        writer.write_f32(self.intent_p3)?;
        writer.write_i16(self.intent_code)?;
        writer.write_i16(self.datatype)?;
        writer.write_i16(self.bitpix)?;
        writer.write_i16(self.slice_start)?;
        for f in &self.pixdim {
            writer.write_f32(*f)?;
        }
        writer.write_f32(self.vox_offset)?;
        writer.write_f32(self.scl_slope)?;
        writer.write_f32(self.scl_inter)?;
        writer.write_i16(self.slice_end)?;
        writer.write_u8(self.slice_code)?;
        writer.write_u8(self.xyzt_units)?;
        writer.write_f32(self.cal_max)?;
        writer.write_f32(self.cal_min)?;
        writer.write_f32(self.slice_duration)?;
        writer.write_f32(self.toffset)?;
        writer.write_i32(self.glmax)?;
        writer.write_i32(self.glmin)?;

        debug_assert_eq!(self.descrip.len(), 80);
        writer.write_all(&self.descrip)?;
        writer.write_all(&self.aux_file)?;
        writer.write_i16(self.qform_code)?;
        writer.write_i16(self.sform_code)?;
        for f in &[
            self.quatern_b,
            self.quatern_c,
            self.quatern_d,
            self.quatern_x,
            self.quatern_y,
            self.quatern_z,
        ] {
            writer.write_f32(*f)?;
        }
        for f in self.srow_x.iter().chain(&self.srow_y).chain(&self.srow_z) {
            writer.write_f32(*f)?;
        }
        writer.write_all(&self.intent_name)?;
        writer.write_all(&self.magic)?;

        // Empty 4 bytes after the header
        writer.write_u32(0)?;

        Ok(())
    }

    /// Serialize this header to its 352-byte representation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(VOXEL_OFFSET as usize);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn parse_header_1<S: Read>(input: S) -> Result<NiftiHeader> {
    let mut h = NiftiHeader::default();

    // produced files are little-endian, so try that first
    let mut input = ByteOrdered::runtime(input, Endianness::Little);

    h.sizeof_hdr = input.read_i32()?;
    input.read_exact(&mut h.data_type)?;
    input.read_exact(&mut h.db_name)?;
    h.extents = input.read_i32()?;
    h.session_error = input.read_i16()?;
    h.regular = input.read_u8()?;
    h.dim_info = input.read_u8()?;
    h.dim[0] = input.read_u16()?;

    if h.dim[0] > 7 {
        h.endianness = Endianness::Big;

        // swap bytes read so far, continue with the opposite endianness
        h.sizeof_hdr = h.sizeof_hdr.swap_bytes();
        h.extents = h.extents.swap_bytes();
        h.session_error = h.session_error.swap_bytes();
        h.dim[0] = h.dim[0].swap_bytes();
        let input = ByteOrdered::runtime(input.into_inner(), Endianness::Big);
        parse_header_2(h, input)
    } else {
        h.endianness = Endianness::Little;
        parse_header_2(h, input)
    }
}

/// second part of header parsing
fn parse_header_2<S: Read>(
    mut h: NiftiHeader,
    mut input: ByteOrdered<S, Endianness>,
) -> Result<NiftiHeader> {
    for v in &mut h.dim[1..] {
        *v = input.read_u16()?;
    }
    h.intent_p1 = input.read_f32()?;
    h.intent_p2 = input.read_f32()?;
    h.intent_p3 = input.read_f32()?;
    h.intent_code = input.read_i16()?;
    h.datatype = input.read_i16()?;
    h.bitpix = input.read_i16()?;
    h.slice_start = input.read_i16()?;
    for v in &mut h.pixdim {
        *v = input.read_f32()?;
    }
    h.vox_offset = input.read_f32()?;
    h.scl_slope = input.read_f32()?;
    h.scl_inter = input.read_f32()?;
    h.slice_end = input.read_i16()?;
    h.slice_code = input.read_u8()?;
    h.xyzt_units = input.read_u8()?;
    h.cal_max = input.read_f32()?;
    h.cal_min = input.read_f32()?;
    h.slice_duration = input.read_f32()?;
    h.toffset = input.read_f32()?;
    h.glmax = input.read_i32()?;
    h.glmin = input.read_i32()?;

    // descrip is 80-elem vec already
    input.read_exact(h.descrip.as_mut_slice())?;
    input.read_exact(&mut h.aux_file)?;
    h.qform_code = input.read_i16()?;
    h.sform_code = input.read_i16()?;
    h.quatern_b = input.read_f32()?;
    h.quatern_c = input.read_f32()?;
    h.quatern_d = input.read_f32()?;
    h.quatern_x = input.read_f32()?;
    h.quatern_y = input.read_f32()?;
    h.quatern_z = input.read_f32()?;
    for v in &mut h.srow_x {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_y {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_z {
        *v = input.read_f32()?;
    }
    input.read_exact(&mut h.intent_name)?;
    input.read_exact(&mut h.magic)?;

    debug_assert_eq!(h.descrip.len(), 80);

    if &h.magic != MAGIC_CODE_NI1 && &h.magic != MAGIC_CODE_NIP1 {
        Err(ConvertError::InvalidFormat(
            "not a NIfTI-1 header (bad magic)".to_owned(),
        ))
    } else {
        Ok(h)
    }
}
