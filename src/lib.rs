//! Conversion between ITK-Wasm CBOR records and the NIfTI-1 file format.
//!
//! This crate converts ITK-Wasm image (`.iwi.cbor`) and mesh (`.iwm.cbor`)
//! records to and from single-file little-endian NIfTI-1 byte streams and
//! plain triangle meshes (flat vertex positions plus flat 0-based triangle
//! indices). ITK-Wasm geometry is stored in LPS convention while NIfTI
//! world space and the triangle mesh representation are RAS; the sign flip
//! between the two is applied consistently in both directions.
//!
//! All operations are pure, synchronous transforms over in-memory buffers.
//! Reading and writing files is left to the caller.
//!
//! # Examples
//!
//! ```no_run
//! use itkwasm_nifti::{decode_mesh, encode_mesh_bytes};
//! # use itkwasm_nifti::Result;
//!
//! # fn run() -> Result<()> {
//! # let record_bytes: &[u8] = &[];
//! let mesh = decode_mesh(record_bytes)?;
//! let round_tripped = encode_mesh_bytes(&mesh.positions, &mesh.indices)?;
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate num_derive;

pub mod affine;
pub mod error;
pub mod header;
pub mod image;
pub mod mesh;
pub mod record;
pub mod typedef;

pub use byteordered::Endianness;

pub use crate::error::{ConvertError, Result};
pub use crate::header::NiftiHeader;
pub use crate::image::{decode_image, encode_image, encode_image_bytes, image_to_nifti};
pub use crate::mesh::{decode_mesh, encode_mesh, encode_mesh_bytes, triangulate, TriangleMesh};
pub use crate::record::{ImageRecord, ImageType, MeshRecord, MeshType, NumericBuffer};
pub use crate::typedef::{ComponentType, NiftiType, PixelType};
