//! Conversion between ITK-Wasm mesh records and plain triangle meshes.
//!
//! The decode direction turns a generalized polygonal cell list into a
//! flat triangle list by fan triangulation; the encode direction emits one
//! triangle cell per input triangle. Point coordinates are flipped between
//! the record's LPS convention and the triangle mesh's RAS convention on
//! the way through.

use crate::affine::flip_lps_ras;
use crate::error::{ConvertError, Result};
use crate::record::{MeshRecord, MeshType, NumericBuffer};

/// Cell type code for a triangle in the generalized cell list.
pub const CELL_TRIANGLE: u32 = 2;
/// Cell type code for a quadrilateral in the generalized cell list.
pub const CELL_QUAD: u32 = 3;
/// Cell type code for an arbitrary polygon in the generalized cell list.
pub const CELL_POLYGON: u32 = 4;

/// A triangle mesh in RAS coordinates: flat 3D vertex positions and flat
/// 0-based triangle vertex indices, grouped in threes.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    /// Flat vertex coordinates, three per vertex
    pub positions: Vec<f32>,
    /// Flat triangle vertex indices, three per triangle
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// The number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// The number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Normalize the cell buffer to unsigned 32 bit integers.
///
/// 64 bit cell elements (signed or unsigned) are narrowed by retaining the
/// low 32 bits, matching the behavior of untyped runtimes which coerce
/// wide indices; narrower integer buffers are copied through unchanged.
/// Float buffers are rejected, since fractional vertex indices have no
/// meaning.
fn normalize_cells(cells: &NumericBuffer) -> Result<Vec<u32>> {
    match cells {
        NumericBuffer::Uint64(v) => Ok(v.iter().map(|x| *x as u32).collect()),
        NumericBuffer::Int64(v) => Ok(v.iter().map(|x| *x as u32).collect()),
        NumericBuffer::Uint32(v) => Ok(v.clone()),
        NumericBuffer::Int32(v) => Ok(v.iter().map(|x| *x as u32).collect()),
        NumericBuffer::Uint16(v) => Ok(v.iter().map(|x| u32::from(*x)).collect()),
        NumericBuffer::Int16(v) => Ok(v.iter().map(|x| *x as u32).collect()),
        NumericBuffer::Uint8(v) => Ok(v.iter().map(|x| u32::from(*x)).collect()),
        NumericBuffer::Int8(v) => Ok(v.iter().map(|x| *x as u32).collect()),
        other => Err(ConvertError::UnsupportedBufferType(format!(
            "{} cell buffer",
            other.component_type().as_tag()
        ))),
    }
}

/// Walk the cell list once, validating each record and handing
/// `(cell_count, first_vertex_offset)` to the given sink.
fn walk_cells<F>(cells: &[u32], mut visit: F) -> Result<()>
where
    F: FnMut(u32, usize),
{
    let mut i = 0;
    while i < cells.len() {
        if i + 2 > cells.len() {
            return Err(ConvertError::InvalidFormat(
                "truncated cell record".to_owned(),
            ));
        }
        let cell_type = cells[i];
        let cell_count = cells[i + 1];
        // no upper bound on the cell type: anything polygonal enough for a
        // fan is accepted
        if cell_type < CELL_TRIANGLE || cell_count < 3 {
            return Err(ConvertError::UnsupportedCellTopology(cell_type, cell_count));
        }
        if i + 2 + cell_count as usize > cells.len() {
            return Err(ConvertError::InvalidFormat(
                "cell record overruns the cell buffer".to_owned(),
            ));
        }
        visit(cell_count, i + 2);
        i += 2 + cell_count as usize;
    }
    Ok(())
}

/// Triangulate a mesh record into a plain triangle mesh.
///
/// Every cell with `n` vertices yields `n - 2` triangles by fan
/// triangulation from its first vertex; triangle cells pass through in
/// their input order. Positions are converted from LPS to RAS.
pub fn triangulate(record: &MeshRecord) -> Result<TriangleMesh> {
    let cells = normalize_cells(&record.cells)?;

    // first pass sizes the output exactly
    let mut triangle_count: usize = 0;
    walk_cells(&cells, |cell_count, _| {
        triangle_count += cell_count as usize - 2;
    })?;

    let mut indices = Vec::with_capacity(triangle_count * 3);
    walk_cells(&cells, |cell_count, first| {
        for t in 0..cell_count as usize - 2 {
            indices.push(cells[first]);
            indices.push(cells[first + 1 + t]);
            indices.push(cells[first + 2 + t]);
        }
    })?;

    let mut positions = record.points.to_f32_vec();
    flip_lps_ras(&mut positions);

    Ok(TriangleMesh { positions, indices })
}

/// Decode a CBOR-serialized mesh record into a triangle mesh.
pub fn decode_mesh(bytes: &[u8]) -> Result<TriangleMesh> {
    triangulate(&MeshRecord::from_cbor(bytes)?)
}

/// Encode a triangle mesh as an ITK-Wasm mesh record.
///
/// Each input triangle becomes one 5-element triangle cell
/// `[2, 3, i, j, k]`, widened to unsigned 64 bit. Positions are assumed to
/// be in RAS convention and are stored flipped to LPS.
pub fn encode_mesh(positions: &[f32], indices: &[u32]) -> MeshRecord {
    let triangle_count = indices.len() / 3;

    let mut cells = Vec::with_capacity(triangle_count * 5);
    for tri in indices.chunks_exact(3) {
        cells.push(u64::from(CELL_TRIANGLE));
        cells.push(3u64);
        cells.push(u64::from(tri[0]));
        cells.push(u64::from(tri[1]));
        cells.push(u64::from(tri[2]));
    }

    let mut points = positions.to_vec();
    flip_lps_ras(&mut points);

    MeshRecord {
        mesh_type: MeshType::triangle(),
        name: "mesh".to_owned(),
        number_of_points: (positions.len() / 3) as u64,
        points: NumericBuffer::Float32(points),
        number_of_point_pixels: 0,
        number_of_cells: triangle_count as u64,
        cell_buffer_size: (triangle_count * 5) as u64,
        cells: NumericBuffer::Uint64(cells),
        number_of_cell_pixels: 0,
    }
}

/// Encode a triangle mesh directly to a CBOR-serialized mesh record.
pub fn encode_mesh_bytes(positions: &[f32], indices: &[u32]) -> Result<Vec<u8>> {
    encode_mesh(positions, indices).to_cbor()
}
