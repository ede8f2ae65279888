//! Orientation handling: the LPS↔RAS sign convention and the construction
//! of the NIfTI 4×4 affine from an ITK-Wasm direction matrix, spacing and
//! origin, together with its algebraic inverse.
//!
//! ITK-Wasm stores geometry in LPS coordinates while NIfTI world space is
//! RAS. The two differ by a sign flip of the first two axes, so the same
//! negation converts in either direction and applying it twice is the
//! identity, bit for bit.

use nalgebra::{Matrix3, Matrix4};

/// A 3x3 affine matrix.
pub type Affine3 = Matrix3<f32>;
/// A 4x4 affine matrix.
pub type Affine4 = Matrix4<f32>;

/// The sign with which world axis `k` enters the LPS↔RAS conversion.
#[inline]
fn axis_sign(k: usize) -> f32 {
    if k < 2 {
        -1.0
    } else {
        1.0
    }
}

/// Flip a flat buffer of 3D points between LPS and RAS in place,
/// by negating the first two components of every 3-tuple.
///
/// The operation is its own inverse.
pub fn flip_lps_ras(points: &mut [f32]) {
    for p in points.chunks_exact_mut(3) {
        p[0] = -p[0];
        p[1] = -p[1];
    }
}

/// Build the NIfTI sform affine from a row-major 3×3 direction cosine
/// matrix, per-axis spacing and an origin, all given in LPS convention.
///
/// Column `j` of the rotational part is the direction of voxel axis `j`
/// scaled by its spacing, with the first two world rows negated for the
/// LPS→RAS flip; the translation column holds the origin under the same
/// sign rule. Missing spacing entries default to 1.
pub fn orientation_to_affine(direction: &[f64], spacing: &[f32], origin: &[f64]) -> Affine4 {
    let mut affine = Affine4::identity();
    for j in 0..3 {
        let mm = spacing.get(j).copied().unwrap_or(1.0);
        for k in 0..3 {
            let d = direction.get(3 * j + k).copied().unwrap_or(0.0) as f32;
            affine[(k, j)] = axis_sign(k) * mm * d;
        }
    }
    for k in 0..3 {
        let o = origin.get(k).copied().unwrap_or(0.0) as f32;
        affine[(k, 3)] = axis_sign(k) * o;
    }
    affine
}

/// Recover the row-major direction cosine matrix and the LPS origin from a
/// NIfTI sform affine and per-axis spacing. Exact algebraic inverse of
/// [`orientation_to_affine`], up to floating point rounding.
pub fn affine_to_orientation(affine: &Affine4, spacing: &[f32]) -> ([f64; 9], [f64; 3]) {
    let mut direction = [0.0f64; 9];
    for j in 0..3 {
        let mm = spacing.get(j).copied().unwrap_or(1.0);
        for k in 0..3 {
            direction[3 * j + k] = (affine[(k, j)] / (axis_sign(k) * mm)) as f64;
        }
    }
    let origin = [
        -affine[(0, 3)] as f64,
        -affine[(1, 3)] as f64,
        affine[(2, 3)] as f64,
    ];
    (direction, origin)
}
