#[macro_use]
extern crate approx;

use itkwasm_nifti::affine::{affine_to_orientation, flip_lps_ras, orientation_to_affine, Affine4};

#[test]
fn flip_twice_is_bit_identical() {
    let original: Vec<f32> = vec![
        0.1, -0.2, 0.3, //
        f32::MIN_POSITIVE,
        -1e30,
        5.5, //
        -0.0,
        0.0,
        123.456,
    ];
    let mut points = original.clone();
    flip_lps_ras(&mut points);
    flip_lps_ras(&mut points);
    for (got, expected) in points.iter().zip(&original) {
        assert_eq!(got.to_bits(), expected.to_bits());
    }
}

#[test]
#[rustfmt::skip]
fn axis_aligned_affine() {
    let direction = [
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
    ];
    let spacing = [0.9375f32, 0.9375, 3.0];
    let origin = [59.5, -73.25, 43.0];

    let affine = orientation_to_affine(&direction, &spacing, &origin);
    let expected = Affine4::new(
        -0.9375,  0.0,    0.0, -59.5,
         0.0,    -0.9375, 0.0,  73.25,
         0.0,     0.0,    3.0,  43.0,
         0.0,     0.0,    0.0,   1.0,
    );
    assert_eq!(affine, expected);
}

#[test]
fn rotated_affine_round_trips() {
    // 90 degree rotation around z in the direction cosines
    let direction = [
        0.0, 1.0, 0.0, //
        -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
    ];
    let spacing = [1.25f32, 1.25, 4.0];
    let origin = [-12.5, 7.75, 105.0];

    let affine = orientation_to_affine(&direction, &spacing, &origin);
    let (dir_back, origin_back) = affine_to_orientation(&affine, &spacing);

    for (got, expected) in dir_back.iter().zip(&direction) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-6);
    }
    for (got, expected) in origin_back.iter().zip(&origin) {
        assert_abs_diff_eq!(*got, *expected, epsilon = 1e-5);
    }
}

#[test]
fn missing_spacing_defaults_to_unit() {
    let direction = [
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, //
    ];
    let affine = orientation_to_affine(&direction, &[], &[0.0, 0.0, 0.0]);
    assert_eq!(affine[(0, 0)], -1.0);
    assert_eq!(affine[(1, 1)], -1.0);
    assert_eq!(affine[(2, 2)], 1.0);
}
