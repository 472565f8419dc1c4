//! Rotation and spherical-coordinate helpers for equirectangular mapping.
//!
//! Conventions: `x` points right, `y` points down and `z` points forward.
//! Longitude `theta` spans `[-pi, pi)` across the panorama with `0` at the
//! centre column; latitude `phi` goes from `pi/2` at the top row to `-pi/2`
//! at the bottom.

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// Rotation about the x axis (pitch), angle in radians.
pub fn rotation_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// Rotation about the y axis (yaw), angle in radians.
pub fn rotation_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// Rotation about the z axis (roll), angle in radians.
pub fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Camera orientation `Rz(roll) * Ry(yaw) * Rx(pitch)`, angles in degrees.
///
/// # Examples
///
/// ```rust
/// use equirect_tools::geometry::rotation_matrix;
/// use nalgebra::Matrix3;
///
/// let r = rotation_matrix(0.0, 0.0, 0.0);
/// assert_eq!(r, Matrix3::identity());
/// ```
pub fn rotation_matrix(yaw: f64, pitch: f64, roll: f64) -> Matrix3<f64> {
    rotation_z(roll.to_radians()) * rotation_y(yaw.to_radians()) * rotation_x(pitch.to_radians())
}

/// Longitude and latitude `(theta, phi)` of the output pixel at `(row, col)`
/// in a `width` x `height` equirectangular image.
#[inline]
pub fn equirect_angles(row: usize, col: usize, width: usize, height: usize) -> (f64, f64) {
    let theta = (col as f64 / width as f64) * 2.0 * PI - PI;
    let phi = (0.5 - row as f64 / height as f64) * PI;
    (theta, phi)
}

/// Unit direction for longitude `theta` and latitude `phi`.
///
/// `(0, 0)` is the forward axis `+z`; positive latitude points up, which is
/// `-y` in image-aligned coordinates.
#[inline]
pub fn spherical_direction(theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vector3::new(cos_phi * sin_theta, -sin_phi, cos_phi * cos_theta)
}

/// Maps a pixel coordinate in `[0, size - 1]` to `[-1, 1]` with corner
/// alignment: the first and last pixel centres land on `-1` and `1`.
///
/// A single-pixel axis maps everything to `0`.
#[inline]
pub fn normalize_grid_coordinate(coord: f64, size: usize) -> f64 {
    if size <= 1 {
        return 0.0;
    }
    (coord / (size - 1) as f64) * 2.0 - 1.0
}

/// Inverse of [`normalize_grid_coordinate`].
#[inline]
pub fn unnormalize_grid_coordinate(grid: f64, size: usize) -> f64 {
    if size <= 1 {
        return 0.0;
    }
    (grid + 1.0) / 2.0 * (size - 1) as f64
}
