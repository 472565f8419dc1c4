//! Implements the pinhole camera used as the source of an equirectangular projection.
//!
//! The [`PinholeModel`] holds intrinsics derived from a [`CameraParams`] and the
//! resolution of the source image. Projection reports failures as `None`
//! rather than an error: a ray that misses the image is an ordinary outcome
//! for most pixels of a panorama.

use crate::camera::{validation, CameraParams, Intrinsics, Resolution};
use crate::error::EquirectError;
use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Minimum camera-space depth for a ray to count as being in front of the camera.
pub const MIN_DEPTH: f64 = 1e-6;

/// Represents a distortion-free pinhole camera.
///
/// # Examples
///
/// ```rust
/// use equirect_tools::camera::{CameraParams, PinholeModel, Resolution};
/// use nalgebra::Vector3;
///
/// let resolution = Resolution { width: 640, height: 480 };
/// let model = PinholeModel::from_camera(&CameraParams::new(90.0, 0.0, 0.0, 0.0), resolution).unwrap();
///
/// // The optical axis lands on the principal point.
/// let center = model.project(&Vector3::new(0.0, 0.0, 1.0)).unwrap();
/// assert_eq!(center.x, 320.0);
/// assert_eq!(center.y, 240.0);
///
/// // Rays behind the camera do not project.
/// assert!(model.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinholeModel {
    /// The intrinsic parameters of the camera, [`Intrinsics`] (fx, fy, cx, cy).
    pub intrinsics: Intrinsics,
    /// The resolution of the camera image, [`Resolution`] (width, height).
    pub resolution: Resolution,
}

impl PinholeModel {
    /// Builds the pinhole model for an image of `resolution` pixels seen through `params`.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidParameter`] if the field of view is degenerate
    ///   or the resolution is empty.
    pub fn from_camera(
        params: &CameraParams,
        resolution: Resolution,
    ) -> Result<Self, EquirectError> {
        let intrinsics = params.intrinsics_for(&resolution)?;
        let model = PinholeModel {
            intrinsics,
            resolution,
        };
        model.validate_params()?;
        Ok(model)
    }

    /// Projects a camera-space ray to pixel coordinates.
    ///
    /// `u = fx * X / Z + cx`, `v = fy * Y / Z + cy`.
    ///
    /// Returns `None` when the ray is not in front of the camera
    /// (`Z <= MIN_DEPTH`), when the result is not finite, or when it falls
    /// outside `[0, width) x [0, height)`.
    #[inline]
    pub fn project(&self, ray: &Vector3<f64>) -> Option<Vector2<f64>> {
        if ray.z.is_nan() || ray.z <= MIN_DEPTH {
            return None;
        }
        let u = (ray.x / ray.z) * self.intrinsics.fx + self.intrinsics.cx;
        let v = (ray.y / ray.z) * self.intrinsics.fy + self.intrinsics.cy;

        if !u.is_finite() || !v.is_finite() {
            return None;
        }
        if u < 0.0
            || u >= self.resolution.width as f64
            || v < 0.0
            || v >= self.resolution.height as f64
        {
            return None;
        }

        Some(Vector2::new(u, v))
    }

    /// Unprojects a pixel to a unit ray in camera coordinates.
    ///
    /// Returns `None` for pixels outside the image.
    pub fn unproject(&self, point_2d: &Vector2<f64>) -> Option<Vector3<f64>> {
        if point_2d.x < 0.0
            || point_2d.x >= self.resolution.width as f64
            || point_2d.y < 0.0
            || point_2d.y >= self.resolution.height as f64
        {
            return None;
        }

        let mx = (point_2d.x - self.intrinsics.cx) / self.intrinsics.fx;
        let my = (point_2d.y - self.intrinsics.cy) / self.intrinsics.fy;

        Some(Vector3::new(mx, my, 1.0).normalize())
    }

    pub fn validate_params(&self) -> Result<(), EquirectError> {
        validation::validate_intrinsics(&self.intrinsics)
    }
}
