//! Camera description used by the equirectangular projector.
//!
//! A camera is given by its horizontal field of view and its orientation
//! (yaw, pitch, roll), all in degrees. The vertical field of view is never
//! supplied: it is derived from the horizontal one and the aspect ratio of the
//! image being projected, see [`CameraParams::vfov_for`]. From these values a
//! [`pinhole::PinholeModel`] with centred principal point is built.

pub mod pinhole;

pub use pinhole::PinholeModel;

use crate::error::EquirectError;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Size of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Field of view and orientation of the camera that captured a perspective image.
///
/// Angles are in degrees. The usual ranges are `hfov` in `(0, 180)`, `yaw` and
/// `roll` in `[-180, 180]` and `pitch` in `[-90, 90]`; only the field of view
/// is enforced, orientation angles outside those ranges simply wrap around.
///
/// # Examples
///
/// ```rust
/// use equirect_tools::camera::{CameraParams, Resolution};
///
/// let params = CameraParams::new(90.0, 0.0, 0.0, 0.0);
/// let resolution = Resolution { width: 200, height: 100 };
///
/// // VFOV follows the aspect ratio of the image.
/// assert_eq!(params.vfov_for(&resolution), 45.0);
///
/// let intrinsics = params.intrinsics_for(&resolution).unwrap();
/// assert!((intrinsics.fx - 100.0).abs() < 1e-9);
/// assert_eq!(intrinsics.cx, 100.0);
/// assert_eq!(intrinsics.cy, 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// Horizontal field of view.
    pub hfov: f64,
    /// Rotation about the vertical axis.
    pub yaw: f64,
    /// Rotation about the lateral axis.
    pub pitch: f64,
    /// Rotation about the forward axis.
    pub roll: f64,
}

impl Default for CameraParams {
    fn default() -> Self {
        CameraParams {
            hfov: 60.0,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

impl CameraParams {
    pub fn new(hfov: f64, yaw: f64, pitch: f64, roll: f64) -> Self {
        CameraParams {
            hfov,
            yaw,
            pitch,
            roll,
        }
    }

    /// Vertical field of view in degrees for an image of the given resolution.
    ///
    /// `VFOV = HFOV * height / width`. This keeps the angular size of a pixel
    /// equal along both axes.
    pub fn vfov_for(&self, resolution: &Resolution) -> f64 {
        self.hfov * (resolution.height as f64 / resolution.width as f64)
    }

    /// Derives the pinhole intrinsics for an image of the given resolution.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidParameter`] if the parameters fail
    ///   [`CameraParams::validate_params`], the resolution is empty, or the
    ///   derived vertical field of view reaches 180 degrees (tall images).
    pub fn intrinsics_for(&self, resolution: &Resolution) -> Result<Intrinsics, EquirectError> {
        self.validate_params()?;
        if resolution.width == 0 || resolution.height == 0 {
            return Err(EquirectError::InvalidParameter(format!(
                "resolution must be non-empty, got {}x{}",
                resolution.width, resolution.height
            )));
        }

        let vfov = self.vfov_for(resolution);
        if vfov >= 180.0 {
            return Err(EquirectError::InvalidParameter(format!(
                "derived vfov {vfov} must be below 180 degrees (hfov {} on a {}x{} image)",
                self.hfov, resolution.width, resolution.height
            )));
        }

        let hfov_rad = self.hfov.to_radians();
        let vfov_rad = vfov.to_radians();

        let width = resolution.width as f64;
        let height = resolution.height as f64;

        let intrinsics = Intrinsics {
            fx: (width / 2.0) / (hfov_rad / 2.0).tan(),
            fy: (height / 2.0) / (vfov_rad / 2.0).tan(),
            cx: width / 2.0,
            cy: height / 2.0,
        };

        validation::validate_intrinsics(&intrinsics)?;
        Ok(intrinsics)
    }

    /// Rejects degenerate camera parameters.
    ///
    /// The horizontal field of view must be finite and strictly between 0 and
    /// 180 degrees: at 0 the focal length is infinite and at 180 it collapses
    /// to zero. Orientation angles only need to be finite.
    pub fn validate_params(&self) -> Result<(), EquirectError> {
        if !self.hfov.is_finite() || self.hfov <= 0.0 || self.hfov >= 180.0 {
            return Err(EquirectError::InvalidParameter(format!(
                "hfov must be in (0, 180) degrees, got {}",
                self.hfov
            )));
        }
        for (name, value) in [("yaw", self.yaw), ("pitch", self.pitch), ("roll", self.roll)] {
            if !value.is_finite() {
                return Err(EquirectError::InvalidParameter(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), EquirectError> {
        if !(intrinsics.fx > 0.0 && intrinsics.fy > 0.0)
            || !intrinsics.fx.is_finite()
            || !intrinsics.fy.is_finite()
        {
            return Err(EquirectError::InvalidParameter(format!(
                "focal length must be positive and finite, got fx={} fy={}",
                intrinsics.fx, intrinsics.fy
            )));
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(EquirectError::InvalidParameter(
                "principal point must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vfov_follows_aspect_ratio() {
        let params = CameraParams::new(60.0, 0.0, 0.0, 0.0);
        let resolution = Resolution {
            width: 640,
            height: 480,
        };
        assert_relative_eq!(params.vfov_for(&resolution), 45.0);
    }

    #[test]
    fn test_intrinsics_for_square_image() {
        let params = CameraParams::new(90.0, 10.0, -5.0, 3.0);
        let resolution = Resolution {
            width: 100,
            height: 100,
        };
        let intrinsics = params.intrinsics_for(&resolution).unwrap();

        // tan(45deg) == 1, so the focal length equals half the image size.
        assert_relative_eq!(intrinsics.fx, 50.0, epsilon = 1e-9);
        assert_relative_eq!(intrinsics.fy, 50.0, epsilon = 1e-9);
        assert_relative_eq!(intrinsics.cx, 50.0);
        assert_relative_eq!(intrinsics.cy, 50.0);
    }

    #[test]
    fn test_degenerate_hfov_is_rejected() {
        for hfov in [0.0, 180.0, -10.0, 200.0, f64::NAN, f64::INFINITY] {
            let params = CameraParams::new(hfov, 0.0, 0.0, 0.0);
            assert!(
                matches!(
                    params.validate_params(),
                    Err(EquirectError::InvalidParameter(_))
                ),
                "hfov {hfov} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_finite_orientation_is_rejected() {
        let params = CameraParams::new(60.0, f64::NAN, 0.0, 0.0);
        assert!(matches!(
            params.validate_params(),
            Err(EquirectError::InvalidParameter(msg)) if msg.starts_with("yaw")
        ));

        let params = CameraParams::new(60.0, 0.0, 0.0, f64::NEG_INFINITY);
        assert!(matches!(
            params.validate_params(),
            Err(EquirectError::InvalidParameter(msg)) if msg.starts_with("roll")
        ));
    }

    #[test]
    fn test_orientation_ranges_are_not_enforced() {
        let params = CameraParams::new(60.0, 540.0, 120.0, -720.0);
        assert!(params.validate_params().is_ok());
    }

    #[test]
    fn test_empty_resolution_is_rejected() {
        let params = CameraParams::default();
        let resolution = Resolution {
            width: 0,
            height: 10,
        };
        assert!(params.intrinsics_for(&resolution).is_err());
    }

    #[test]
    fn test_tall_image_vfov_limit() {
        let tall = Resolution {
            width: 10,
            height: 20,
        };
        for hfov in [90.0, 100.0] {
            assert!(matches!(
                CameraParams::new(hfov, 0.0, 0.0, 0.0).intrinsics_for(&tall),
                Err(EquirectError::InvalidParameter(msg)) if msg.contains("vfov")
            ));
        }
        let intrinsics = CameraParams::new(89.0, 0.0, 0.0, 0.0)
            .intrinsics_for(&tall)
            .unwrap();
        assert!(intrinsics.fy > 0.0);
    }

    #[test]
    fn test_validate_intrinsics() {
        let mut intrinsics = Intrinsics {
            fx: 10.0,
            fy: 10.0,
            cx: 5.0,
            cy: 5.0,
        };
        assert!(validation::validate_intrinsics(&intrinsics).is_ok());

        intrinsics.fx = 0.0;
        assert!(validation::validate_intrinsics(&intrinsics).is_err());

        intrinsics.fx = 10.0;
        intrinsics.cy = f64::NAN;
        assert!(validation::validate_intrinsics(&intrinsics).is_err());
    }
}
