//! Perspective to equirectangular projection.
//!
//! For every pixel of the output panorama the projector builds the viewing
//! direction on the unit sphere, rotates it into the frame of the source
//! camera and looks the direction up in the source image through a
//! [`PinholeModel`]. Directions that land behind the camera or outside the
//! source image are left at zero and flagged invalid in the appended alpha
//! channel.
//!
//! Output rows are independent, so they are filled in parallel with rayon,
//! each worker owning one row of the output buffer.

use crate::camera::{CameraParams, PinholeModel, Resolution};
use crate::error::EquirectError;
use crate::geometry::{
    equirect_angles, normalize_grid_coordinate, rotation_matrix, spherical_direction,
    unnormalize_grid_coordinate,
};
use crate::tensor::{ImageBatch, ImageTensor};
use log::{debug, info};
use nalgebra::Matrix3;
use rayon::prelude::*;

/// Output width used when none is configured.
pub const DEFAULT_OUTPUT_WIDTH: usize = 2048;

/// Number of colour channels carried into the panorama; an input alpha
/// channel is dropped.
const COLOR_CHANNELS: usize = 3;

/// Projects perspective images with a fixed camera onto equirectangular panoramas.
///
/// # Examples
///
/// ```rust
/// use equirect_tools::camera::CameraParams;
/// use equirect_tools::projection::Projector;
/// use equirect_tools::tensor::ImageTensor;
///
/// let projector = Projector::new(CameraParams::new(90.0, 0.0, 0.0, 0.0), 64).unwrap();
/// let image = ImageTensor::from_vec(4, 4, 3, vec![0.5; 48]).unwrap();
///
/// let panorama = projector.project(&image).unwrap();
/// assert_eq!(panorama.shape(), [32, 64, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Projector {
    params: CameraParams,
    output_width: usize,
}

impl Projector {
    /// Creates a projector for the given camera and panorama width.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidParameter`] if the camera parameters are
    ///   degenerate, `output_width` is zero, or the panorama buffer size
    ///   overflows `usize`.
    pub fn new(params: CameraParams, output_width: usize) -> Result<Self, EquirectError> {
        params.validate_params()?;
        if output_width == 0 {
            return Err(EquirectError::InvalidParameter(
                "output width must be at least 1".to_string(),
            ));
        }
        (output_width / 2)
            .checked_mul(output_width)
            .and_then(|pixels| pixels.checked_mul(COLOR_CHANNELS + 1))
            .ok_or_else(|| {
                EquirectError::InvalidParameter(format!(
                    "output width {output_width} is too large"
                ))
            })?;
        Ok(Projector {
            params,
            output_width,
        })
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Panorama height, always `output_width / 2` rounded down.
    pub fn output_height(&self) -> usize {
        self.output_width / 2
    }

    /// Projects one image.
    ///
    /// The input must have 3 (RGB) or 4 (RGBA) channels; the output always has
    /// four, the last one being the validity mask. An input alpha channel is
    /// ignored.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidShape`] for other channel counts or an empty image.
    /// * [`EquirectError::InvalidParameter`] if the vertical field of view
    ///   derived for this image reaches 180 degrees.
    pub fn project(&self, image: &ImageTensor) -> Result<ImageTensor, EquirectError> {
        let channels = image.channels();
        if channels != 3 && channels != 4 {
            return Err(EquirectError::InvalidShape(format!(
                "input must have 3 (RGB) or 4 (RGBA) channels, got {channels}"
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(EquirectError::InvalidShape(format!(
                "input must be non-empty, got {}x{}",
                image.width(),
                image.height()
            )));
        }

        let resolution = Resolution {
            width: u32::try_from(image.width()).map_err(|_| {
                EquirectError::InvalidShape(format!("width {} too large", image.width()))
            })?,
            height: u32::try_from(image.height()).map_err(|_| {
                EquirectError::InvalidShape(format!("height {} too large", image.height()))
            })?,
        };
        let model = PinholeModel::from_camera(&self.params, resolution)?;
        let rotation = rotation_matrix(self.params.yaw, self.params.pitch, self.params.roll);

        debug!(
            "Projecting {}x{} image, intrinsics {:?}, vfov {:.3}",
            image.width(),
            image.height(),
            model.intrinsics,
            self.params.vfov_for(&resolution)
        );

        let out_width = self.output_width;
        let out_height = self.output_height();
        let out_channels = COLOR_CHANNELS + 1;
        let mut output = ImageTensor::zeros(out_height, out_width, out_channels);
        let row_stride = output.row_stride();

        output
            .as_mut_slice()
            .par_chunks_mut(row_stride)
            .enumerate()
            .for_each(|(row, samples)| {
                project_row(
                    image, &model, &rotation, row, out_width, out_height, samples,
                )
            });

        Ok(output)
    }

    /// Projects every image of a batch, preserving order.
    pub fn project_batch(&self, batch: &ImageBatch) -> Result<ImageBatch, EquirectError> {
        info!(
            "Projecting batch of {} image(s) onto {}x{} panoramas",
            batch.len(),
            self.output_width,
            self.output_height()
        );
        let projected = batch
            .as_slice()
            .par_iter()
            .map(|image| self.project(image))
            .collect::<Result<Vec<_>, _>>()?;
        ImageBatch::new(projected)
    }
}

/// Fills one output row. `samples` holds `out_width` RGBA pixels, all zero on entry.
fn project_row(
    image: &ImageTensor,
    model: &PinholeModel,
    rotation: &Matrix3<f64>,
    row: usize,
    out_width: usize,
    out_height: usize,
    samples: &mut [f32],
) {
    let in_width = image.width();
    let in_height = image.height();

    for (col, pixel) in samples.chunks_exact_mut(COLOR_CHANNELS + 1).enumerate() {
        let (theta, phi) = equirect_angles(row, col, out_width, out_height);
        let ray = rotation * spherical_direction(theta, phi);

        let Some(point) = model.project(&ray) else {
            continue;
        };

        let grid_x = normalize_grid_coordinate(point.x, in_width).clamp(-1.0, 1.0);
        let grid_y = normalize_grid_coordinate(point.y, in_height).clamp(-1.0, 1.0);
        let x = unnormalize_grid_coordinate(grid_x, in_width);
        let y = unnormalize_grid_coordinate(grid_y, in_height);

        let (color, alpha) = pixel.split_at_mut(COLOR_CHANNELS);
        image.sample_bilinear(x, y, color);
        for value in color.iter_mut() {
            *value = value.clamp(0.0, 1.0);
        }
        alpha[0] = 1.0;
    }
}

/// Projects `image` seen with the given field of view and orientation onto an
/// equirectangular panorama `output_width` pixels wide.
pub fn project(
    image: &ImageTensor,
    hfov: f64,
    yaw: f64,
    pitch: f64,
    roll: f64,
    output_width: usize,
) -> Result<ImageTensor, EquirectError> {
    Projector::new(CameraParams::new(hfov, yaw, pitch, roll), output_width)?.project(image)
}

/// Projects each image of `batch` with the same camera; output order matches input order.
pub fn project_batch(
    batch: &ImageBatch,
    params: &CameraParams,
    output_width: usize,
) -> Result<ImageBatch, EquirectError> {
    Projector::new(*params, output_width)?.project_batch(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Deterministic test pattern with distinct values per pixel and channel.
    fn pattern(height: usize, width: usize, channels: usize) -> ImageTensor {
        let mut image = ImageTensor::zeros(height, width, channels);
        for row in 0..height {
            for col in 0..width {
                for c in 0..channels {
                    let v = ((row * 7 + col * 13 + c * 29) % 97) as f32 / 96.0;
                    image.set(row, col, c, v);
                }
            }
        }
        image
    }

    fn constant(height: usize, width: usize, value: f32) -> ImageTensor {
        ImageTensor::from_vec(height, width, 3, vec![value; height * width * 3]).unwrap()
    }

    #[test]
    fn test_output_dimensions() {
        let image = pattern(6, 8, 3);
        for width in [1, 2, 7, 64, 101] {
            let panorama = project(&image, 60.0, 0.0, 0.0, 0.0, width).unwrap();
            assert_eq!(panorama.width(), width);
            assert_eq!(panorama.height(), width / 2);
            assert_eq!(panorama.channels(), 4);
        }
    }

    #[test]
    fn test_optical_axis_recovers_centre_pixel() {
        let image = pattern(8, 8, 3);
        for hfov in [30.0, 60.0, 90.0, 150.0] {
            let panorama = project(&image, hfov, 0.0, 0.0, 0.0, 64).unwrap();
            // Column 32 of 64 is theta = 0, row 16 of 32 is phi = 0.
            for c in 0..3 {
                assert_relative_eq!(panorama.get(16, 32, c), image.get(4, 4, c), epsilon = 1e-5);
            }
            assert_eq!(panorama.get(16, 32, 3), 1.0);
        }
    }

    #[test]
    fn test_invalid_pixels_are_zero() {
        let image = pattern(12, 16, 3);
        let panorama = project(&image, 75.0, 20.0, -15.0, 5.0, 96).unwrap();

        let mut valid = 0;
        for row in 0..panorama.height() {
            for col in 0..panorama.width() {
                let alpha = panorama.get(row, col, 3);
                assert!(alpha == 0.0 || alpha == 1.0);
                if alpha == 0.0 {
                    assert_eq!(panorama.pixel(row, col), &[0.0, 0.0, 0.0, 0.0]);
                } else {
                    valid += 1;
                }
            }
        }
        assert!(valid > 0);
        assert!(valid < panorama.width() * panorama.height());
    }

    #[test]
    fn test_constant_image_is_reproduced_where_valid() {
        let image = constant(10, 20, 0.625);
        let panorama = project(&image, 100.0, 0.0, 10.0, 0.0, 128).unwrap();
        for row in 0..panorama.height() {
            for col in 0..panorama.width() {
                if panorama.get(row, col, 3) == 1.0 {
                    for c in 0..3 {
                        assert_relative_eq!(panorama.get(row, col, c), 0.625, epsilon = 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_yaw_is_periodic() {
        let image = pattern(12, 16, 3);
        let a = project(&image, 60.0, 30.0, 10.0, -5.0, 128).unwrap();
        let b = project(&image, 60.0, 390.0, 10.0, -5.0, 128).unwrap();
        for (va, vb) in a.as_slice().iter().zip(b.as_slice()) {
            assert_relative_eq!(*va, *vb, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_yaw_moves_view_horizontally() {
        let image = constant(8, 8, 0.5);
        let panorama = project(&image, 60.0, 90.0, 0.0, 0.0, 64).unwrap();
        // Forward is now outside the frustum, the view sits at theta = -pi/2.
        assert_eq!(panorama.get(16, 32, 3), 0.0);
        assert_eq!(panorama.get(16, 16, 3), 1.0);
        assert_relative_eq!(panorama.get(16, 16, 0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_rgba_input_alpha_is_ignored() {
        let rgb = pattern(6, 10, 3);
        let mut rgba = ImageTensor::zeros(6, 10, 4);
        for row in 0..6 {
            for col in 0..10 {
                for c in 0..3 {
                    rgba.set(row, col, c, rgb.get(row, col, c));
                }
                rgba.set(row, col, 3, if (row + col) % 2 == 0 { 0.0 } else { 0.3 });
            }
        }
        let from_rgb = project(&rgb, 80.0, 5.0, 5.0, 5.0, 48).unwrap();
        let from_rgba = project(&rgba, 80.0, 5.0, 5.0, 5.0, 48).unwrap();
        assert_eq!(from_rgb, from_rgba);
    }

    #[test]
    fn test_output_is_clamped() {
        let image = constant(4, 4, 3.0);
        let panorama = project(&image, 90.0, 0.0, 0.0, 0.0, 32).unwrap();
        assert!(panorama.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(panorama.get(8, 16, 0), 1.0);
    }

    #[test]
    fn test_invalid_channel_counts() {
        for channels in [1, 2, 5] {
            let image = ImageTensor::zeros(4, 4, channels);
            assert!(matches!(
                project(&image, 60.0, 0.0, 0.0, 0.0, 16),
                Err(EquirectError::InvalidShape(_))
            ));
        }
        let empty = ImageTensor::zeros(0, 4, 3);
        assert!(matches!(
            project(&empty, 60.0, 0.0, 0.0, 0.0, 16),
            Err(EquirectError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_degenerate_parameters() {
        let image = pattern(4, 4, 3);
        for hfov in [0.0, 180.0] {
            assert!(matches!(
                project(&image, hfov, 0.0, 0.0, 0.0, 16),
                Err(EquirectError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            project(&image, 60.0, 0.0, 0.0, 0.0, 0),
            Err(EquirectError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_tall_image_rejects_vfov_of_180_or_more() {
        let tall = constant(20, 10, 0.5);
        assert!(matches!(
            project(&tall, 100.0, 0.0, 0.0, 0.0, 32),
            Err(EquirectError::InvalidParameter(_))
        ));
        let panorama = project(&tall, 89.0, 0.0, 0.0, 0.0, 32).unwrap();
        assert_eq!(panorama.shape(), [16, 32, 4]);
    }

    #[test]
    fn test_output_too_large() {
        assert!(matches!(
            Projector::new(CameraParams::default(), usize::MAX),
            Err(EquirectError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_single_pixel_source() {
        let image = ImageTensor::from_vec(1, 1, 3, vec![0.1, 0.2, 0.3]).unwrap();
        let panorama = project(&image, 90.0, 0.0, 0.0, 0.0, 32).unwrap();
        assert_eq!(panorama.get(8, 16, 3), 1.0);
        assert_relative_eq!(panorama.get(8, 16, 1), 0.2);
    }

    #[test]
    fn test_batch_preserves_order() {
        let batch = ImageBatch::new(vec![
            constant(6, 6, 0.2),
            constant(6, 6, 0.7),
            constant(6, 6, 0.4),
        ])
        .unwrap();
        let params = CameraParams::new(90.0, 0.0, 0.0, 0.0);
        let projected = project_batch(&batch, &params, 32).unwrap();

        assert_eq!(projected.len(), 3);
        assert_eq!(projected.shape(), Some([16, 32, 4]));
        for (panorama, expected) in projected.iter().zip([0.2_f32, 0.7, 0.4]) {
            assert_relative_eq!(panorama.get(8, 16, 0), expected, epsilon = 1e-6);
        }
    }
}
