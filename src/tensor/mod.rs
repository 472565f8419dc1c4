//! Dense `f32` image buffers shared by the projector and the seam blender.
//!
//! An [`ImageTensor`] stores samples row-major as `(row, column, channel)`,
//! which is the layout produced by most decoders and expected by callers that
//! hand over raw pixel buffers. An [`ImageBatch`] is an ordered list of
//! tensors of identical shape.

use crate::error::EquirectError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

/// A `height x width x channels` image with `f32` samples, nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wraps a row-major buffer.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidShape`] if `channels` is zero or the buffer
    ///   length does not equal `height * width * channels`.
    pub fn from_vec(
        height: usize,
        width: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, EquirectError> {
        if channels == 0 {
            return Err(EquirectError::InvalidShape(
                "image must have at least one channel".to_string(),
            ));
        }
        let expected = height
            .checked_mul(width)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                EquirectError::InvalidShape(format!(
                    "shape [{height}, {width}, {channels}] overflows"
                ))
            })?;
        if data.len() != expected {
            return Err(EquirectError::InvalidShape(format!(
                "buffer of {} samples does not match shape [{height}, {width}, {channels}]",
                data.len()
            )));
        }
        Ok(ImageTensor {
            height,
            width,
            channels,
            data,
        })
    }

    /// Wraps a buffer whose shape is given as a dimension list, the way
    /// tensors from other runtimes describe themselves.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidShape`] unless `shape` has exactly three
    ///   entries `[height, width, channels]` matching the buffer.
    pub fn from_shape(shape: &[usize], data: Vec<f32>) -> Result<Self, EquirectError> {
        match *shape {
            [height, width, channels] => Self::from_vec(height, width, channels, data),
            _ => Err(EquirectError::InvalidShape(format!(
                "expected a 3-dimensional [rows, columns, channels] shape, got {} dimensions",
                shape.len()
            ))),
        }
    }

    /// Image of the given shape filled with zeros.
    ///
    /// # Panics
    ///
    /// If `height * width * channels` overflows `usize`.
    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        ImageTensor {
            height,
            width,
            channels,
            data: vec![0.0; height * width * channels],
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `[height, width, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, self.channels]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Number of samples in one row (`width * channels`).
    pub fn row_stride(&self) -> usize {
        self.width * self.channels
    }

    #[inline]
    fn index(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.width + col) * self.channels + channel
    }

    /// Sample at `(row, col, channel)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize, channel: usize) -> f32 {
        self.data[self.index(row, col, channel)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: f32) {
        let idx = self.index(row, col, channel);
        self.data[idx] = value;
    }

    /// All channels of the pixel at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> &[f32] {
        let start = self.index(row, col, 0);
        &self.data[start..start + self.channels]
    }

    /// Samples the first `out.len()` channels at continuous pixel coordinates
    /// `(x, y)` with bilinear interpolation.
    ///
    /// Integer coordinates fall on pixel centres. Neighbours outside the image
    /// contribute zero, so sampling half a pixel beyond the border yields half
    /// the edge value.
    ///
    /// # Panics
    ///
    /// If `out.len()` exceeds the channel count.
    pub fn sample_bilinear(&self, x: f64, y: f64, out: &mut [f32]) {
        assert!(out.len() <= self.channels);
        out.fill(0.0);

        let x0f = x.floor();
        let y0f = y.floor();
        let wx1 = (x - x0f) as f32;
        let wy1 = (y - y0f) as f32;
        let wx0 = 1.0 - wx1;
        let wy0 = 1.0 - wy1;

        let x0 = x0f as i64;
        let y0 = y0f as i64;

        let taps = [
            (x0, y0, wx0 * wy0),
            (x0 + 1, y0, wx1 * wy0),
            (x0, y0 + 1, wx0 * wy1),
            (x0 + 1, y0 + 1, wx1 * wy1),
        ];
        for (tx, ty, weight) in taps {
            if weight == 0.0
                || tx < 0
                || ty < 0
                || tx >= self.width as i64
                || ty >= self.height as i64
            {
                continue;
            }
            let pixel = self.pixel(ty as usize, tx as usize);
            for (value, sample) in out.iter_mut().zip(pixel) {
                *value += weight * sample;
            }
        }
    }

    /// Converts a decoded image to a tensor with samples divided by 255.
    ///
    /// Images with an alpha channel become RGBA (4 channels); every other
    /// colour type becomes RGB (3 channels).
    pub fn from_dynamic_image(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self::from_u8(height as usize, width as usize, 4, rgba.as_raw())
        } else {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            Self::from_u8(height as usize, width as usize, 3, rgb.as_raw())
        }
    }

    fn from_u8(height: usize, width: usize, channels: usize, raw: &[u8]) -> Self {
        ImageTensor {
            height,
            width,
            channels,
            data: raw.iter().map(|&v| v as f32 / 255.0).collect(),
        }
    }

    /// Converts the tensor to an 8-bit image.
    ///
    /// Samples are clamped to `[0, 1]`, multiplied by 255 and truncated.
    /// One channel gives a grayscale image, three RGB and four RGBA.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::InvalidShape`] for other channel counts or sizes
    ///   that do not fit in `u32`.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, EquirectError> {
        let width = u32::try_from(self.width)
            .map_err(|_| EquirectError::InvalidShape(format!("width {} too large", self.width)))?;
        let height = u32::try_from(self.height).map_err(|_| {
            EquirectError::InvalidShape(format!("height {} too large", self.height))
        })?;
        let raw: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect();

        let buffer_error =
            || EquirectError::InvalidShape("buffer does not match image dimensions".to_string());
        let image = match self.channels {
            1 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(width, height, raw).ok_or_else(buffer_error)?,
            ),
            3 => DynamicImage::ImageRgb8(
                RgbImage::from_raw(width, height, raw).ok_or_else(buffer_error)?,
            ),
            4 => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(width, height, raw).ok_or_else(buffer_error)?,
            ),
            c => {
                return Err(EquirectError::InvalidShape(format!(
                    "cannot encode an image with {c} channels"
                )))
            }
        };
        Ok(image)
    }
}

/// An ordered batch of images with identical shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageBatch {
    images: Vec<ImageTensor>,
}

impl ImageBatch {
    /// Builds a batch, checking that every image shares the shape of the first.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::DimensionMismatch`] naming the first differing
    ///   dimension.
    pub fn new(images: Vec<ImageTensor>) -> Result<Self, EquirectError> {
        if let Some(first) = images.first() {
            let reference = first.shape();
            for image in &images[1..] {
                let shape = image.shape();
                if let Some(axis) = (0..3).find(|&axis| shape[axis] != reference[axis]) {
                    return Err(EquirectError::DimensionMismatch {
                        expected: reference[axis],
                        found: shape[axis],
                    });
                }
            }
        }
        Ok(ImageBatch { images })
    }

    /// For shape-preserving transforms of an existing batch.
    pub(crate) fn from_vec_unchecked(images: Vec<ImageTensor>) -> Self {
        ImageBatch { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Shape shared by all images, `None` for an empty batch.
    pub fn shape(&self) -> Option<[usize; 3]> {
        self.images.first().map(ImageTensor::shape)
    }

    pub fn get(&self, index: usize) -> Option<&ImageTensor> {
        self.images.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageTensor> {
        self.images.iter()
    }

    pub fn as_slice(&self) -> &[ImageTensor] {
        &self.images
    }

    pub fn into_vec(self) -> Vec<ImageTensor> {
        self.images
    }
}

impl<'a> IntoIterator for &'a ImageBatch {
    type Item = &'a ImageTensor;
    type IntoIter = std::slice::Iter<'a, ImageTensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

impl IntoIterator for ImageBatch {
    type Item = ImageTensor;
    type IntoIter = std::vec::IntoIter<ImageTensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}
