//! Left/right seam blending for panoramas.
//!
//! The first and last columns of an equirectangular image are neighbours on
//! the sphere, but generated content (depth maps in particular) rarely agrees
//! across that border. For every row and channel the blender computes the
//! average of the two edge samples and pulls both edges toward it: fully at
//! the border column, then linearly less over `distance` columns inward.
//!
//! Rows are independent and blended in parallel.

use crate::tensor::{ImageBatch, ImageTensor};
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters of a seam blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeamBlendOptions {
    /// Number of columns from each edge that are adjusted. Clamped to half
    /// the image width.
    pub distance: usize,
    /// Leave the last channel of 2- and 4-channel images untouched.
    #[serde(default)]
    pub preserve_alpha: bool,
}

/// Blends the left/right seam of panoramas.
///
/// # Examples
///
/// ```rust
/// use equirect_tools::seam::SeamBlender;
/// use equirect_tools::tensor::ImageTensor;
///
/// let image = ImageTensor::from_vec(1, 4, 1, vec![0.0, 5.0, 5.0, 10.0]).unwrap();
/// let blended = SeamBlender::new(2).blend(&image);
/// assert_eq!(blended.as_slice(), &[5.0, 7.5, 2.5, 5.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeamBlender {
    options: SeamBlendOptions,
}

impl SeamBlender {
    pub fn new(distance: usize) -> Self {
        SeamBlender {
            options: SeamBlendOptions {
                distance,
                preserve_alpha: false,
            },
        }
    }

    pub fn with_options(options: SeamBlendOptions) -> Self {
        SeamBlender { options }
    }

    pub fn preserve_alpha(mut self, preserve_alpha: bool) -> Self {
        self.options.preserve_alpha = preserve_alpha;
        self
    }

    pub fn options(&self) -> &SeamBlendOptions {
        &self.options
    }

    /// Distance actually applied to an image `width` columns wide.
    pub fn effective_distance(&self, width: usize) -> usize {
        self.options.distance.min(width / 2)
    }

    /// Returns a blended copy of `image`.
    pub fn blend(&self, image: &ImageTensor) -> ImageTensor {
        let mut blended = image.clone();
        self.blend_in_place(&mut blended);
        blended
    }

    /// Blends `image` in place.
    pub fn blend_in_place(&self, image: &mut ImageTensor) {
        let width = image.width();
        let distance = self.effective_distance(width);
        if distance < self.options.distance {
            warn!(
                "Seam blend distance {} exceeds half the image width, clamped to {}",
                self.options.distance, distance
            );
        }
        if distance == 0 {
            return;
        }

        let channels = image.channels();
        let blended_channels = if self.options.preserve_alpha && (channels == 2 || channels == 4)
        {
            channels - 1
        } else {
            channels
        };
        debug!(
            "Blending seam of {}x{} image over {} column(s), {} of {} channel(s)",
            width,
            image.height(),
            distance,
            blended_channels,
            channels
        );

        let row_stride = image.row_stride();
        image
            .as_mut_slice()
            .par_chunks_mut(row_stride)
            .for_each(|row| {
                for channel in 0..blended_channels {
                    blend_line(row, width, channels, channel, distance);
                }
            });
    }

    /// Blends every image of a batch, preserving order.
    pub fn blend_batch(&self, batch: &ImageBatch) -> ImageBatch {
        let blended = batch
            .as_slice()
            .par_iter()
            .map(|image| self.blend(image))
            .collect();
        ImageBatch::from_vec_unchecked(blended)
    }
}

/// Pulls both ends of one channel of one row toward their average.
///
/// `row` holds `width` interleaved pixels of `channels` samples each;
/// `distance` must not exceed `width / 2`.
fn blend_line(row: &mut [f32], width: usize, channels: usize, channel: usize, distance: usize) {
    let at = |col: usize| col * channels + channel;

    let left = row[at(0)];
    let right = row[at(width - 1)];
    let average = (left + right) / 2.0;
    let offset_left = left - average;
    let offset_right = right - average;

    for i in 0..distance {
        let factor = (distance - i) as f32 / distance as f32;
        row[at(i)] -= factor * offset_left;
        row[at(width - 1 - i)] -= factor * offset_right;
    }
}

/// Returns `image` with its left/right seam blended over `distance` columns.
pub fn blend_seam(image: &ImageTensor, distance: usize) -> ImageTensor {
    SeamBlender::new(distance).blend(image)
}

pub fn blend_seam_in_place(image: &mut ImageTensor, distance: usize) {
    SeamBlender::new(distance).blend_in_place(image)
}

/// Blends each image of `batch`; output order matches input order.
pub fn blend_seam_batch(batch: &ImageBatch, distance: usize) -> ImageBatch {
    SeamBlender::new(distance).blend_batch(batch)
}
