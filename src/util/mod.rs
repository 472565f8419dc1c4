//! File helpers for reading and writing images as [`ImageTensor`]s.

use crate::error::EquirectError;
use crate::tensor::ImageTensor;
use log::debug;
use std::fs;
use std::path::Path;

/// Ensure a directory exists, creating it and its parents if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), EquirectError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            EquirectError::IOError(format!(
                "Failed to create directory {}: {e}",
                dir.display()
            ))
        })?;
    }
    Ok(())
}

/// Load an image file as a tensor with samples in `[0, 1]`.
///
/// # Arguments
///
/// * `image_path` - Path to the image file
///
/// # Returns
///
/// * `Result<ImageTensor, EquirectError>` - RGBA if the file has an alpha
///   channel, RGB otherwise
pub fn load_image(image_path: &Path) -> Result<ImageTensor, EquirectError> {
    let img = image::open(image_path).map_err(|e| {
        EquirectError::ImageError(format!(
            "Failed to load image {}: {e}",
            image_path.display()
        ))
    })?;
    let tensor = ImageTensor::from_dynamic_image(&img);
    debug!(
        "Loaded {} as {:?}",
        image_path.display(),
        tensor.shape()
    );
    Ok(tensor)
}

/// Save a tensor as an 8-bit image; the format follows the file extension.
///
/// Samples are clamped to `[0, 1]` and scaled by 255 with truncation.
pub fn save_image(image: &ImageTensor, image_path: &Path) -> Result<(), EquirectError> {
    let dynamic = image.to_dynamic_image()?;
    dynamic.save(image_path).map_err(|e| {
        EquirectError::ImageError(format!(
            "Failed to save image {}: {e}",
            image_path.display()
        ))
    })?;
    debug!("Saved {:?} image to {}", image.shape(), image_path.display());
    Ok(())
}
