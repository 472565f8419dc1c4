//! Error type shared by the projection core and the host-side helpers.

/// Errors produced by `equirect-tools`.
///
/// The first three variants belong to the pixel transforms; the remaining ones
/// are only raised by file, configuration and environment handling.
#[derive(thiserror::Error, Debug)]
pub enum EquirectError {
    #[error("Invalid image shape: {0}")]
    InvalidShape(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
    #[error("Image Error: {0}")]
    ImageError(String),
}

impl From<std::io::Error> for EquirectError {
    fn from(err: std::io::Error) -> Self {
        EquirectError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for EquirectError {
    fn from(err: yaml_rust::ScanError) -> Self {
        EquirectError::YamlError(err.to_string())
    }
}

impl From<serde_yaml::Error> for EquirectError {
    fn from(err: serde_yaml::Error) -> Self {
        EquirectError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for EquirectError {
    fn from(err: serde_json::Error) -> Self {
        EquirectError::IOError(err.to_string())
    }
}

impl From<image::ImageError> for EquirectError {
    fn from(err: image::ImageError) -> Self {
        EquirectError::ImageError(err.to_string())
    }
}
