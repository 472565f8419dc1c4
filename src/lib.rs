//! Equirect Tools Library
//!
//! A Rust library for turning perspective camera images into equirectangular
//! (spherical) panoramas. It provides:
//! - Projection of a perspective image onto a 2:1 panorama from its horizontal
//!   field of view and yaw/pitch/roll orientation, with a validity alpha channel
//! - Seam blending that removes the discontinuity between the left and right
//!   borders of a panorama, typically a depth map
//!
//! Both transforms work on plain `f32` pixel buffers ([`ImageTensor`]) and do
//! no I/O. The `util`, `config` and `environment` modules add image files,
//! YAML configuration and a named on-disk store for callers that need them.

pub mod camera;
pub mod config;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod projection;
pub mod seam;
pub mod tensor;
pub mod util;

// Re-export commonly used types
pub use camera::{CameraParams, Intrinsics, PinholeModel, Resolution};
pub use config::PipelineConfig;
pub use environment::EnvironmentStore;
pub use error::EquirectError;
pub use projection::{project, project_batch, Projector};
pub use seam::{blend_seam, blend_seam_batch, SeamBlendOptions, SeamBlender};
pub use tensor::{ImageBatch, ImageTensor};
