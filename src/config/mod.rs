//! YAML configuration of a projection pipeline.
//!
//! ```yaml
//! camera:
//!   hfov: 60.0
//!   yaw: 0.0
//!   pitch: 0.0
//!   roll: 0.0
//! output_width: 2048
//! seam_distance: 32
//! preserve_alpha: false
//! environments_dir: environments
//! ```
//!
//! Only `camera.hfov` is required. Orientation angles default to zero,
//! `output_width` to [`DEFAULT_OUTPUT_WIDTH`]; without `seam_distance` no seam
//! blending is configured.

use crate::camera::CameraParams;
use crate::error::EquirectError;
use crate::projection::{Projector, DEFAULT_OUTPUT_WIDTH};
use crate::seam::{SeamBlendOptions, SeamBlender};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use yaml_rust::{Yaml, YamlLoader};

/// Directory used for stored environments when none is configured.
pub const DEFAULT_ENVIRONMENTS_DIR: &str = "environments";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub camera: CameraParams,
    pub output_width: usize,
    pub seam_distance: Option<usize>,
    pub preserve_alpha: bool,
    pub environments_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            camera: CameraParams::default(),
            output_width: DEFAULT_OUTPUT_WIDTH,
            seam_distance: None,
            preserve_alpha: false,
            environments_dir: PathBuf::from(DEFAULT_ENVIRONMENTS_DIR),
        }
    }
}

impl PipelineConfig {
    /// Loads a configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// * [`EquirectError::IOError`] if the file cannot be read.
    /// * [`EquirectError::YamlError`] if it is not valid YAML.
    /// * [`EquirectError::InvalidParameter`] for missing or mistyped fields and
    ///   for values rejected by [`PipelineConfig::validate`].
    pub fn load_from_yaml(path: &str) -> Result<Self, EquirectError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, EquirectError> {
        let docs = YamlLoader::load_from_str(contents)?;
        let doc = docs.first().ok_or_else(|| {
            EquirectError::InvalidParameter("YAML document is empty".to_string())
        })?;

        let camera_yaml = &doc["camera"];
        if camera_yaml.is_badvalue() {
            return Err(EquirectError::InvalidParameter(
                "YAML missing 'camera'".to_string(),
            ));
        }

        let camera = CameraParams {
            hfov: yaml_f64(camera_yaml, "hfov")?.ok_or_else(|| {
                EquirectError::InvalidParameter("YAML missing 'camera.hfov'".to_string())
            })?,
            yaw: yaml_f64(camera_yaml, "yaw")?.unwrap_or(0.0),
            pitch: yaml_f64(camera_yaml, "pitch")?.unwrap_or(0.0),
            roll: yaml_f64(camera_yaml, "roll")?.unwrap_or(0.0),
        };

        let output_width = yaml_usize(doc, "output_width")?.unwrap_or(DEFAULT_OUTPUT_WIDTH);
        let seam_distance = yaml_usize(doc, "seam_distance")?;

        let preserve_alpha = match &doc["preserve_alpha"] {
            Yaml::BadValue | Yaml::Null => false,
            value => value.as_bool().ok_or_else(|| {
                EquirectError::InvalidParameter("Invalid preserve_alpha: not a bool".to_string())
            })?,
        };

        let environments_dir = match &doc["environments_dir"] {
            Yaml::BadValue | Yaml::Null => PathBuf::from(DEFAULT_ENVIRONMENTS_DIR),
            value => PathBuf::from(value.as_str().ok_or_else(|| {
                EquirectError::InvalidParameter(
                    "Invalid environments_dir: not a string".to_string(),
                )
            })?),
        };

        let config = PipelineConfig {
            camera,
            output_width,
            seam_distance,
            preserve_alpha,
            environments_dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as YAML.
    pub fn save_to_yaml(&self, path: &str) -> Result<(), EquirectError> {
        let yaml_string = serde_yaml::to_string(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), EquirectError> {
        self.camera.validate_params()?;
        if self.output_width == 0 {
            return Err(EquirectError::InvalidParameter(
                "output_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn projector(&self) -> Result<Projector, EquirectError> {
        Projector::new(self.camera, self.output_width)
    }

    /// The configured seam blender, `None` when `seam_distance` is unset.
    pub fn seam_blender(&self) -> Option<SeamBlender> {
        self.seam_distance.map(|distance| {
            SeamBlender::with_options(SeamBlendOptions {
                distance,
                preserve_alpha: self.preserve_alpha,
            })
        })
    }
}

/// Reads `node[key]` as a float, accepting integer literals. `None` if absent.
fn yaml_f64(node: &Yaml, key: &str) -> Result<Option<f64>, EquirectError> {
    match &node[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Integer(value) => Ok(Some(*value as f64)),
        value => value.as_f64().map(Some).ok_or_else(|| {
            EquirectError::InvalidParameter(format!("Invalid {key}: not a float"))
        }),
    }
}

/// Reads `node[key]` as a non-negative integer. `None` if absent.
fn yaml_usize(node: &Yaml, key: &str) -> Result<Option<usize>, EquirectError> {
    match &node[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        value => value
            .as_i64()
            .and_then(|v| usize::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                EquirectError::InvalidParameter(format!(
                    "Invalid {key}: not a non-negative integer"
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "equirect_tools_config_{}_{}.yaml",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_from_yaml_str_full() {
        let yaml = "
camera:
  hfov: 75.5
  yaw: -30
  pitch: 12.0
  roll: 0.5
output_width: 1024
seam_distance: 16
preserve_alpha: true
environments_dir: /tmp/envs
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_relative_eq!(config.camera.hfov, 75.5);
        assert_relative_eq!(config.camera.yaw, -30.0);
        assert_relative_eq!(config.camera.pitch, 12.0);
        assert_relative_eq!(config.camera.roll, 0.5);
        assert_eq!(config.output_width, 1024);
        assert_eq!(config.seam_distance, Some(16));
        assert!(config.preserve_alpha);
        assert_eq!(config.environments_dir, PathBuf::from("/tmp/envs"));

        let blender = config.seam_blender().unwrap();
        assert_eq!(blender.options().distance, 16);
        assert!(blender.options().preserve_alpha);
        assert_eq!(config.projector().unwrap().output_height(), 512);
    }

    #[test]
    fn test_from_yaml_str_defaults() {
        let config = PipelineConfig::from_yaml_str("camera:\n  hfov: 90\n").unwrap();
        assert_relative_eq!(config.camera.hfov, 90.0);
        assert_eq!(config.camera.yaw, 0.0);
        assert_eq!(config.output_width, DEFAULT_OUTPUT_WIDTH);
        assert_eq!(config.seam_distance, None);
        assert!(config.seam_blender().is_none());
        assert_eq!(
            config.environments_dir,
            PathBuf::from(DEFAULT_ENVIRONMENTS_DIR)
        );
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("output_width: 10\n"),
            Err(EquirectError::InvalidParameter(msg)) if msg.contains("camera")
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera:\n  yaw: 10\n"),
            Err(EquirectError::InvalidParameter(msg)) if msg.contains("hfov")
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str(""),
            Err(EquirectError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera:\n  hfov: wide\n"),
            Err(EquirectError::InvalidParameter(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera:\n  hfov: 180\n"),
            Err(EquirectError::InvalidParameter(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera:\n  hfov: 60\noutput_width: -4\n"),
            Err(EquirectError::InvalidParameter(_))
        ));
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera:\n  hfov: 60\noutput_width: 0\n"),
            Err(EquirectError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("camera: [hfov: 60"),
            Err(EquirectError::YamlError(_))
        ));
    }

    #[test]
    fn test_save_and_load_yaml() {
        let path = temp_path("round_trip");
        let path_str = path.to_str().unwrap();

        let config = PipelineConfig {
            camera: CameraParams::new(65.0, 15.0, -7.5, 2.0),
            output_width: 512,
            seam_distance: Some(8),
            preserve_alpha: false,
            environments_dir: PathBuf::from("out/envs"),
        };
        config.save_to_yaml(path_str).unwrap();
        let loaded = PipelineConfig::load_from_yaml(path_str).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_sample_config() {
        let config = PipelineConfig::load_from_yaml("samples/pipeline.yaml").unwrap();
        assert_relative_eq!(config.camera.hfov, 70.0);
        assert_eq!(config.output_width, 2048);
        assert_eq!(config.seam_distance, Some(32));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            PipelineConfig::load_from_yaml("does/not/exist.yaml"),
            Err(EquirectError::IOError(_))
        ));
    }
}
