//! Perspective to Equirectangular Projection Example
//!
//! This example projects one or more perspective images onto equirectangular
//! panoramas, optionally blends the panorama seam, and either writes the
//! results as image files or stores them as named environments.
//!
//! Usage:
//! ```bash
//! cargo run --example project_panorama -- \
//!   --input photo.jpg \
//!   --hfov 70 --yaw 30 \
//!   --width 2048 \
//!   --output output/panorama.png
//!
//! cargo run --example project_panorama -- \
//!   --input photo.jpg --depth depth.png \
//!   --config samples/pipeline.yaml \
//!   --env-name "beach at dusk"
//! ```

use clap::Parser;
use equirect_tools::config::PipelineConfig;
use equirect_tools::environment::EnvironmentStore;
use equirect_tools::tensor::ImageBatch;
use equirect_tools::util;
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Perspective to equirectangular projection tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Perspective images to project (same size)
    #[arg(short = 'i', long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Depth maps stored next to the textures when saving an environment
    #[arg(short = 'd', long, num_args = 1..)]
    depth: Vec<PathBuf>,

    /// Pipeline configuration YAML file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Horizontal field of view in degrees
    #[arg(long)]
    hfov: Option<f64>,

    /// Yaw in degrees
    #[arg(long, allow_hyphen_values = true)]
    yaw: Option<f64>,

    /// Pitch in degrees
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<f64>,

    /// Roll in degrees
    #[arg(long, allow_hyphen_values = true)]
    roll: Option<f64>,

    /// Width of the equirectangular output
    #[arg(short = 'w', long)]
    width: Option<usize>,

    /// Blend the left/right seam over this many columns
    #[arg(short = 's', long)]
    seam_distance: Option<usize>,

    /// Output image path (single input only)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Store the result as an environment with this name
    #[arg(short = 'e', long)]
    env_name: Option<String>,
}

fn build_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let path_str = path.to_str().ok_or("Invalid config path string")?;
            info!("Loading pipeline configuration from: {}", path_str);
            PipelineConfig::load_from_yaml(path_str)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(hfov) = cli.hfov {
        config.camera.hfov = hfov;
    }
    if let Some(yaw) = cli.yaw {
        config.camera.yaw = yaw;
    }
    if let Some(pitch) = cli.pitch {
        config.camera.pitch = pitch;
    }
    if let Some(roll) = cli.roll {
        config.camera.roll = roll;
    }
    if let Some(width) = cli.width {
        config.output_width = width;
    }
    if cli.seam_distance.is_some() {
        config.seam_distance = cli.seam_distance;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Logger::try_with_str("info")?
        .log_to_file(
            FileSpec::default()
                .directory("logs")
                .suppress_timestamp()
                .suffix("log"),
        )
        .duplicate_to_stdout(Duplicate::All)
        .format_for_files(detailed_format)
        .format_for_stdout(colored_detailed_format)
        .set_palette("196;208;76;39;178".to_string())
        .start()?;

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    info!("Camera: {:?}", config.camera);
    info!(
        "Output: {}x{}",
        config.output_width,
        config.output_width / 2
    );

    let textures = ImageBatch::new(
        cli.input
            .iter()
            .map(|path| util::load_image(path))
            .collect::<Result<Vec<_>, _>>()?,
    )?;

    let start = Instant::now();
    let projector = config.projector()?;
    let mut panoramas = projector.project_batch(&textures)?;
    if let Some(blender) = config.seam_blender() {
        panoramas = blender.blend_batch(&panoramas);
    }
    info!(
        "Projected {} image(s) in {:.1} ms",
        panoramas.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    if let Some(output) = &cli.output {
        if panoramas.len() != 1 {
            return Err("--output takes a single input image; use --env-name for batches".into());
        }
        if let Some(parent) = output.parent() {
            util::ensure_dir(parent)?;
        }
        if let Some(panorama) = panoramas.get(0) {
            util::save_image(panorama, output)?;
            info!("Saved panorama to {}", output.display());
        }
    }

    if let Some(env_name) = &cli.env_name {
        let depths = if cli.depth.is_empty() {
            None
        } else {
            Some(ImageBatch::new(
                cli.depth
                    .iter()
                    .map(|path| util::load_image(path))
                    .collect::<Result<Vec<_>, _>>()?,
            )?)
        };
        let store = EnvironmentStore::new(&config.environments_dir);
        let names = store.save(&panoramas, depths.as_ref(), env_name)?;
        for name in &names {
            println!("Stored environment: {name}");
        }
        println!("{}", store.list_environments_json()?);
    } else if !cli.depth.is_empty() {
        warn!("--depth is only used together with --env-name");
    }

    if cli.output.is_none() && cli.env_name.is_none() {
        warn!("Neither --output nor --env-name given, nothing was written");
    }

    Ok(())
}
