//! Panorama Seam Blending Example
//!
//! Removes the visible discontinuity between the left and right borders of an
//! equirectangular image, most useful on depth maps.
//!
//! Usage:
//! ```bash
//! cargo run --example blend_seam -- \
//!   --input depth.png \
//!   --output output/depth_blended.png \
//!   --distance 32
//! ```

use clap::Parser;
use equirect_tools::seam::SeamBlender;
use equirect_tools::util;
use log::info;
use std::path::PathBuf;

/// Panorama seam blending tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input panorama
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Output path
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Number of columns blended on each side
    #[arg(short = 'd', long, default_value = "16")]
    distance: usize,

    /// Keep the alpha channel of RGBA inputs unchanged
    #[arg(long)]
    preserve_alpha: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Input: {:?}", cli.input);
    info!("Output: {:?}", cli.output);

    let mut image = util::load_image(&cli.input)?;
    let blender = SeamBlender::new(cli.distance).preserve_alpha(cli.preserve_alpha);
    info!(
        "Blending {}x{} image over {} column(s)",
        image.width(),
        image.height(),
        blender.effective_distance(image.width())
    );
    blender.blend_in_place(&mut image);

    if let Some(parent) = cli.output.parent() {
        util::ensure_dir(parent)?;
    }
    util::save_image(&image, &cli.output)?;
    println!("Saved blended panorama to {}", cli.output.display());

    Ok(())
}
