use std::path::PathBuf;

use anyhow::{Context, Result};
use burn_segnet::{
    dataset::{load_annotation, open_image},
    visualization::{ClassPalette, DEFAULT_PALETTE_SEED, VisualizationConfig, visualize},
};
use clap::Args;

#[derive(Args)]
pub struct VisualizeArgs {
    /// Index-encoded class mask.
    #[arg(short, long)]
    pub mask: PathBuf,

    #[arg(short, long)]
    pub n_classes: usize,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Image the mask was predicted from.
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Blend the mask over the image.
    #[arg(long, default_value_t = false)]
    pub overlay: bool,

    #[arg(long, default_value_t = DEFAULT_PALETTE_SEED)]
    pub seed: u64,
}

pub fn run(args: &VisualizeArgs) -> Result<()> {
    let map = load_annotation(&args.mask, args.n_classes)?;

    let image = match &args.image {
        Some(path) => Some(open_image(path)?.to_rgb8()),
        None => None,
    };

    let palette = ClassPalette::seeded(args.n_classes, args.seed);
    let config = VisualizationConfig::new().with_overlay(args.overlay);
    let rendered = visualize(&map, image.as_ref(), &palette, &config)?;

    rendered
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!("Wrote {}", args.output.display());

    Ok(())
}
