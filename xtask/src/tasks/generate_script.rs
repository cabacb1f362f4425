use std::path::PathBuf;

use anyhow::Result;
use burn_segnet::codegen::DetectorScriptConfig;
use clap::Args;

#[derive(Args)]
pub struct GenerateScriptArgs {
    /// Directory receiving generated_script.py.
    #[arg(short, long, default_value = ".")]
    pub target_dir: PathBuf,

    #[arg(short, long, value_delimiter = ',', required = true)]
    pub classes: Vec<String>,

    /// Flattened (width, height) anchor pairs.
    #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub anchors: Vec<f64>,

    #[arg(short, long, value_delimiter = ',', default_value = "7,7,35")]
    pub outputs: Vec<usize>,

    #[arg(long, default_value_t = 0.8)]
    pub threshold: f64,

    #[arg(long, default_value_t = 0.5)]
    pub nms: f64,
}

pub fn run(args: &GenerateScriptArgs) -> Result<()> {
    let anchor_count = args.anchors.len() / 2;
    let config = DetectorScriptConfig::new(
        args.classes.clone(),
        args.anchors.clone(),
        args.outputs.clone(),
    )
    .with_threshold(args.threshold)
    .with_nms(args.nms)
    .with_anchor_count(anchor_count);

    let path = config.write_to(&args.target_dir)?;
    println!("Script generated successfully as '{}'.", path.display());

    Ok(())
}
