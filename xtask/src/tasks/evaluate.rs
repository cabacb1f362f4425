use std::path::PathBuf;

use anyhow::{Context, Result};
use burn_segnet::{
    ClassAccumulators,
    dataset::{load_annotation, pairs_from_paths},
};
use clap::Args;

#[derive(Args)]
pub struct EvaluateArgs {
    /// Directory of predicted, index-encoded masks.
    #[arg(short, long)]
    pub predictions_dir: PathBuf,

    /// Directory of ground-truth annotations named like the predictions.
    #[arg(short, long)]
    pub annotations_dir: PathBuf,

    #[arg(short, long)]
    pub n_classes: usize,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &EvaluateArgs) -> Result<()> {
    let pairs = pairs_from_paths(&args.predictions_dir, &args.annotations_dir)
        .context("Failed to pair predictions with annotations")?;

    let mut accumulators = ClassAccumulators::new(args.n_classes)?;
    for (prediction_path, annotation_path) in &pairs {
        let prediction = load_annotation(prediction_path, args.n_classes)?;
        let ground_truth = load_annotation(annotation_path, args.n_classes)?;

        accumulators
            .accumulate(&prediction, &ground_truth)
            .with_context(|| format!("Failed to score {}", prediction_path.display()))?;
    }

    let result = accumulators.finish()?;
    tracing::info!("Evaluated {} samples", accumulators.samples());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
    }

    Ok(())
}
