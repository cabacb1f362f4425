mod checkpoint;
mod predictor;

use std::path::PathBuf;

use thiserror::Error;

use crate::{dataset::DatasetError, evaluation::EvaluationError, visualization::VisualizationError};

pub use checkpoint::{
    SegmentationModelConfig, find_latest_checkpoint, load_latest_weights, save_checkpoint,
};
pub use predictor::{Predictor, SegmentationModel};

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Checkpoint not found: {0:?}")]
    CheckpointNotFound(PathBuf),

    #[error("Invalid model configuration {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Failed to record model: {0}")]
    Recorder(String),

    #[error("Model produced {actual} classes, configuration expects {expected}")]
    ClassCount { expected: usize, actual: usize },

    #[error("Model produced no output")]
    EmptyOutput,

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Visualization(#[from] VisualizationError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
