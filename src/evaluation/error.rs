use thiserror::Error;

/// Errors raised while scoring predicted class maps against ground truth.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot evaluate an empty dataset")]
    EmptyDataset,

    #[error("Sample count mismatch: {predictions} predictions vs {ground_truths} ground truths")]
    SampleCountMismatch {
        predictions: usize,
        ground_truths: usize,
    },

    #[error(
        "Shape mismatch at sample {index}: prediction {prediction:?} vs ground truth {ground_truth:?}"
    )]
    ShapeMismatch {
        index: usize,
        prediction: [usize; 2],
        ground_truth: [usize; 2],
    },

    #[error("Class {class} at sample {index} is outside [0, {n_classes})")]
    ClassOutOfRange {
        index: usize,
        class: usize,
        n_classes: usize,
    },

    #[error("Class map of {height}x{width} cannot hold {len} values")]
    InvalidGrid {
        height: usize,
        width: usize,
        len: usize,
    },

    #[error("Failed to read tensor data: {0}")]
    TensorData(String),
}
