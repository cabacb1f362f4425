use std::fmt;

use serde::Serialize;

use super::{ClassAccumulators, ClassMap, EvaluationError};

/// Guard against division by zero for classes that never appear.
pub const IOU_EPSILON: f64 = 1e-12;

/// Scores of one evaluation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationResult {
    class_wise_iou: Vec<f64>,
    mean_iou: f64,
    frequency_weighted_iou: f64,
}

impl EvaluationResult {
    pub(crate) fn from_counts(
        true_positives: &[u64],
        false_positives: &[u64],
        false_negatives: &[u64],
        pixel_counts: &[u64],
    ) -> Self {
        let class_wise_iou: Vec<f64> = true_positives
            .iter()
            .zip(false_positives)
            .zip(false_negatives)
            .map(|((&tp, &fp), &fn_)| {
                let tp = tp as f64;
                tp / (tp + fp as f64 + fn_ as f64 + IOU_EPSILON)
            })
            .collect();

        let mean_iou = class_wise_iou.iter().sum::<f64>() / class_wise_iou.len() as f64;

        let total_pixels = pixel_counts.iter().sum::<u64>() as f64;
        let frequency_weighted_iou = class_wise_iou
            .iter()
            .zip(pixel_counts)
            .map(|(iou, &pixels)| iou * (pixels as f64 / total_pixels))
            .sum();

        Self {
            class_wise_iou,
            mean_iou,
            frequency_weighted_iou,
        }
    }

    pub fn class_wise_iou(&self) -> &[f64] {
        &self.class_wise_iou
    }

    pub fn mean_iou(&self) -> f64 {
        self.mean_iou
    }

    pub fn frequency_weighted_iou(&self) -> f64 {
        self.frequency_weighted_iou
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8}  {:>8}", "class", "IoU")?;
        for (class, iou) in self.class_wise_iou.iter().enumerate() {
            writeln!(f, "{:>8}  {:>8.4}", class, iou)?;
        }
        writeln!(f, "mean IoU: {:.4}", self.mean_iou)?;
        write!(
            f,
            "frequency weighted IoU: {:.4}",
            self.frequency_weighted_iou
        )
    }
}

/// Score `predictions` against `ground_truths`, pairing samples by position.
///
/// Pixel counts are accumulated over the whole dataset before any ratio is
/// taken, so the result does not depend on sample order.
pub fn evaluate(
    predictions: &[ClassMap],
    ground_truths: &[ClassMap],
    n_classes: usize,
) -> Result<EvaluationResult, EvaluationError> {
    let mut accumulators = ClassAccumulators::new(n_classes)?;

    if predictions.len() != ground_truths.len() {
        return Err(EvaluationError::SampleCountMismatch {
            predictions: predictions.len(),
            ground_truths: ground_truths.len(),
        });
    }
    if predictions.is_empty() {
        return Err(EvaluationError::EmptyDataset);
    }

    for (prediction, ground_truth) in predictions.iter().zip(ground_truths) {
        accumulators.accumulate(prediction, ground_truth)?;
    }

    tracing::debug!(
        "Accumulated {} samples over {} classes",
        accumulators.samples(),
        n_classes
    );

    accumulators.finish()
}
