use std::marker::PhantomData;

use burn::prelude::*;
use burn::train::metric::state::{FormatOptions, NumericMetricState};
use burn::train::metric::{Metric, MetricEntry, MetricMetadata, Numeric};
use derive_new::new;

use crate::evaluation::{
    ClassAccumulators, EvaluationError, EvaluationResult,
    tensor::{class_maps_from_batch, class_maps_from_indices},
};

/// Mean IoU of each batch, with dataset-wide counts kept alongside.
#[derive(Default)]
pub struct IoUMetric<B: Backend> {
    state: NumericMetricState,
    accumulators: Option<ClassAccumulators>,
    _b: PhantomData<B>,
}

/// - outputs: `[batch_size, num_classes, height, width]` class scores
/// - targets: `[batch_size, 1, height, width]` class indices
#[derive(new)]
pub struct IoUInput<B: Backend> {
    outputs: Tensor<B, 4>,
    targets: Tensor<B, 4, Int>,
}

impl<B: Backend> IoUMetric<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one batch and return its mean IoU.
    ///
    /// Outputs and targets must hold the same number of samples. A change in
    /// the number of classes restarts the running counts.
    pub fn accumulate_batch(&mut self, input: &IoUInput<B>) -> Result<f64, EvaluationError> {
        let [_, n_classes, _, _] = input.outputs.dims();

        let predictions = class_maps_from_batch(input.outputs.clone())?;
        let targets = class_maps_from_indices(input.targets.clone())?;
        if predictions.len() != targets.len() {
            return Err(EvaluationError::SampleCountMismatch {
                predictions: predictions.len(),
                ground_truths: targets.len(),
            });
        }

        let mut batch = ClassAccumulators::new(n_classes)?;
        for (prediction, target) in predictions.iter().zip(&targets) {
            batch.accumulate(prediction, target)?;
        }
        let batch_iou = batch.finish()?.mean_iou();

        match &mut self.accumulators {
            Some(running) if running.n_classes() == n_classes => running.merge(&batch)?,
            Some(running) => {
                tracing::warn!(
                    "IoU metric switched from {} to {} classes, dropping {} accumulated samples",
                    running.n_classes(),
                    n_classes,
                    running.samples()
                );
                self.accumulators = Some(batch);
            }
            None => self.accumulators = Some(batch),
        }

        Ok(batch_iou)
    }

    /// Scores over every batch seen since the last [clear](Metric::clear).
    pub fn evaluation(&self) -> Result<EvaluationResult, EvaluationError> {
        self.accumulators
            .as_ref()
            .ok_or(EvaluationError::EmptyDataset)?
            .finish()
    }
}

impl<B: Backend> Metric for IoUMetric<B> {
    type Input = IoUInput<B>;
    const NAME: &'static str = "IoU";

    /// Rejected batches are logged and left out of both the running average
    /// and the dataset-wide counts.
    fn update(&mut self, input: &IoUInput<B>, _metadata: &MetricMetadata) -> MetricEntry {
        let [batch_size, _, _, _] = input.outputs.dims();

        let iou = match self.accumulate_batch(input) {
            Ok(iou) => iou,
            Err(err) => {
                tracing::warn!("Skipping batch in IoU metric: {}", err);
                let value = self.state.value();
                return MetricEntry {
                    name: Self::NAME.to_string(),
                    formatted: format!("{} {:.2} % (batch skipped)", Self::NAME, value),
                    serialize: value.to_string(),
                };
            }
        };

        self.state.update(
            100.0 * iou,
            batch_size,
            FormatOptions::new(Self::NAME).unit("%").precision(2),
        )
    }

    fn clear(&mut self) {
        self.state.reset();
        self.accumulators = None;
    }
}

impl<B: Backend> Numeric for IoUMetric<B> {
    fn value(&self) -> f64 {
        self.state.value()
    }
}
