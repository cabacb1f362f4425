//! Conversions from burn tensors to [ClassMap]s.
//!
//! Score tensors are reduced with an arg-max over the class axis, the same
//! reduction that turns a one-hot annotation into a class index grid.

use burn::prelude::*;

use super::{ClassMap, EvaluationError};

/// Reduce a `[num_classes, height, width]` score tensor to a class map.
pub fn class_map_from_scores<B: Backend>(
    scores: Tensor<B, 3>,
) -> Result<ClassMap, EvaluationError> {
    let [_, height, width] = scores.dims();
    let indices: Tensor<B, 4, Int> = scores.argmax(0).reshape([1, 1, height, width]);

    class_maps_from_indices(indices)?
        .pop()
        .ok_or(EvaluationError::EmptyDataset)
}

/// Reduce a `[batch_size, num_classes, height, width]` score tensor to one
/// class map per sample.
pub fn class_maps_from_batch<B: Backend>(
    scores: Tensor<B, 4>,
) -> Result<Vec<ClassMap>, EvaluationError> {
    class_maps_from_indices(scores.argmax(1))
}

/// Split `[batch_size, 1, height, width]` integer targets into class maps.
pub fn class_maps_from_indices<B: Backend>(
    indices: Tensor<B, 4, Int>,
) -> Result<Vec<ClassMap>, EvaluationError> {
    let [batch_size, channels, height, width] = indices.dims();
    if channels != 1 {
        return Err(EvaluationError::InvalidArgument(format!(
            "class index tensors must have exactly 1 channel, got {}",
            channels
        )));
    }

    let values = indices
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| EvaluationError::TensorData(format!("{:?}", e)))?;

    let values = values
        .into_iter()
        .map(|value| {
            usize::try_from(value).map_err(|_| {
                EvaluationError::InvalidArgument(format!("negative class index {}", value))
            })
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let plane = height * width;
    (0..batch_size)
        .map(|i| ClassMap::new(height, width, values[i * plane..(i + 1) * plane].to_vec()))
        .collect()
}
