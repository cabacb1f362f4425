use burn::{
    backend::NdArray,
    prelude::*,
    tensor::{Int, Transaction},
    train::metric::{Adaptor, ItemLazy, LossInput},
};
use derive_new::new;

use super::metrics::IoUInput;

/// Output of a segmentation train or validation step.
///
/// - output: `[batch_size, num_classes, height, width]`
/// - targets: `[batch_size, 1, height, width]`
#[derive(new)]
pub struct SegmentationOutput<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub output: Tensor<B, 4>,
    pub targets: Tensor<B, 4, Int>,
}

impl<B: Backend> ItemLazy for SegmentationOutput<B> {
    type ItemSync = SegmentationOutput<NdArray>;

    fn sync(self) -> Self::ItemSync {
        let [output, loss, targets] = Transaction::default()
            .register(self.output)
            .register(self.loss)
            .register(self.targets)
            .execute()
            .try_into()
            .expect("Correct amount of tensor data");

        let device = &Default::default();

        SegmentationOutput {
            output: Tensor::from_data(output, device),
            loss: Tensor::from_data(loss, device),
            targets: Tensor::from_data(targets, device),
        }
    }
}

impl<B: Backend> Adaptor<LossInput<B>> for SegmentationOutput<B> {
    fn adapt(&self) -> LossInput<B> {
        LossInput::new(self.loss.clone())
    }
}

impl<B: Backend> Adaptor<IoUInput<B>> for SegmentationOutput<B> {
    fn adapt(&self) -> IoUInput<B> {
        IoUInput::new(self.output.clone(), self.targets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::IoUMetric;
    use approx::assert_relative_eq;
    use burn::data::dataloader::Progress;
    use burn::train::metric::{LossMetric, Metric, MetricMetadata, Numeric};

    type TestBackend = NdArray;

    #[test]
    fn step_output_feeds_the_iou_metric() {
        let device = Default::default();
        let output = SegmentationOutput::<TestBackend>::new(
            Tensor::from_floats([0.3], &device),
            Tensor::from_floats([[[[0.2, 0.7]], [[0.8, 0.3]]]], &device),
            Tensor::from_ints([[[[1, 0]]]], &device),
        );

        let mut metric = IoUMetric::<TestBackend>::new();
        let iou = metric
            .accumulate_batch(&Adaptor::<IoUInput<TestBackend>>::adapt(&output))
            .unwrap();

        assert_relative_eq!(iou, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn sync_moves_every_tensor_to_ndarray() {
        let device = Default::default();
        let output = SegmentationOutput::<TestBackend>::new(
            Tensor::from_floats([0.3], &device),
            Tensor::from_floats([[[[0.2, 0.7]], [[0.8, 0.3]]]], &device),
            Tensor::from_ints([[[[1, 0]]]], &device),
        );

        let synced = output.sync();

        assert_eq!(synced.output.dims(), [1, 2, 1, 2]);
        assert_eq!(
            synced.output.into_data().to_vec::<f32>().unwrap(),
            vec![0.2, 0.7, 0.8, 0.3]
        );
        assert_eq!(synced.loss.into_data().to_vec::<f32>().unwrap(), vec![0.3]);
        assert_eq!(synced.targets.dims(), [1, 1, 1, 2]);
        assert_eq!(
            synced
                .targets
                .into_data()
                .convert::<i64>()
                .to_vec::<i64>()
                .unwrap(),
            vec![1, 0]
        );
    }

    #[test]
    fn step_output_feeds_the_loss_metric() {
        let device = Default::default();
        let output = SegmentationOutput::<TestBackend>::new(
            Tensor::from_floats([0.3], &device),
            Tensor::from_floats([[[[0.2, 0.7]], [[0.8, 0.3]]]], &device),
            Tensor::from_ints([[[[1, 0]]]], &device),
        );
        let metadata = MetricMetadata {
            progress: Progress {
                items_processed: 1,
                items_total: 1,
            },
            epoch: 1,
            epoch_total: 1,
            iteration: 1,
            lr: None,
        };

        let mut metric = LossMetric::<TestBackend>::new();
        metric.update(&Adaptor::<LossInput<TestBackend>>::adapt(&output), &metadata);

        assert_relative_eq!(metric.value(), 0.3, max_relative = 1e-6);
    }
}
