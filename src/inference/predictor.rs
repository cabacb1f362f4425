use std::path::{Path, PathBuf};

use burn::prelude::*;
use image::{DynamicImage, RgbImage, imageops::FilterType};

use super::{InferenceError, SegmentationModelConfig, load_latest_weights};
use crate::{
    dataset::{load_annotation, open_image},
    evaluation::{ClassAccumulators, ClassMap, EvaluationResult, tensor::class_maps_from_batch},
    visualization::{ClassPalette, VisualizationConfig, visualize},
};

/// A model that maps `[batch_size, 3, height, width]` RGB images in `[0, 1]`
/// to `[batch_size, num_classes, height', width']` class scores.
pub trait SegmentationModel<B: Backend> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4>;
}

/// A model handle together with the configuration it was built from.
pub struct Predictor<B: Backend, M> {
    model: M,
    config: SegmentationModelConfig,
    device: B::Device,
}

impl<B: Backend, M: SegmentationModel<B>> Predictor<B, M> {
    pub fn new(model: M, config: SegmentationModelConfig, device: B::Device) -> Self {
        Self {
            model,
            config,
            device,
        }
    }

    /// Rebuild a model from `<checkpoints_path>_config.json` with `init` and
    /// load its most recent weights.
    pub fn from_checkpoint<F>(
        init: F,
        checkpoints_path: &Path,
        device: B::Device,
    ) -> Result<Self, InferenceError>
    where
        M: Module<B>,
        F: FnOnce(&SegmentationModelConfig, &B::Device) -> M,
    {
        let config = SegmentationModelConfig::load_from_checkpoint(checkpoints_path)?;
        tracing::info!(
            "Building {} with {} classes at {}x{}",
            config.model_class,
            config.n_classes,
            config.input_height,
            config.input_width
        );

        let model = init(&config, &device);
        let model = load_latest_weights(model, checkpoints_path, &device)?;

        Ok(Self::new(model, config, device))
    }

    pub fn config(&self) -> &SegmentationModelConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn image_to_tensor(&self, image: &DynamicImage) -> Tensor<B, 4> {
        let (height, width) = (self.config.input_height, self.config.input_width);

        let rgb = image.to_rgb8();
        let rgb = if rgb.dimensions() == (width as u32, height as u32) {
            rgb
        } else {
            image::imageops::resize(&rgb, width as u32, height as u32, FilterType::Triangle)
        };

        let mut image_data = Vec::with_capacity(3 * height * width);
        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    image_data.push(rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0);
                }
            }
        }

        Tensor::<B, 4>::from_data(
            TensorData::new(image_data, Shape::new([1, 3, height, width]))
                .convert::<B::FloatElem>(),
            &self.device,
        )
    }

    /// Predict the class of every pixel of `image`, at the model's output
    /// resolution.
    pub fn predict(&self, image: &DynamicImage) -> Result<ClassMap, InferenceError> {
        let scores = self.model.forward(self.image_to_tensor(image));

        let [_, num_classes, _, _] = scores.dims();
        if num_classes != self.config.n_classes {
            return Err(InferenceError::ClassCount {
                expected: self.config.n_classes,
                actual: num_classes,
            });
        }

        class_maps_from_batch(scores)?
            .pop()
            .ok_or(InferenceError::EmptyOutput)
    }

    pub fn predict_path(&self, path: &Path) -> Result<ClassMap, InferenceError> {
        self.predict(&open_image(path)?)
    }

    /// Predict every input. When `out_dir` is set, the prediction is drawn
    /// over its input and saved there under the input's file name.
    pub fn predict_multiple(
        &self,
        inputs: &[PathBuf],
        out_dir: Option<&Path>,
        palette: &ClassPalette,
    ) -> Result<Vec<ClassMap>, InferenceError> {
        if let Some(dir) = out_dir {
            std::fs::create_dir_all(dir)?;
        }

        let config = VisualizationConfig::new().with_overlay(true);
        let mut predictions = Vec::with_capacity(inputs.len());

        for (i, input) in inputs.iter().enumerate() {
            let image = open_image(input)?;
            let prediction = self.predict(&image)?;

            if let Some(dir) = out_dir {
                let name = input
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(format!("{}.png", i)));
                let rendered: RgbImage =
                    visualize(&prediction, Some(&image.to_rgb8()), palette, &config)?;
                rendered.save(dir.join(name))?;
            }

            tracing::debug!("Predicted {}/{}: {}", i + 1, inputs.len(), input.display());
            predictions.push(prediction);
        }

        Ok(predictions)
    }

    /// Score the model over `(image, annotation)` pairs.
    ///
    /// Predictions are resized (nearest neighbour) to their annotation's size
    /// before counting. Pixels are therefore counted at annotation resolution,
    /// not on the model's output grid: an annotation larger than the model
    /// input contributes more pixels, and so more weight in the
    /// frequency-weighted IoU, than a small one.
    pub fn evaluate(
        &self,
        pairs: &[(PathBuf, PathBuf)],
    ) -> Result<EvaluationResult, InferenceError> {
        let mut accumulators = ClassAccumulators::new(self.config.n_classes)?;

        for (image_path, annotation_path) in pairs {
            let prediction = self.predict_path(image_path)?;
            let ground_truth = load_annotation(annotation_path, self.config.n_classes)?;
            let prediction = prediction.resize_nearest(ground_truth.height(), ground_truth.width());

            accumulators.accumulate(&prediction, &ground_truth)?;
        }

        tracing::info!("Evaluated {} samples", accumulators.samples());

        Ok(accumulators.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::save_checkpoint;
    use approx::assert_relative_eq;
    use burn::{
        backend::NdArray,
        nn::conv::{Conv2d, Conv2dConfig},
    };
    use image::{GrayImage, Luma, Rgb};

    type TestBackend = NdArray;

    /// Class 1 wherever the red channel is above one half.
    struct Redness;

    impl SegmentationModel<TestBackend> for Redness {
        fn forward(&self, images: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 4> {
            let red = images.narrow(1, 0, 1);
            let background = red.ones_like() * 0.5;
            Tensor::cat(vec![background, red], 1)
        }
    }

    fn half_red_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 0]) }
        }))
    }

    fn predictor() -> Predictor<TestBackend, Redness> {
        let config = SegmentationModelConfig::new("redness".to_string(), 2)
            .with_input_height(2)
            .with_input_width(4);
        Predictor::new(Redness, config, Default::default())
    }

    #[test]
    fn predict_returns_argmax_class_map() {
        let map = predictor().predict(&half_red_image()).unwrap();

        assert_eq!(map.dims(), [2, 4]);
        assert_eq!(map.as_slice(), &[1, 1, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn class_count_mismatch_is_reported() {
        let config = SegmentationModelConfig::new("redness".to_string(), 3)
            .with_input_height(2)
            .with_input_width(4);
        let predictor = Predictor::<TestBackend, _>::new(Redness, config, Default::default());

        assert!(matches!(
            predictor.predict(&half_red_image()),
            Err(InferenceError::ClassCount {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn evaluate_scores_against_larger_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("sample.png");
        let annotation_path = dir.path().join("sample_mask.png");
        half_red_image().save(&image_path).unwrap();
        GrayImage::from_fn(8, 4, |x, _| Luma([if x < 4 { 1 } else { 0 }]))
            .save(&annotation_path)
            .unwrap();

        let result = predictor()
            .evaluate(&[(image_path, annotation_path)])
            .unwrap();

        assert_relative_eq!(result.mean_iou(), 1.0, max_relative = 1e-9);
        assert_relative_eq!(result.frequency_weighted_iou(), 1.0, max_relative = 1e-9);
    }

    #[test]
    fn pixels_are_weighted_at_annotation_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("sample.png");
        half_red_image().save(&image_path).unwrap();
        let small = dir.path().join("small_mask.png");
        GrayImage::from_fn(4, 2, |x, _| Luma([if x < 2 { 1 } else { 0 }]))
            .save(&small)
            .unwrap();
        let large = dir.path().join("large_mask.png");
        GrayImage::from_fn(8, 8, |x, _| Luma([if x < 3 { 1 } else { 0 }]))
            .save(&large)
            .unwrap();

        let result = predictor()
            .evaluate(&[(image_path.clone(), small), (image_path, large)])
            .unwrap();

        // 8 pixels from the small pair, 64 from the large one where the
        // upsampled prediction spills one column into the background.
        assert_relative_eq!(result.class_wise_iou()[0], 36.0 / 44.0, max_relative = 1e-9);
        assert_relative_eq!(result.class_wise_iou()[1], 28.0 / 36.0, max_relative = 1e-9);
        assert_relative_eq!(result.frequency_weighted_iou(), 65.0 / 81.0, max_relative = 1e-9);
    }

    #[test]
    fn predict_multiple_writes_overlays() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.png");
        half_red_image().save(&input).unwrap();
        let out_dir = dir.path().join("out");

        let predictions = predictor()
            .predict_multiple(
                &[input],
                Some(&out_dir),
                &ClassPalette::new(vec![[0, 0, 0], [0, 255, 0]]),
            )
            .unwrap();

        assert_eq!(predictions.len(), 1);
        let rendered = image::open(out_dir.join("frame.png")).unwrap().to_rgb8();
        assert_eq!(rendered.dimensions(), (4, 2));
        assert_eq!(rendered.get_pixel(0, 0).0, [127, 127, 0]);
        assert_eq!(rendered.get_pixel(3, 1).0, [0, 0, 0]);
    }

    #[derive(Module, Debug)]
    struct PixelClassifier<B: Backend> {
        conv: Conv2d<B>,
    }

    impl<B: Backend> SegmentationModel<B> for PixelClassifier<B> {
        fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
            self.conv.forward(images)
        }
    }

    #[test]
    fn predictor_is_rebuilt_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("pixel");
        let device = Default::default();
        let init = |config: &SegmentationModelConfig, device: &<TestBackend as Backend>::Device| {
            PixelClassifier::<TestBackend> {
                conv: Conv2dConfig::new([3, config.n_classes], [1, 1]).init(device),
            }
        };

        let config = SegmentationModelConfig::new("pixel".to_string(), 3)
            .with_input_height(2)
            .with_input_width(4);
        config.save_for_checkpoint(&checkpoints).unwrap();
        save_checkpoint(init(&config, &device), &checkpoints, 1).unwrap();

        let predictor =
            Predictor::<TestBackend, _>::from_checkpoint(init, &checkpoints, device).unwrap();
        let map = predictor.predict(&half_red_image()).unwrap();

        assert_eq!(predictor.config(), &config);
        assert_eq!(map.dims(), [2, 4]);
        assert!(map.iter().all(|class| class < 3));
    }

    #[test]
    fn missing_weights_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("pixel");
        SegmentationModelConfig::new("pixel".to_string(), 2)
            .save_for_checkpoint(&checkpoints)
            .unwrap();

        let result = Predictor::<TestBackend, PixelClassifier<TestBackend>>::from_checkpoint(
            |config, device| PixelClassifier {
                conv: Conv2dConfig::new([3, config.n_classes], [1, 1]).init(device),
            },
            &checkpoints,
            Default::default(),
        );

        assert!(matches!(result, Err(InferenceError::CheckpointNotFound(_))));
    }
}
