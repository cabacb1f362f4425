use super::{ClassMap, EvaluationError, EvaluationResult};

/// Running per-class pixel counts of one evaluation pass.
///
/// Counts only ever grow. Partial accumulators built over disjoint sample
/// sets can be combined with [ClassAccumulators::merge].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassAccumulators {
    true_positives: Vec<u64>,
    false_positives: Vec<u64>,
    false_negatives: Vec<u64>,
    pixel_counts: Vec<u64>,
    samples: usize,
}

impl ClassAccumulators {
    pub fn new(n_classes: usize) -> Result<Self, EvaluationError> {
        if n_classes == 0 {
            return Err(EvaluationError::InvalidArgument(
                "n_classes must be positive".to_string(),
            ));
        }

        Ok(Self {
            true_positives: vec![0; n_classes],
            false_positives: vec![0; n_classes],
            false_negatives: vec![0; n_classes],
            pixel_counts: vec![0; n_classes],
            samples: 0,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.pixel_counts.len()
    }

    /// Number of samples accumulated so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn true_positives(&self) -> &[u64] {
        &self.true_positives
    }

    pub fn false_positives(&self) -> &[u64] {
        &self.false_positives
    }

    pub fn false_negatives(&self) -> &[u64] {
        &self.false_negatives
    }

    /// Ground-truth pixels per class.
    pub fn pixel_counts(&self) -> &[u64] {
        &self.pixel_counts
    }

    /// Add one prediction / ground-truth pair.
    ///
    /// The pair is validated before any count changes, so a rejected sample
    /// leaves the accumulators untouched.
    pub fn accumulate(
        &mut self,
        prediction: &ClassMap,
        ground_truth: &ClassMap,
    ) -> Result<(), EvaluationError> {
        let index = self.samples;

        if prediction.dims() != ground_truth.dims() {
            return Err(EvaluationError::ShapeMismatch {
                index,
                prediction: prediction.dims(),
                ground_truth: ground_truth.dims(),
            });
        }

        let n_classes = self.n_classes();
        if let Some(class) = prediction
            .iter()
            .chain(ground_truth.iter())
            .find(|&class| class >= n_classes)
        {
            return Err(EvaluationError::ClassOutOfRange {
                index,
                class,
                n_classes,
            });
        }

        for (predicted, actual) in prediction.iter().zip(ground_truth.iter()) {
            self.record(predicted, actual);
        }
        self.samples += 1;

        Ok(())
    }

    /// Count a single pixel. Both classes must be below `n_classes`.
    pub(crate) fn record(&mut self, predicted: usize, actual: usize) {
        if predicted == actual {
            self.true_positives[actual] += 1;
        } else {
            self.false_positives[predicted] += 1;
            self.false_negatives[actual] += 1;
        }
        self.pixel_counts[actual] += 1;
    }

    pub(crate) fn add_sample(&mut self) {
        self.samples += 1;
    }

    /// Add the counts of `other` into `self`.
    pub fn merge(&mut self, other: &ClassAccumulators) -> Result<(), EvaluationError> {
        if other.n_classes() != self.n_classes() {
            return Err(EvaluationError::InvalidArgument(format!(
                "cannot merge accumulators over {} and {} classes",
                self.n_classes(),
                other.n_classes()
            )));
        }

        let pairs = [
            (&mut self.true_positives, &other.true_positives),
            (&mut self.false_positives, &other.false_positives),
            (&mut self.false_negatives, &other.false_negatives),
            (&mut self.pixel_counts, &other.pixel_counts),
        ];
        for (lhs, rhs) in pairs {
            lhs.iter_mut().zip(rhs).for_each(|(a, b)| *a += b);
        }
        self.samples += other.samples;

        Ok(())
    }

    /// Derive IoU scores from the counts gathered so far.
    pub fn finish(&self) -> Result<EvaluationResult, EvaluationError> {
        let total_pixels: u64 = self.pixel_counts.iter().sum();
        if self.samples == 0 || total_pixels == 0 {
            return Err(EvaluationError::EmptyDataset);
        }

        Ok(EvaluationResult::from_counts(
            &self.true_positives,
            &self.false_positives,
            &self.false_negatives,
            &self.pixel_counts,
        ))
    }
}
