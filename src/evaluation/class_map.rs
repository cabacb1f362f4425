use std::collections::BTreeSet;

use super::EvaluationError;

/// A row-major `[height, width]` grid of class indices.
///
/// Used for both model predictions and ground-truth annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMap {
    height: usize,
    width: usize,
    data: Vec<usize>,
}

impl ClassMap {
    pub fn new(height: usize, width: usize, data: Vec<usize>) -> Result<Self, EvaluationError> {
        if data.len() != height * width {
            return Err(EvaluationError::InvalidGrid {
                height,
                width,
                len: data.len(),
            });
        }

        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Every pixel set to `class`.
    pub fn filled(height: usize, width: usize, class: usize) -> Self {
        Self {
            height,
            width,
            data: vec![class; height * width],
        }
    }

    /// Build a map from equally sized rows.
    pub fn from_rows<const W: usize>(rows: &[[usize; W]]) -> Self {
        Self {
            height: rows.len(),
            width: W,
            data: rows.concat(),
        }
    }

    /// Reduce a channel-last `[height, width, n_classes]` encoding to class
    /// indices by taking the arg-max of every pixel.
    ///
    /// Ties resolve to the lowest class index.
    pub fn from_one_hot(
        values: &[f32],
        height: usize,
        width: usize,
        n_classes: usize,
    ) -> Result<Self, EvaluationError> {
        if n_classes == 0 {
            return Err(EvaluationError::InvalidArgument(
                "n_classes must be positive".to_string(),
            ));
        }
        if values.len() != height * width * n_classes {
            return Err(EvaluationError::InvalidGrid {
                height,
                width,
                len: values.len() / n_classes,
            });
        }

        let data = values
            .chunks_exact(n_classes)
            .map(|pixel| {
                pixel
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (class, &value)| {
                        if value > best.1 { (class, value) } else { best }
                    })
                    .0
            })
            .collect();

        Self::new(height, width, data)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `[height, width]`
    pub fn dims(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, y: usize, x: usize) -> Option<usize> {
        if y >= self.height || x >= self.width {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.data.iter().copied()
    }

    /// Sorted, deduplicated class indices found in the map.
    pub fn classes_present(&self) -> Vec<usize> {
        let classes: BTreeSet<usize> = self.data.iter().copied().collect();
        tracing::debug!("Found the following classes in the class map: {:?}", classes);
        classes.into_iter().collect()
    }

    /// Nearest-neighbour resampling to `[height, width]`.
    pub fn resize_nearest(&self, height: usize, width: usize) -> Self {
        if [height, width] == self.dims() {
            return self.clone();
        }
        if self.is_empty() {
            return Self::filled(height, width, 0);
        }

        let mut data = Vec::with_capacity(height * width);
        for y in 0..height {
            let src_y = y * self.height / height;
            for x in 0..width {
                let src_x = x * self.width / width;
                data.push(self.data[src_y * self.width + src_x]);
            }
        }

        Self {
            height,
            width,
            data,
        }
    }
}
