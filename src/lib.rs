pub mod evaluation;

#[cfg(feature = "dataset")]
pub mod dataset;

#[cfg(feature = "visualization")]
pub mod visualization;

#[cfg(feature = "inference")]
pub mod inference;

#[cfg(feature = "training")]
pub mod training;

#[cfg(feature = "codegen")]
pub mod codegen;

pub use evaluation::{ClassAccumulators, ClassMap, EvaluationError, EvaluationResult, evaluate};

#[cfg(feature = "inference")]
pub use inference::{Predictor, SegmentationModel, SegmentationModelConfig};

#[cfg(feature = "training")]
pub use training::{IoUMetric, SegmentationOutput};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
