mod accumulator;
mod class_map;
mod error;
mod evaluator;
pub mod tensor;

pub use accumulator::ClassAccumulators;
pub use class_map::ClassMap;
pub use error::EvaluationError;
pub use evaluator::{EvaluationResult, IOU_EPSILON, evaluate};
