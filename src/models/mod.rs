pub mod classification;
pub mod point;

pub use classification::{Candidate, ClassificationResult, ResultStatus};
pub use point::{flatten_strokes, Point, Stroke};
