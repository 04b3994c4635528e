pub mod algorithm;
pub mod config;

pub use algorithm::segment_strokes;
pub use config::SegmentationConfig;
