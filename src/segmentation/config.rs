/// Tunable thresholds for splitting a point sequence into strokes.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Gap threshold is this many times the median inter-point delta.
    pub median_multiplier: f64,

    /// Lower bound for the gap threshold, in milliseconds.
    pub min_gap_ms: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            median_multiplier: 10.0,
            min_gap_ms: 150.0,
        }
    }
}
