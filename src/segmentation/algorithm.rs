use crate::models::{Point, Stroke};
use crate::segmentation::config::SegmentationConfig;

/// Partition an ordered point sequence into strokes.
///
/// A new stroke starts wherever the time gap to the previous point exceeds
/// `max(median_delta * median_multiplier, min_gap_ms)`. Concatenating the
/// returned strokes yields the input unchanged.
pub fn segment_strokes(points: &[Point], config: &SegmentationConfig) -> Vec<Stroke> {
    // Edge cases: nothing to split
    match points.len() {
        0 => return Vec::new(),
        1 => return vec![points.to_vec()],
        _ => {}
    }

    let deltas: Vec<f64> = points.windows(2).map(|w| w[1].t - w[0].t).collect();
    let threshold = gap_threshold(&deltas, config);

    let mut strokes = Vec::new();
    let mut current: Stroke = vec![points[0]];

    for (point, delta) in points[1..].iter().zip(&deltas) {
        if *delta > threshold {
            strokes.push(std::mem::take(&mut current));
        }
        current.push(*point);
    }

    strokes.push(current);
    strokes
}

/// Adaptive stroke-gap threshold for a set of consecutive deltas.
pub fn gap_threshold(deltas: &[f64], config: &SegmentationConfig) -> f64 {
    (median(deltas) * config.median_multiplier).max(config.min_gap_ms)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
