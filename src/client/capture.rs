//! Point buffer for one recording.

use crate::models::Point;

use super::recenter::JitterFilter;

/// Collects pointer samples with timestamps relative to the moment capture
/// started. Timestamps never go backwards, even if the event source does.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCapture {
    origin_ms: f64,
    last_t: f64,
    points: Vec<Point>,
    filter: JitterFilter,
}

impl PointCapture {
    pub fn new(origin_ms: f64, jitter_threshold_px: f64) -> Self {
        Self {
            origin_ms,
            last_t: 0.0,
            points: Vec::new(),
            filter: JitterFilter::new(jitter_threshold_px),
        }
    }

    /// Feed one pointer sample taken at `at_ms` on the driver's clock.
    /// Returns how many points were appended (0 while jitter is held back).
    pub fn record(&mut self, x: f64, y: f64, at_ms: f64) -> usize {
        if !(x.is_finite() && y.is_finite() && at_ms.is_finite()) {
            return 0;
        }

        let t = (at_ms - self.origin_ms).max(self.last_t);
        self.last_t = t;
        let accepted = self.filter.feed(Point::new(x, y, t));
        let count = accepted.len();
        self.points.extend(accepted);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }
}
