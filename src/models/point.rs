use serde::{Deserialize, Serialize};

/// A single pointer sample. `x`/`y` are device coordinates, `t` is the
/// offset in milliseconds from the start of the recording session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Points produced by one continuous contact. Never empty once produced
/// by the segmenter.
pub type Stroke = Vec<Point>;

/// Concatenates strokes back into the flat point sequence they came from.
pub fn flatten_strokes(strokes: &[Stroke]) -> Vec<Point> {
    strokes.iter().flatten().copied().collect()
}
