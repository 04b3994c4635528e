//! Fixed-length feature vectors for nearest-neighbour matching.
//!
//! Drawings are centred on their bounding box and scaled so the longer side
//! spans one unit, which removes translation and scale. Each stroke is then
//! resampled by arc length, so stroke order and drawing direction stay
//! visible in the vector.

use crate::models::{Point, Stroke};

pub const MAX_STROKES: usize = 5;
pub const POINTS_PER_STROKE: usize = 20;
pub const FEATURE_LEN: usize = MAX_STROKES * POINTS_PER_STROKE * 2 + 2;

const STROKE_COUNT_WEIGHT: f64 = 0.5;
const MIN_EXTENT: f64 = 1e-6;

pub type FeatureVector = Vec<f64>;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    fn of(strokes: &[Stroke]) -> Option<Self> {
        let mut points = strokes.iter().flatten();
        let first = points.next()?;
        let init = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };

        Some(points.fold(init, |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Centre at the origin and scale into the unit square, preserving aspect.
pub fn normalize(strokes: &[Stroke]) -> Vec<Stroke> {
    let Some(bounds) = Bounds::of(strokes) else {
        return Vec::new();
    };

    let scale = 1.0 / bounds.width().max(bounds.height()).max(MIN_EXTENT);
    let center_x = (bounds.min_x + bounds.max_x) / 2.0;
    let center_y = (bounds.min_y + bounds.max_y) / 2.0;

    strokes
        .iter()
        .filter(|stroke| !stroke.is_empty())
        .map(|stroke| {
            stroke
                .iter()
                .map(|p| Point::new((p.x - center_x) * scale, (p.y - center_y) * scale, p.t))
                .collect()
        })
        .collect()
}

/// Resample a stroke to exactly `n` points spaced evenly along its path.
pub fn resample(stroke: &[Point], n: usize) -> Stroke {
    let Some(first) = stroke.first() else {
        return Vec::new();
    };

    let mut cumulative = Vec::with_capacity(stroke.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for pair in stroke.windows(2) {
        total += pair[0].distance_to(&pair[1]);
        cumulative.push(total);
    }

    if stroke.len() == 1 || total == 0.0 || n < 2 {
        return vec![*first; n];
    }

    let mut resampled = Vec::with_capacity(n);
    let mut segment = 0;
    for i in 0..n {
        let target = total * i as f64 / (n - 1) as f64;
        while segment + 2 < cumulative.len() && cumulative[segment + 1] < target {
            segment += 1;
        }

        let (a, b) = (stroke[segment], stroke[segment + 1]);
        let span = cumulative[segment + 1] - cumulative[segment];
        let ratio = if span > 0.0 {
            ((target - cumulative[segment]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        resampled.push(Point::new(
            a.x + (b.x - a.x) * ratio,
            a.y + (b.y - a.y) * ratio,
            a.t + (b.t - a.t) * ratio,
        ));
    }

    resampled
}

/// Build the feature vector for a drawing. Returns `None` when the drawing
/// holds no points at all.
pub fn extract_features(strokes: &[Stroke]) -> Option<FeatureVector> {
    let bounds = Bounds::of(strokes)?;
    let stroke_count = strokes.iter().filter(|s| !s.is_empty()).count();

    let mut features = Vec::with_capacity(FEATURE_LEN);
    let normalized = normalize(strokes);

    for index in 0..MAX_STROKES {
        match normalized.get(index) {
            Some(stroke) => {
                for p in resample(stroke, POINTS_PER_STROKE) {
                    features.push(p.x);
                    features.push(p.y);
                }
            }
            None => features.extend(std::iter::repeat(0.0).take(POINTS_PER_STROKE * 2)),
        }
    }

    let extent = bounds.width() + bounds.height();
    let aspect = if extent > MIN_EXTENT {
        bounds.width() / extent
    } else {
        0.5
    };

    features.push(stroke_count as f64 * STROKE_COUNT_WEIGHT);
    features.push(aspect);

    Some(features)
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
