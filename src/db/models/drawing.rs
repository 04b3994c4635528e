//! Persisted training drawings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{flatten_strokes, Point, Stroke};

/// One stored exemplar: a labelled drawing kept as its strokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drawing {
    pub id: String,
    pub label: String,
    pub strokes: Vec<Stroke>,
    pub created_at: DateTime<Utc>,
}

impl Drawing {
    pub fn points(&self) -> Vec<Point> {
        flatten_strokes(&self.strokes)
    }
}

/// Number of stored drawings for one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}
