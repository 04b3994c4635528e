//! Online teaching: turns a user correction into a stored exemplar that the
//! very next classification can match against.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::SymbolClassifier;
use crate::db::{Database, Drawing};
use crate::error::{TeachError, ValidationError};
use crate::models::{Point, Stroke};

const MAX_LABEL_CHARS: usize = 64;

/// Teach payload. Either pre-segmented `strokes` or a flat `points`
/// recording is accepted; strokes win when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeachRequest {
    pub label: String,
    #[serde(default)]
    pub points: Option<Vec<Point>>,
    #[serde(default)]
    pub strokes: Option<Vec<Stroke>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeachOutcome {
    pub id: String,
    pub label: String,
    pub stroke_count: usize,
}

#[derive(Clone)]
pub struct OnlineTeacher {
    db: Database,
    classifier: Arc<SymbolClassifier>,
}

impl OnlineTeacher {
    pub fn new(db: Database, classifier: Arc<SymbolClassifier>) -> Self {
        Self { db, classifier }
    }

    /// Persist the drawing, then append it to the live exemplar store.
    /// Returns only once the exemplar is visible to classification.
    pub async fn teach(&self, request: TeachRequest) -> Result<TeachOutcome, TeachError> {
        let label = validate_label(&request.label)?;
        let strokes = self.resolve_strokes(request)?;

        let drawing = Drawing {
            id: Uuid::new_v4().to_string(),
            label: label.clone(),
            strokes,
            created_at: Utc::now(),
        };

        self.db.insert_drawing(&drawing).await?;
        self.classifier
            .add_exemplar(&drawing.id, &drawing.label, &drawing.strokes)
            .map_err(|err| anyhow!("exemplar store rejected drawing {}: {err}", drawing.id))?;

        info!(
            "Learned '{}' from {} stroke(s) as drawing {}",
            drawing.label,
            drawing.strokes.len(),
            drawing.id
        );

        Ok(TeachOutcome {
            id: drawing.id,
            label: drawing.label,
            stroke_count: drawing.strokes.len(),
        })
    }

    /// Remove a stored drawing and its exemplar. Returns false when unknown.
    pub async fn forget(&self, id: &str) -> anyhow::Result<bool> {
        let deleted = self.db.delete_drawing(id).await?;
        if deleted {
            self.classifier
                .remove_exemplar(id)
                .map_err(|err| anyhow!("failed to drop exemplar {id}: {err}"))?;
            info!("Forgot drawing {id}");
        }
        Ok(deleted)
    }

    /// Delete every stored drawing and empty the exemplar store.
    /// Returns how many drawings were deleted.
    pub async fn reset(&self) -> anyhow::Result<usize> {
        let deleted = self.db.delete_all_drawings().await?;
        let dropped = self
            .classifier
            .reset()
            .map_err(|err| anyhow!("failed to clear exemplar store: {err}"))?;
        info!("Reset training data: {deleted} drawing(s), {dropped} exemplar(s)");
        Ok(deleted)
    }

    fn resolve_strokes(&self, request: TeachRequest) -> Result<Vec<Stroke>, ValidationError> {
        let strokes: Vec<Stroke> = match (request.strokes, request.points) {
            (Some(strokes), _) if strokes.iter().any(|s| !s.is_empty()) => {
                strokes.into_iter().filter(|s| !s.is_empty()).collect()
            }
            (_, Some(points)) if !points.is_empty() => self.classifier.segment(&points),
            _ => return Err(ValidationError::EmptyPayload),
        };

        if let Some(index) = strokes
            .iter()
            .flatten()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.t.is_finite()))
        {
            return Err(ValidationError::NonFinitePoint { index });
        }

        Ok(strokes)
    }
}

/// Trimmed label, or why it cannot name an exemplar.
pub fn validate_label(raw: &str) -> Result<String, ValidationError> {
    let label = raw.trim();
    if label.is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    if label.chars().count() > MAX_LABEL_CHARS || label.chars().any(char::is_control) {
        return Err(ValidationError::InvalidLabel(label.to_string()));
    }
    Ok(label.to_string())
}
