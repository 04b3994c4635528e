use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::classifier::symbols::{self, SymbolCategory};
use crate::db::Drawing;
use crate::error::ApiError;
use crate::learning::TeachRequest;
use crate::settings::Settings;
use crate::AppState;

const DEFAULT_DRAWING_LIMIT: u32 = 100;
const MAX_DRAWING_LIMIT: u32 = 1000;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn teach(
    State(state): State<AppState>,
    payload: Result<Json<TeachRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = json_body(payload)?;
    let outcome = state.teacher.teach(request).await?;

    Ok(Json(json!({
        "status": "saved",
        "id": outcome.id,
        "label": outcome.label,
        "strokes": outcome.stroke_count,
        "model_updated": true,
    })))
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.current())
}

pub async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<Settings>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let settings = json_body(payload)?;
    settings.validate()?;
    let saved = state.settings.update(settings).await?;

    Ok(Json(json!({ "status": "updated", "settings": saved })))
}

#[derive(Serialize)]
pub struct StatusResponse {
    model_loaded: bool,
    exemplar_count: usize,
    label_count: usize,
    neighbors: usize,
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let stats = state.classifier.stats()?;
    Ok(Json(StatusResponse {
        model_loaded: stats.exemplar_count > 0,
        exemplar_count: stats.exemplar_count,
        label_count: stats.label_count,
        neighbors: state.classifier.config().neighbors,
    }))
}

#[derive(Debug, Serialize)]
pub struct LabelEntry {
    label: String,
    count: i64,
    description: String,
    latex: String,
}

/// Catalog symbols in catalog order, then labels only seen in stored drawings.
pub async fn labels(State(state): State<AppState>) -> Result<Json<Vec<LabelEntry>>, ApiError> {
    let mut counts: HashMap<String, i64> = state
        .db
        .label_counts()
        .await?
        .into_iter()
        .map(|row| (row.label, row.count))
        .collect();

    let mut entries: Vec<LabelEntry> = symbols::ordered_symbols()
        .into_iter()
        .map(|info| LabelEntry {
            label: info.symbol.to_string(),
            count: counts.remove(info.symbol).unwrap_or(0),
            description: info.description.to_string(),
            latex: info.latex.to_string(),
        })
        .collect();

    let mut extras: Vec<(String, i64)> = counts.into_iter().collect();
    extras.sort();
    entries.extend(extras.into_iter().map(|(label, count)| LabelEntry {
        latex: label.clone(),
        label,
        count,
        description: String::new(),
    }));

    Ok(Json(entries))
}

pub async fn categorized_symbols() -> Json<&'static [SymbolCategory]> {
    Json(symbols::CATEGORIES)
}

#[derive(Debug, Deserialize)]
pub struct DrawingQuery {
    label: Option<String>,
    limit: Option<u32>,
}

pub async fn list_drawings(
    State(state): State<AppState>,
    Query(query): Query<DrawingQuery>,
) -> Result<Json<Vec<Drawing>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_DRAWING_LIMIT)
        .clamp(1, MAX_DRAWING_LIMIT);
    let label = query.label.filter(|label| !label.trim().is_empty());

    Ok(Json(state.db.list_drawings(label, limit).await?))
}

pub async fn get_drawing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Drawing>, ApiError> {
    state
        .db
        .get_drawing(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("drawing {id} not found")))
}

pub async fn delete_drawing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.teacher.forget(&id).await? {
        return Err(ApiError::NotFound(format!("drawing {id} not found")));
    }
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

pub async fn reset_data(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let deleted = state.teacher.reset().await?;
    Ok(Json(json!({ "status": "reset", "deleted": deleted })))
}
