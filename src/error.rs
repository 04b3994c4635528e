//! Error taxonomy shared by the server and the client.
//!
//! Plumbing code (database worker, startup) keeps using `anyhow`; these
//! types are what crosses module boundaries and, ultimately, the wire.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Rejected input on teach or settings updates. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("label must not be empty")]
    EmptyLabel,

    #[error("label '{0}' is invalid")]
    InvalidLabel(String),

    #[error("no points provided")]
    EmptyPayload,

    #[error("point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Malformed or out-of-order messages on the realtime channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("a classification is already in flight")]
    ClassificationInFlight,
}

/// Channel-level failures seen by the client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("no exemplars available yet")]
    NoExemplars,

    #[error("no points to classify")]
    EmptyInput,

    #[error("exemplar store unavailable")]
    StoreUnavailable,
}

/// HTTP-facing error. Internal failures are logged and reduced to a
/// generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what.clone()),
            ApiError::Internal(err) => {
                error!("request failed: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Failure of a teach operation.
#[derive(Error, Debug)]
pub enum TeachError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to store exemplar: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<TeachError> for ApiError {
    fn from(err: TeachError) -> Self {
        match err {
            TeachError::Validation(err) => ApiError::Validation(err),
            TeachError::Storage(err) => ApiError::Internal(err),
        }
    }
}

impl From<ClassificationError> for ApiError {
    fn from(err: ClassificationError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}
