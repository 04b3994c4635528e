//! JSON messages exchanged over the recording websocket.
//!
//! Client messages are tagged by `action`, server messages by `status`:
//! `{"action":"set_cursor","x":640,"y":400}` / `{"status":"cursor_reset"}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{Candidate, ClassificationResult, Point, ResultStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Toggle,
    SetCursor { x: f64, y: f64 },
    Classify { points: Vec<Point> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerMessage {
    CursorReset,
    Recording {
        message: String,
    },
    Classifying,
    Finished {
        symbol: Option<String>,
        confidence: Option<f64>,
        #[serde(default)]
        candidates: Vec<Candidate>,
    },
    Error {
        message: String,
    },
    Idle {
        message: String,
    },
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::Malformed(err.to_string()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// The classification outcome carried by this message, if it is terminal.
    pub fn into_result(self) -> Option<ClassificationResult> {
        match self {
            ServerMessage::Finished {
                symbol,
                confidence,
                candidates,
            } => Some(ClassificationResult {
                status: ResultStatus::Finished,
                symbol,
                confidence,
                candidates,
                message: None,
            }),
            ServerMessage::Error { message } => Some(ClassificationResult::error(message)),
            _ => None,
        }
    }
}

impl From<ClassificationResult> for ServerMessage {
    fn from(result: ClassificationResult) -> Self {
        match result.status {
            ResultStatus::Finished => ServerMessage::Finished {
                symbol: result.symbol,
                confidence: result.confidence,
                candidates: result.candidates,
            },
            ResultStatus::Error => ServerMessage::Error {
                message: result
                    .message
                    .unwrap_or_else(|| "Classification failed".to_string()),
            },
            ResultStatus::Idle => ServerMessage::Idle {
                message: result.message.unwrap_or_default(),
            },
        }
    }
}
