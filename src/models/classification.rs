use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Finished,
    Error,
    Idle,
}

/// Outcome of one classification round trip as seen by the client.
///
/// `candidates` is always sorted by non-increasing confidence and the top
/// candidate is mirrored in `symbol`/`confidence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClassificationResult {
    pub fn finished(candidates: Vec<Candidate>) -> Self {
        let top = candidates.first().cloned();
        Self {
            status: ResultStatus::Finished,
            symbol: top.as_ref().map(|c| c.symbol.clone()),
            confidence: top.map(|c| c.confidence),
            candidates,
            message: None,
        }
    }

    /// Fixed result used when the user clicks instead of drawing.
    pub fn synthetic(symbol: &str) -> Self {
        Self::finished(vec![Candidate {
            symbol: symbol.to_string(),
            confidence: 1.0,
        }])
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            symbol: None,
            confidence: None,
            candidates: Vec::new(),
            message: Some(message.into()),
        }
    }
}
