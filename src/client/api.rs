//! HTTP calls the recording client makes outside the websocket.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::models::{Point, Stroke};
use crate::settings::Settings;

/// Where the session driver reads settings from at each session start.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn fetch_settings(&self) -> Result<Settings, TransportError>;
}

/// Fixed settings, for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub Settings);

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn fetch_settings(&self) -> Result<Settings, TransportError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeachReceipt {
    pub status: String,
    pub id: String,
    #[serde(default)]
    pub model_updated: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(request_error)?;
        Ok(Self { http, config })
    }

    pub async fn teach_points(
        &self,
        label: &str,
        points: &[Point],
    ) -> Result<TeachReceipt, TransportError> {
        self.post_teach(json!({ "label": label, "points": points })).await
    }

    pub async fn teach_strokes(
        &self,
        label: &str,
        strokes: &[Stroke],
    ) -> Result<TeachReceipt, TransportError> {
        self.post_teach(json!({ "label": label, "strokes": strokes })).await
    }

    async fn post_teach(&self, body: serde_json::Value) -> Result<TeachReceipt, TransportError> {
        let response = self
            .http
            .post(self.config.api_url("/api/teach"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }
}

#[async_trait]
impl SettingsSource for ApiClient {
    async fn fetch_settings(&self) -> Result<Settings, TransportError> {
        let response = self
            .http
            .get(self.config.api_url("/api/settings"))
            .send()
            .await
            .map_err(request_error)?;
        decode(response).await
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    TransportError::Request(err.to_string())
}

/// Body as `T` on success; otherwise the server's `detail` message.
async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(request_error);
    }

    let detail = match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => format!("server returned {status}"),
    };
    Err(TransportError::Request(detail))
}
