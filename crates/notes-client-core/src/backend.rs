//! Remote AI backend collaborator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::{HttpClientError, JsonHttpClient};
use crate::operation::{AiOperation, OperationKind, OperationParams};
use crate::prompt::build_prompt;

pub const AI_HEALTH_PATH: &str = "/ai/health";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("ai backend is not configured with an access key")]
    NotConfigured,
    #[error("timeout")]
    Timeout,
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },
    #[error(transparent)]
    Http(HttpClientError),
}

impl From<HttpClientError> for BackendError {
    fn from(error: HttpClientError) -> Self {
        match error {
            HttpClientError::Timeout => Self::Timeout,
            HttpClientError::Decode { message } => Self::MalformedResponse { message },
            other => Self::Http(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiRequest {
    pub operation: OperationKind,
    pub text: String,
    pub prompt: String,
    #[serde(flatten)]
    pub params: OperationParams,
}

impl AiRequest {
    #[must_use]
    pub fn new(operation: &AiOperation, text: &str) -> Self {
        Self {
            operation: operation.kind(),
            text: text.to_string(),
            prompt: build_prompt(operation, text),
            params: operation.params(),
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        format!("/ai/{}", self.operation.as_str())
    }
}

#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Lightweight reachability check.
    async fn health(&self) -> Result<(), BackendError>;
    /// Runs one operation and returns the produced text.
    async fn execute(&self, request: &AiRequest) -> Result<String, BackendError>;
}

/// Pulls the `result` string out of an otherwise opaque response body. A bare
/// JSON string body is accepted as the result itself. The text is returned as
/// sent; only a blank result is rejected.
pub fn extract_result(body: &Value) -> Result<String, BackendError> {
    let result = match body {
        Value::String(text) => Some(text.as_str()),
        Value::Object(map) => map.get("result").and_then(Value::as_str),
        _ => None,
    };
    let Some(result) = result else {
        return Err(BackendError::MalformedResponse {
            message: "missing result".to_string(),
        });
    };
    if result.trim().is_empty() {
        return Err(BackendError::MalformedResponse {
            message: "empty result".to_string(),
        });
    }
    Ok(result.to_string())
}

#[derive(Debug, Clone)]
pub struct HttpAiBackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpAiBackend {
    http: JsonHttpClient,
    api_key: Option<String>,
}

impl HttpAiBackend {
    pub fn new(config: HttpAiBackendConfig) -> Result<Self, BackendError> {
        let http = JsonHttpClient::new(&config.base_url, config.timeout)?;
        let api_key = config
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Ok(Self { http, api_key })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.api_key.as_deref().ok_or(BackendError::NotConfigured)
    }
}

#[async_trait]
impl AiBackend for HttpAiBackend {
    async fn health(&self) -> Result<(), BackendError> {
        let api_key = self.api_key()?;
        self.http.get_ok(AI_HEALTH_PATH, Some(api_key)).await?;
        Ok(())
    }

    async fn execute(&self, request: &AiRequest) -> Result<String, BackendError> {
        let api_key = self.api_key()?;
        let body: Value = self
            .http
            .post_json(request.path().as_str(), request, Some(api_key))
            .await?;
        extract_result(&body)
    }
}
