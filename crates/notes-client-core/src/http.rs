//! Shared JSON-over-HTTP plumbing for the remote collaborators.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

const MIN_HTTP_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("http_base_url_missing")]
    BaseUrlMissing,
    #[error("http_invalid_path")]
    InvalidPath,
    #[error("timeout")]
    Timeout,
    #[error("http_request_failed:{message}")]
    Request { message: String },
    #[error("http_read_failed:{message}")]
    Read { message: String },
    #[error("http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("http_json_decode_failed:{message}")]
    Decode { message: String },
}

impl HttpClientError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    /// A 4xx answer other than 408 and 429, which are worth retrying.
    #[must_use]
    pub fn is_client_rejection(&self) -> bool {
        self.status().is_some_and(|status| {
            status.is_client_error()
                && status != StatusCode::REQUEST_TIMEOUT
                && status != StatusCode::TOO_MANY_REQUESTS
        })
    }

    /// `message` (or `error`) from a JSON error body.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        let Self::Http { body, .. } = self else {
            return None;
        };
        let parsed: Value = serde_json::from_str(body).ok()?;
        ["message", "error"]
            .into_iter()
            .filter_map(|key| parsed.get(key).and_then(Value::as_str))
            .map(str::trim)
            .find(|message| !message.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct JsonHttpClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl JsonHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HttpClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(HttpClientError::BaseUrlMissing);
        }
        Ok(Self {
            base_url: base_url.to_string(),
            timeout: timeout.max(Duration::from_millis(MIN_HTTP_TIMEOUT_MS)),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// GET that only checks for a 2xx status.
    pub async fn get_ok(&self, path: &str, bearer: Option<&str>) -> Result<(), HttpClientError> {
        let url = self.endpoint(path).ok_or(HttpClientError::InvalidPath)?;
        let request = self.authorized(self.http.get(url.as_str()), bearer);
        let response = request.send().await.map_err(request_error)?;
        ensure_success(response).await
    }

    pub async fn post_json<Req, Res>(
        &self,
        path: &str,
        payload: &Req,
        bearer: Option<&str>,
    ) -> Result<Res, HttpClientError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path).ok_or(HttpClientError::InvalidPath)?;
        let request = self.authorized(self.http.post(url.as_str()).json(payload), bearer);
        let response = request.send().await.map_err(request_error)?;
        decode_json_response(response).await
    }

    /// POST that ignores the response body beyond its status.
    pub async fn post_ok<Req>(
        &self,
        path: &str,
        payload: &Req,
        bearer: Option<&str>,
    ) -> Result<(), HttpClientError>
    where
        Req: Serialize + ?Sized,
    {
        let url = self.endpoint(path).ok_or(HttpClientError::InvalidPath)?;
        let request = self.authorized(self.http.post(url.as_str()).json(payload), bearer);
        let response = request.send().await.map_err(request_error)?;
        ensure_success(response).await
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let request = request
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn request_error(error: reqwest::Error) -> HttpClientError {
    if error.is_timeout() {
        return HttpClientError::Timeout;
    }
    HttpClientError::Request {
        message: error.to_string(),
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> HttpClientError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    HttpClientError::Http { status, body }
}

async fn read_body(response: reqwest::Response) -> Result<(StatusCode, Vec<u8>), HttpClientError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| {
        if error.is_timeout() {
            HttpClientError::Timeout
        } else {
            HttpClientError::Read {
                message: error.to_string(),
            }
        }
    })?;
    Ok((status, bytes.to_vec()))
}

async fn ensure_success(response: reqwest::Response) -> Result<(), HttpClientError> {
    let (status, bytes) = read_body(response).await?;
    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }
    Ok(())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, HttpClientError>
where
    T: DeserializeOwned,
{
    let (status, bytes) = read_body(response).await?;
    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }
    serde_json::from_slice::<T>(&bytes).map_err(|error| HttpClientError::Decode {
        message: error.to_string(),
    })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = JsonHttpClient::new("https://notes.example.com/", Duration::from_secs(1))
            .expect("http client");

        assert_eq!(
            client.endpoint("/ai/summarize"),
            Some("https://notes.example.com/ai/summarize".to_string())
        );
        assert_eq!(
            client.endpoint("ai/summarize"),
            Some("https://notes.example.com/ai/summarize".to_string())
        );
        assert_eq!(client.endpoint("   "), None);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let error = JsonHttpClient::new("  ", Duration::from_secs(1)).expect_err("missing url");
        assert!(matches!(error, HttpClientError::BaseUrlMissing));
    }

    #[test]
    fn http_error_formats_status_and_body() {
        let error = format_http_error(StatusCode::BAD_GATEWAY, b"  upstream down ");
        assert_eq!(error.to_string(), "http_502 Bad Gateway:upstream down");
        assert_eq!(
            format_http_error(StatusCode::UNAUTHORIZED, b"").to_string(),
            "http_401 Unauthorized:<empty>"
        );
        assert!(format_http_error(StatusCode::FORBIDDEN, b"").is_unauthorized());
    }

    #[test]
    fn client_rejections_exclude_retryable_statuses() {
        assert!(format_http_error(StatusCode::NOT_FOUND, b"").is_client_rejection());
        assert!(format_http_error(StatusCode::BAD_REQUEST, b"").is_client_rejection());
        assert!(format_http_error(StatusCode::UNAUTHORIZED, b"").is_client_rejection());
        assert!(!format_http_error(StatusCode::REQUEST_TIMEOUT, b"").is_client_rejection());
        assert!(!format_http_error(StatusCode::TOO_MANY_REQUESTS, b"").is_client_rejection());
        assert!(!format_http_error(StatusCode::BAD_GATEWAY, b"").is_client_rejection());
        assert!(!HttpClientError::Timeout.is_client_rejection());
    }

    #[test]
    fn server_message_reads_json_error_bodies() {
        let error = format_http_error(
            StatusCode::NOT_FOUND,
            br#"{"success":false,"message":" User does not exist "}"#,
        );
        assert_eq!(error.server_message().as_deref(), Some("User does not exist"));
        assert_eq!(
            format_http_error(StatusCode::CONFLICT, br#"{"error":"taken"}"#)
                .server_message()
                .as_deref(),
            Some("taken")
        );
        assert_eq!(
            format_http_error(StatusCode::BAD_REQUEST, b"plain text").server_message(),
            None
        );
    }
}
