use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{HttpClientError, JsonHttpClient};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const ENV_API_BASE_URL: &str = "NOTES_API_BASE_URL";
pub const API_BASE_SOURCE_DEFAULT_LOCAL: &str = "default_local";

pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 10_000;

pub const REGISTER_PATH: &str = "/api/v1/users/register";
pub const LOGIN_PATH: &str = "/api/v1/users/login";
pub const LOGOUT_PATH: &str = "/api/v1/users/logout";
pub const SESSION_STATUS_PATH: &str = "/api/v1/users/me";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthInputError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("name must not be empty")]
    EmptyName,
    #[error("passwords don't match")]
    PasswordMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Input(#[from] AuthInputError),
    /// The service refused the credentials; `message` is its own wording.
    #[error("{}", .message.as_deref().unwrap_or("invalid email or password"))]
    InvalidCredentials { message: Option<String> },
    #[error("registration rejected: {message}")]
    RegistrationRejected { message: String },
    #[error("login response did not include an access token")]
    MissingToken,
    #[error("network error: {message}")]
    NetworkError { message: String },
}

impl AuthError {
    fn network(error: &HttpClientError) -> Self {
        Self::NetworkError {
            message: error.to_string(),
        }
    }

    /// Login failure classification: refusals are credential errors, while
    /// transport failures, timeouts and 5xx stay network errors.
    fn from_login(error: &HttpClientError) -> Self {
        if error.is_client_rejection() {
            Self::InvalidCredentials {
                message: error.server_message(),
            }
        } else {
            Self::network(error)
        }
    }

    fn from_register(error: &HttpClientError) -> Self {
        if error.is_client_rejection() {
            Self::RegistrationRejected {
                message: error
                    .server_message()
                    .unwrap_or_else(|| error.to_string()),
            }
        } else {
            Self::network(error)
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Invalid,
}

#[async_trait]
pub trait AuthApiTransport: Send + Sync {
    /// Creates an account. No session is issued.
    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError>;
    /// Exchanges credentials for a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError>;
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;
    /// Asks the service whether the token still names a live session.
    async fn session_status(&self, access_token: &str) -> Result<SessionStatus, AuthError>;
}

pub(crate) fn resolve_api_base_url_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(String, &'static str), AuthInputError> {
    if let Some(base_url) = non_empty(lookup(ENV_API_BASE_URL)) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_API_BASE_URL));
    }
    normalize_base_url(DEFAULT_API_BASE_URL)
        .map(|normalized| (normalized, API_BASE_SOURCE_DEFAULT_LOCAL))
}

pub fn normalize_base_url(raw: &str) -> Result<String, AuthInputError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthInputError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthInputError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(AuthInputError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(AuthInputError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn normalize_email(raw: &str) -> Result<String, AuthInputError> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(AuthInputError::EmptyEmail);
    }
    Ok(normalized)
}

pub fn login_request(email: &str, password: &str) -> Result<LoginRequest, AuthInputError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(AuthInputError::EmptyPassword);
    }
    Ok(LoginRequest {
        email,
        password: password.to_string(),
    })
}

/// Every field is required and the password must be typed twice alike.
pub fn register_request(
    name: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<RegisterRequest, AuthInputError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthInputError::EmptyName);
    }
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(AuthInputError::EmptyPassword);
    }
    if password != confirmation {
        return Err(AuthInputError::PasswordMismatch);
    }
    Ok(RegisterRequest {
        name: name.to_string(),
        email,
        password: password.to_string(),
    })
}

/// Token lookup order: `accessToken`, `data.accessToken`, `token`.
#[must_use]
pub fn extract_access_token(body: &Value) -> Option<String> {
    let candidates = [
        body.get("accessToken"),
        body.get("data").and_then(|data| data.get("accessToken")),
        body.get("token"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct HttpAuthTransport {
    http: JsonHttpClient,
}

impl HttpAuthTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let base_url = normalize_base_url(base_url)?;
        let http =
            JsonHttpClient::new(&base_url, timeout).map_err(|error| AuthError::network(&error))?;
        Ok(Self { http })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

#[async_trait]
impl AuthApiTransport for HttpAuthTransport {
    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
        self.http
            .post_ok(REGISTER_PATH, request, None)
            .await
            .map_err(|error| AuthError::from_register(&error))
    }

    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        let body: Value = self
            .http
            .post_json(LOGIN_PATH, request, None)
            .await
            .map_err(|error| AuthError::from_login(&error))?;
        extract_access_token(&body).ok_or(AuthError::MissingToken)
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        match self
            .http
            .post_ok(LOGOUT_PATH, &serde_json::json!({}), Some(access_token))
            .await
        {
            Ok(()) => Ok(()),
            Err(error) if error.is_unauthorized() => {
                Err(AuthError::InvalidCredentials { message: None })
            }
            Err(error) => Err(AuthError::network(&error)),
        }
    }

    async fn session_status(&self, access_token: &str) -> Result<SessionStatus, AuthError> {
        match self.http.get_ok(SESSION_STATUS_PATH, Some(access_token)).await {
            Ok(()) => Ok(SessionStatus::Active),
            Err(error) if error.is_unauthorized() => Ok(SessionStatus::Invalid),
            Err(error) => Err(AuthError::network(&error)),
        }
    }
}
