use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{
    AuthInputError, DEFAULT_AUTH_TIMEOUT_MS, normalize_base_url, non_empty,
    resolve_api_base_url_with,
};
use crate::backend::HttpAiBackendConfig;
use crate::credential::default_session_path;
use crate::dispatch::{DEFAULT_DISPATCH_TIMEOUT_MS, DispatchConfig};
use crate::navigator::DEFAULT_PENDING_TIMEOUT_MS;
use crate::probe::DEFAULT_PROBE_TIMEOUT_MS;

pub const ENV_AI_BASE_URL: &str = "NOTES_AI_BASE_URL";
pub const ENV_AI_API_KEY: &str = "NOTES_AI_API_KEY";
pub const ENV_SESSION_FILE: &str = "NOTES_SESSION_FILE";
pub const ENV_PROBE_TIMEOUT_MS: &str = "NOTES_PROBE_TIMEOUT_MS";
pub const ENV_AUTH_TIMEOUT_MS: &str = "NOTES_AUTH_TIMEOUT_MS";
pub const ENV_DISPATCH_TIMEOUT_MS: &str = "NOTES_DISPATCH_TIMEOUT_MS";
pub const ENV_GATE_PENDING_TIMEOUT_MS: &str = "NOTES_GATE_PENDING_TIMEOUT_MS";
pub const ENV_AI_FALLBACK: &str = "NOTES_AI_FALLBACK";
pub const MIN_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{variable}: {source}")]
    InvalidBaseUrl {
        variable: &'static str,
        #[source]
        source: AuthInputError,
    },
    #[error("{variable}: expected a duration in milliseconds, got {value:?}")]
    InvalidTimeout {
        variable: &'static str,
        value: String,
    },
    #[error("{variable}: expected on or off, got {value:?}")]
    InvalidToggle {
        variable: &'static str,
        value: String,
    },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub api_base_url_source: String,
    pub ai_base_url: String,
    pub ai_api_key: Option<String>,
    pub session_file: PathBuf,
    pub auth_timeout: Duration,
    pub probe_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub pending_timeout: Duration,
    pub placeholders_enabled: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_base_url_source", &self.api_base_url_source)
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "<redacted>"))
            .field("session_file", &self.session_file)
            .field("auth_timeout", &self.auth_timeout)
            .field("probe_timeout", &self.probe_timeout)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("pending_timeout", &self.pending_timeout)
            .field("placeholders_enabled", &self.placeholders_enabled)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let (api_base_url, source) =
            resolve_api_base_url_with(&lookup).map_err(|source| ConfigError::InvalidBaseUrl {
                variable: crate::auth::ENV_API_BASE_URL,
                source,
            })?;

        let ai_base_url = match non_empty(lookup(ENV_AI_BASE_URL)) {
            Some(raw) => {
                normalize_base_url(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
                    variable: ENV_AI_BASE_URL,
                    source,
                })?
            }
            None => api_base_url.clone(),
        };

        let session_file = non_empty(lookup(ENV_SESSION_FILE))
            .map_or_else(default_session_path, PathBuf::from);

        Ok(Self {
            api_base_url,
            api_base_url_source: source.to_string(),
            ai_base_url,
            ai_api_key: non_empty(lookup(ENV_AI_API_KEY)),
            session_file,
            auth_timeout: timeout_var(&lookup, ENV_AUTH_TIMEOUT_MS, DEFAULT_AUTH_TIMEOUT_MS)?,
            probe_timeout: timeout_var(&lookup, ENV_PROBE_TIMEOUT_MS, DEFAULT_PROBE_TIMEOUT_MS)?,
            dispatch_timeout: timeout_var(
                &lookup,
                ENV_DISPATCH_TIMEOUT_MS,
                DEFAULT_DISPATCH_TIMEOUT_MS,
            )?,
            pending_timeout: timeout_var(
                &lookup,
                ENV_GATE_PENDING_TIMEOUT_MS,
                DEFAULT_PENDING_TIMEOUT_MS,
            )?,
            placeholders_enabled: toggle_var(&lookup, ENV_AI_FALLBACK, true)?,
        })
    }

    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            remote_timeout: self.dispatch_timeout,
            probe_timeout: self.probe_timeout,
            placeholders_enabled: self.placeholders_enabled,
        }
    }

    #[must_use]
    pub fn ai_backend_config(&self) -> HttpAiBackendConfig {
        HttpAiBackendConfig {
            base_url: self.ai_base_url.clone(),
            api_key: self.ai_api_key.clone(),
            timeout: self.dispatch_timeout,
        }
    }
}

fn timeout_var(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = non_empty(lookup(variable)) else {
        return Ok(Duration::from_millis(default_ms));
    };
    let millis = raw
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout {
            variable,
            value: raw,
        })?;
    Ok(Duration::from_millis(millis.max(MIN_TIMEOUT_MS)))
}

fn toggle_var(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = non_empty(lookup(variable)) else {
        return Ok(default);
    };
    parse_toggle(&raw).ok_or(ConfigError::InvalidToggle {
        variable,
        value: raw,
    })
}

#[must_use]
pub fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" | "enabled" => Some(true),
        "off" | "false" | "0" | "no" | "disabled" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::auth::{DEFAULT_API_BASE_URL, ENV_API_BASE_URL};

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_service() {
        let config = config_from(&[]).expect("default config");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api_base_url_source, "default_local");
        assert_eq!(config.ai_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.ai_api_key, None);
        assert_eq!(config.auth_timeout, Duration::from_millis(10_000));
        assert_eq!(config.probe_timeout, Duration::from_millis(3_000));
        assert_eq!(config.dispatch_timeout, Duration::from_millis(30_000));
        assert_eq!(config.pending_timeout, Duration::from_millis(5_000));
        assert!(config.placeholders_enabled);
        assert!(config.session_file.ends_with("session.v1.json"));
    }

    #[test]
    fn ai_base_url_overrides_api_base_url() {
        let config = config_from(&[
            (ENV_API_BASE_URL, "https://api.notes.example.com/"),
            (ENV_AI_BASE_URL, "https://ai.notes.example.com"),
            (ENV_AI_API_KEY, " key-123 "),
            (ENV_SESSION_FILE, "/tmp/notes/session.json"),
        ])
        .expect("config");
        assert_eq!(config.api_base_url, "https://api.notes.example.com");
        assert_eq!(config.api_base_url_source, ENV_API_BASE_URL);
        assert_eq!(config.ai_base_url, "https://ai.notes.example.com");
        assert_eq!(config.ai_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.session_file, PathBuf::from("/tmp/notes/session.json"));
    }

    #[test]
    fn timeouts_are_clamped_and_validated() {
        let config = config_from(&[(ENV_PROBE_TIMEOUT_MS, "10"), (ENV_AUTH_TIMEOUT_MS, "1500")])
            .expect("config");
        assert_eq!(config.probe_timeout, Duration::from_millis(MIN_TIMEOUT_MS));
        assert_eq!(config.auth_timeout, Duration::from_millis(1_500));
        assert_eq!(config.dispatch_timeout, Duration::from_millis(30_000));

        let error = config_from(&[(ENV_DISPATCH_TIMEOUT_MS, "soon")]).expect_err("bad timeout");
        assert_eq!(
            error,
            ConfigError::InvalidTimeout {
                variable: ENV_DISPATCH_TIMEOUT_MS,
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn fallback_toggle_accepts_on_off() {
        let config = config_from(&[(ENV_AI_FALLBACK, "OFF")]).expect("config");
        assert!(!config.placeholders_enabled);
        assert!(!config.dispatch_config().placeholders_enabled);

        let error = config_from(&[(ENV_AI_FALLBACK, "maybe")]).expect_err("bad toggle");
        assert!(error.to_string().starts_with(ENV_AI_FALLBACK));
    }

    #[test]
    fn invalid_base_url_names_variable() {
        let error = config_from(&[(ENV_AI_BASE_URL, "ai.local")]).expect_err("bad url");
        assert_eq!(
            error,
            ConfigError::InvalidBaseUrl {
                variable: ENV_AI_BASE_URL,
                source: AuthInputError::InvalidBaseUrl,
            }
        );
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = config_from(&[(ENV_AI_API_KEY, "very-secret")]).expect("config");
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
