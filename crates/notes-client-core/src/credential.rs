//! Session credential ownership.
//!
//! `CredentialStore` is the only writer of the session token. Every clone of
//! the store shares one state, so no reader can hold a divergent copy of
//! "is logged in". Durable persistence goes through [`SessionStateStore`],
//! which keeps a single canonical storage key for the token.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

pub const SESSION_SCHEMA_VERSION: u32 = 1;
pub const SESSION_FILE_NAME: &str = "session.v1.json";
const SESSION_DIR_NAME: &str = "notes-client";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("credential must not be empty")]
    InvalidCredential,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session_store_read_failed:{message}")]
    Read { message: String },
    #[error("session_store_write_failed:{message}")]
    Write { message: String },
    #[error("session_store_encode_failed:{message}")]
    Encode { message: String },
}

/// Opaque bearer token. Never parsed; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Result<Self, CredentialError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CredentialError::InvalidCredential);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPresence {
    /// An existence check is outstanding.
    Unknown,
    Present,
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSnapshot {
    credential: Option<Credential>,
    checking: bool,
}

impl CredentialSnapshot {
    #[must_use]
    pub fn presence(&self) -> CredentialPresence {
        if self.checking {
            return CredentialPresence::Unknown;
        }
        if self.credential.is_some() {
            CredentialPresence::Present
        } else {
            CredentialPresence::Absent
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.credential.is_some()
    }

    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.credential.as_ref().map(Credential::as_str)
    }
}

pub trait SessionStateStore: Send + Sync {
    fn load_session_token(&self) -> Result<Option<String>, SessionStoreError>;
    fn persist_session_token(&self, token: &str) -> Result<(), SessionStoreError>;
    fn clear_session_token(&self) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    #[must_use]
    pub fn stored_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SessionStateStore for MemorySessionStore {
    fn load_session_token(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(self.stored_token())
    }

    fn persist_session_token(&self, token: &str) -> Result<(), SessionStoreError> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear_session_token(&self) -> Result<(), SessionStoreError> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedSessionDocument {
    version: u32,
    token: String,
    saved_at: String,
}

/// Versioned JSON session file. A missing, unreadable, or foreign-version
/// document loads as "no session".
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStateStore for FileSessionStore {
    fn load_session_token(&self) -> Result<Option<String>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(SessionStoreError::Read {
                    message: error.to_string(),
                });
            }
        };
        match serde_json::from_str::<PersistedSessionDocument>(raw.as_str()) {
            Ok(document) if document.version == SESSION_SCHEMA_VERSION => Ok(Some(document.token)),
            Ok(document) => {
                warn!(
                    path = %self.path.display(),
                    version = document.version,
                    "Ignoring session file with unsupported version"
                );
                Ok(None)
            }
            Err(error) => {
                warn!(error = %error, path = %self.path.display(), "Ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn persist_session_token(&self, token: &str) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| SessionStoreError::Write {
                message: error.to_string(),
            })?;
        }
        let encoded = serde_json::to_string_pretty(&PersistedSessionDocument {
            version: SESSION_SCHEMA_VERSION,
            token: token.to_string(),
            saved_at: Utc::now().to_rfc3339(),
        })
        .map_err(|error| SessionStoreError::Encode {
            message: error.to_string(),
        })?;
        fs::write(&self.path, encoded).map_err(|error| SessionStoreError::Write {
            message: error.to_string(),
        })
    }

    fn clear_session_token(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(SessionStoreError::Write {
                message: error.to_string(),
            }),
        }
    }
}

#[must_use]
pub fn default_session_path() -> PathBuf {
    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push(SESSION_DIR_NAME);
        data_dir.push(SESSION_FILE_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(format!(".{SESSION_DIR_NAME}"));
        home_dir.push(SESSION_FILE_NAME);
        return home_dir;
    }

    PathBuf::from(SESSION_FILE_NAME)
}

struct CredentialStoreInner {
    state: watch::Sender<CredentialSnapshot>,
    persistence: Option<Arc<dyn SessionStateStore>>,
}

/// Shared handle over the single session credential.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<CredentialStoreInner>,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("presence", &self.current().presence())
            .field("persistent", &self.inner.persistence.is_some())
            .finish()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CredentialStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(CredentialSnapshot::default(), None)
    }

    /// Opens the store, restoring any session persisted by a previous run.
    pub fn open(persistence: Arc<dyn SessionStateStore>) -> Self {
        let credential = match persistence.load_session_token() {
            Ok(Some(token)) => Credential::new(token).ok(),
            Ok(None) => None,
            Err(error) => {
                warn!(error = %error, "Failed to restore persisted session");
                None
            }
        };
        debug!(restored = credential.is_some(), "Credential store opened");
        Self::build(
            CredentialSnapshot {
                credential,
                checking: false,
            },
            Some(persistence),
        )
    }

    fn build(
        initial: CredentialSnapshot,
        persistence: Option<Arc<dyn SessionStateStore>>,
    ) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(CredentialStoreInner { state, persistence }),
        }
    }

    pub fn set(&self, token: impl Into<String>) -> Result<(), CredentialError> {
        let credential = Credential::new(token)?;
        if let Some(persistence) = &self.inner.persistence
            && let Err(error) = persistence.persist_session_token(credential.as_str())
        {
            warn!(error = %error, "Failed to persist session credential");
        }
        self.inner.state.send_replace(CredentialSnapshot {
            credential: Some(credential),
            checking: false,
        });
        Ok(())
    }

    pub fn clear(&self) {
        self.clear_persisted();
        self.inner.state.send_replace(CredentialSnapshot::default());
    }

    #[must_use]
    pub fn current(&self) -> CredentialSnapshot {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CredentialSnapshot> {
        self.inner.state.subscribe()
    }

    /// Marks the held credential as under an existence check. Returns the
    /// credential to check, or `None` when there is nothing to verify.
    pub fn begin_check(&self) -> Option<Credential> {
        let mut checked = None;
        self.inner.state.send_if_modified(|snapshot| {
            checked.clone_from(&snapshot.credential);
            if snapshot.credential.is_some() && !snapshot.checking {
                snapshot.checking = true;
                return true;
            }
            false
        });
        checked
    }

    /// Completes an existence check started with [`Self::begin_check`]. A
    /// credential replaced while the check was outstanding is left alone.
    pub fn finish_check(&self, checked: &Credential, valid: bool) {
        let mut cleared = false;
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.credential.as_ref() != Some(checked) {
                return false;
            }
            snapshot.checking = false;
            if !valid {
                snapshot.credential = None;
                cleared = true;
            }
            true
        });
        if cleared {
            debug!("Session credential rejected by remote check");
            self.clear_persisted();
        }
    }

    fn clear_persisted(&self) {
        if let Some(persistence) = &self.inner.persistence
            && let Err(error) = persistence.clear_session_token()
        {
            warn!(error = %error, "Failed to clear persisted session credential");
        }
    }
}
