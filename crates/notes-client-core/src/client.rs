//! Wiring for a complete client: one credential store shared by the session
//! client and the navigator, and one dispatcher owning the availability state.

use std::sync::Arc;

use tracing::debug;

use crate::auth::{AuthApiTransport, AuthError, HttpAuthTransport};
use crate::backend::{AiBackend, BackendError, HttpAiBackend};
use crate::config::ClientConfig;
use crate::credential::{CredentialStore, FileSessionStore};
use crate::dispatch::CommandDispatcher;
use crate::gate::{AuthGate, RouteTable};
use crate::navigator::Navigator;
use crate::session::SessionClient;

#[derive(Debug, thiserror::Error)]
pub enum NotesClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug)]
pub struct NotesClient {
    config: ClientConfig,
    session: SessionClient,
    navigator: Navigator,
    dispatcher: CommandDispatcher,
}

impl NotesClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self, NotesClientError> {
        let credentials =
            CredentialStore::open(Arc::new(FileSessionStore::new(config.session_file.clone())));
        let transport = HttpAuthTransport::new(&config.api_base_url, config.auth_timeout)?;
        let backend = HttpAiBackend::new(config.ai_backend_config())?;
        debug!(
            api_base_url = %config.api_base_url,
            ai_base_url = %config.ai_base_url,
            ai_configured = backend.is_configured(),
            "Notes client configured"
        );
        Ok(Self::with_parts(
            config.clone(),
            credentials,
            Arc::new(transport),
            Arc::new(backend),
        ))
    }

    /// Builds a client over caller-supplied collaborators.
    #[must_use]
    pub fn with_parts(
        config: ClientConfig,
        credentials: CredentialStore,
        transport: Arc<dyn AuthApiTransport>,
        backend: Arc<dyn AiBackend>,
    ) -> Self {
        let navigator = Navigator::new(
            AuthGate::default(),
            RouteTable::notes_default(),
            credentials.clone(),
        )
        .with_pending_timeout(config.pending_timeout);
        let dispatcher = CommandDispatcher::new(backend, config.dispatch_config());
        Self {
            session: SessionClient::new(credentials, transport),
            navigator,
            dispatcher,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.session.credentials()
    }

    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }
}
