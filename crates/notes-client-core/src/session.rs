//! Signup, login, logout and the session existence check, all writing through the
//! shared [`CredentialStore`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::{AuthApiTransport, AuthError, SessionStatus, login_request, register_request};
use crate::credential::{CredentialPresence, CredentialStore};

pub struct SessionClient {
    credentials: CredentialStore,
    transport: Arc<dyn AuthApiTransport>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    #[must_use]
    pub fn new(credentials: CredentialStore, transport: Arc<dyn AuthApiTransport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Creates an account. The credential store is left untouched; the
    /// caller moves on to login.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        let request = register_request(name, email, password, confirmation)?;
        self.transport.register(&request).await?;
        info!(email = %request.email, "Registered");
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let request = login_request(email, password)?;
        let token = self.transport.login(&request).await?;
        self.credentials
            .set(token)
            .map_err(|_| AuthError::MissingToken)?;
        info!(email = %request.email, "Logged in");
        Ok(())
    }

    /// Local state is cleared before the remote call, so the session is gone
    /// even when the service cannot be reached.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let token = self.credentials.current().token().map(str::to_string);
        self.credentials.clear();
        let Some(token) = token else {
            debug!("Logout without a session");
            return Ok(());
        };

        match self.transport.logout(&token).await {
            Ok(()) | Err(AuthError::InvalidCredentials { .. }) => {
                info!("Logged out");
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "Remote logout failed; local session cleared");
                Err(error)
            }
        }
    }

    /// Runs the remote existence check for the held credential. A transport
    /// failure leaves the credential in place.
    pub async fn verify(&self) -> Result<CredentialPresence, AuthError> {
        let Some(credential) = self.credentials.begin_check() else {
            return Ok(CredentialPresence::Absent);
        };

        match self.transport.session_status(credential.as_str()).await {
            Ok(SessionStatus::Active) => {
                self.credentials.finish_check(&credential, true);
                Ok(CredentialPresence::Present)
            }
            Ok(SessionStatus::Invalid) => {
                self.credentials.finish_check(&credential, false);
                info!("Session no longer valid; credential cleared");
                Ok(CredentialPresence::Absent)
            }
            Err(error) => {
                self.credentials.finish_check(&credential, true);
                warn!(error = %error, "Session check failed; keeping credential");
                Err(error)
            }
        }
    }
}
