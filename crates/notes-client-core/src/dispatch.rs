//! AI command dispatch.
//!
//! Routing rules:
//! - input below the operation's threshold fails with `InputTooShort` before
//!   anything else is consulted;
//! - `Available` routes to the remote backend, and a remote failure is
//!   reported as `RemoteError` (never replaced by a placeholder);
//! - `Unknown`, `Probing` and `Unavailable` route to the local placeholder
//!   generator, or to `ServiceUnavailable` when placeholders are disabled.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{AiBackend, AiRequest};
use crate::draft::{ApplyOutcome, DraftSlot};
use crate::fallback::PlaceholderGenerator;
use crate::operation::{AiOperation, OperationKind, OperationParams, input_chars};
use crate::probe::{Availability, AvailabilityProbe, AvailabilityState, DEFAULT_PROBE_TIMEOUT_MS};

pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Remote,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutput {
    pub operation: AiOperation,
    pub text: String,
    pub source: ResultSource,
}

impl DispatchOutput {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.source == ResultSource::Placeholder
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("please write at least {required} characters first")]
    InputTooShort { required: usize, actual: usize },
    #[error("ai service unavailable")]
    ServiceUnavailable,
    #[error("ai request failed: {detail}")]
    RemoteError { detail: String },
}

pub type DispatchResult = Result<DispatchOutput, DispatchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftUpdate {
    pub output: DispatchOutput,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub remote_timeout: Duration,
    pub probe_timeout: Duration,
    pub placeholders_enabled: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            remote_timeout: Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            placeholders_enabled: true,
        }
    }
}

/// Owns the availability state; views only see dispatch results.
pub struct CommandDispatcher {
    backend: Arc<dyn AiBackend>,
    probe: AvailabilityProbe,
    placeholder: PlaceholderGenerator,
    config: DispatchConfig,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("probe", &self.probe)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(backend: Arc<dyn AiBackend>, config: DispatchConfig) -> Self {
        let probe = AvailabilityProbe::new(Arc::clone(&backend), config.probe_timeout);
        Self {
            backend,
            probe,
            placeholder: PlaceholderGenerator,
            config,
        }
    }

    #[must_use]
    pub fn availability(&self) -> AvailabilityState {
        self.probe.state()
    }

    pub async fn probe_availability(&self) -> Availability {
        self.probe.probe().await
    }

    /// Drops the cached availability, e.g. after a configuration change.
    pub fn invalidate_availability(&self) {
        self.probe.invalidate();
    }

    /// Pure precondition check.
    pub fn precheck(kind: OperationKind, text: &str) -> Result<(), DispatchError> {
        let required = kind.min_input_chars();
        let actual = input_chars(text);
        if actual < required {
            return Err(DispatchError::InputTooShort { required, actual });
        }
        Ok(())
    }

    pub async fn dispatch(
        &self,
        kind: OperationKind,
        text: &str,
        params: &OperationParams,
    ) -> DispatchResult {
        Self::precheck(kind, text)?;
        let operation = AiOperation::resolve(kind, params);
        self.route(operation, text).await
    }

    pub async fn dispatch_operation(&self, operation: &AiOperation, text: &str) -> DispatchResult {
        Self::precheck(operation.kind(), text)?;
        self.route(operation.clone(), text).await
    }

    /// Dispatches the slot's current text and writes a successful result back
    /// only if the draft has not changed in the meantime.
    pub async fn dispatch_into(
        &self,
        slot: &DraftSlot,
        kind: OperationKind,
        params: &OperationParams,
    ) -> Result<DraftUpdate, DispatchError> {
        let (ticket, text) = slot.checkout();
        let output = self.dispatch(kind, &text, params).await?;
        let outcome = slot.apply(ticket, output.text.clone());
        if outcome == ApplyOutcome::Stale {
            debug!(operation = %kind, "Discarding result for a draft that changed");
        }
        Ok(DraftUpdate { output, outcome })
    }

    async fn route(&self, operation: AiOperation, text: &str) -> DispatchResult {
        let kind = operation.kind();
        let availability = self.probe.state();
        if availability.is_available() {
            debug!(operation = %kind, "Routing to remote AI backend");
            return self.remote(operation, text).await;
        }

        if !self.config.placeholders_enabled {
            debug!(operation = %kind, state = ?availability, "AI backend not available");
            return Err(DispatchError::ServiceUnavailable);
        }

        debug!(operation = %kind, state = ?availability, "Routing to placeholder generator");
        let text = self.placeholder.generate(&operation, text);
        Ok(DispatchOutput {
            operation,
            text,
            source: ResultSource::Placeholder,
        })
    }

    async fn remote(&self, operation: AiOperation, text: &str) -> DispatchResult {
        let request = AiRequest::new(&operation, text);
        let kind = request.operation;
        match tokio::time::timeout(self.config.remote_timeout, self.backend.execute(&request)).await
        {
            Ok(Ok(result)) => Ok(DispatchOutput {
                operation,
                text: result,
                source: ResultSource::Remote,
            }),
            Ok(Err(error)) => {
                warn!(operation = %kind, error = %error, "AI request failed");
                Err(DispatchError::RemoteError {
                    detail: error.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    operation = %kind,
                    timeout_ms = self.config.remote_timeout.as_millis(),
                    "AI request timed out"
                );
                Err(DispatchError::RemoteError {
                    detail: "timeout".to_string(),
                })
            }
        }
    }
}
