//! Navigation driver around [`AuthGate`].
//!
//! Each call to [`Navigator::navigate`] starts a fresh evaluation. A newer
//! navigation supersedes any older one still waiting on a pending credential
//! check, and a superseded evaluation never publishes its decision.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::credential::{CredentialPresence, CredentialSnapshot, CredentialStore};
use crate::gate::{AuthGate, GateDecision, GateState, RouteTable, normalize_path};

pub const DEFAULT_PENDING_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Decided(GateDecision),
    /// A newer navigation started before this one resolved.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationStatus {
    pub generation: u64,
    pub path: String,
    pub state: GateState,
}

#[derive(Debug)]
pub struct Navigator {
    gate: AuthGate,
    routes: RouteTable,
    credentials: CredentialStore,
    pending_timeout: Duration,
    status: watch::Sender<NavigationStatus>,
}

impl Navigator {
    #[must_use]
    pub fn new(gate: AuthGate, routes: RouteTable, credentials: CredentialStore) -> Self {
        let (status, _) = watch::channel(NavigationStatus {
            generation: 0,
            path: gate.paths().home.clone(),
            state: GateState::Checking,
        });
        Self {
            gate,
            routes,
            credentials,
            pending_timeout: Duration::from_millis(DEFAULT_PENDING_TIMEOUT_MS),
            status,
        }
    }

    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    #[must_use]
    pub fn status(&self) -> NavigationStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.status.borrow().state.clone()
    }

    /// Single evaluation against one credential snapshot.
    #[must_use]
    pub fn decide(&self, path: &str, snapshot: &CredentialSnapshot) -> GateDecision {
        self.decide_with_presence(path, snapshot.presence())
    }

    fn decide_with_presence(&self, path: &str, presence: CredentialPresence) -> GateDecision {
        match self.routes.posture_for(path) {
            Some(posture) => self.gate.evaluate(posture, presence, path),
            None => self.gate.evaluate_unrouted(path),
        }
    }

    pub async fn navigate(&self, path: &str) -> NavigationOutcome {
        let path = normalize_path(path);
        let mut generation = 0;
        self.status.send_modify(|status| {
            status.generation += 1;
            status.path.clone_from(&path);
            status.state = GateState::Checking;
            generation = status.generation;
        });
        let mut navigations = self.status.subscribe();
        let mut credentials = self.credentials.subscribe();
        let deadline = tokio::time::Instant::now() + self.pending_timeout;

        loop {
            let snapshot = credentials.borrow_and_update().clone();
            let decision = self.decide(&path, &snapshot);
            if !decision.is_pending() {
                return self.publish(generation, decision);
            }

            tokio::select! {
                changed = credentials.changed() => {
                    if changed.is_err() {
                        return self.publish(
                            generation,
                            self.decide_with_presence(&path, CredentialPresence::Absent),
                        );
                    }
                }
                _ = navigations.changed() => {
                    if navigations.borrow_and_update().generation != generation {
                        debug!(path = %path, "Navigation superseded while pending");
                        return NavigationOutcome::Superseded;
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    debug!(path = %path, "Pending credential check timed out; treating as absent");
                    return self.publish(
                        generation,
                        self.decide_with_presence(&path, CredentialPresence::Absent),
                    );
                }
            }
        }
    }

    fn publish(&self, generation: u64, decision: GateDecision) -> NavigationOutcome {
        let applied = self.status.send_if_modified(|status| {
            if status.generation != generation {
                return false;
            }
            status.state = GateState::Resolved(decision.clone());
            true
        });
        if applied {
            debug!(generation, decision = ?decision, "Navigation resolved");
            NavigationOutcome::Decided(decision)
        } else {
            NavigationOutcome::Superseded
        }
    }
}
