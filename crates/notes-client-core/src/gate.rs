//! Route authorization gate.
//!
//! [`AuthGate::evaluate`] is a pure function of (posture, credential presence,
//! current path) and keeps no state between navigations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::credential::CredentialPresence;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePosture {
    Public,
    AuthenticatedOnly,
    UnauthenticatedOnly,
}

impl RoutePosture {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::AuthenticatedOnly => "authenticated_only",
            Self::UnauthenticatedOnly => "unauthenticated_only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Render,
    RedirectTo(Redirect),
    /// Credential presence is still being determined; protected content
    /// must not be shown.
    Pending,
}

impl GateDecision {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Resolved(GateDecision),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    pub login: String,
    pub home: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.to_string(),
            home: DEFAULT_HOME_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthGate {
    paths: GatePaths,
}

impl AuthGate {
    #[must_use]
    pub fn new(paths: GatePaths) -> Self {
        Self {
            paths: GatePaths {
                login: normalize_path(&paths.login),
                home: normalize_path(&paths.home),
            },
        }
    }

    #[must_use]
    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    #[must_use]
    pub fn evaluate(
        &self,
        posture: RoutePosture,
        presence: CredentialPresence,
        current_path: &str,
    ) -> GateDecision {
        let current = normalize_path(current_path);
        match (posture, presence) {
            (RoutePosture::Public, _) => GateDecision::Render,
            (_, CredentialPresence::Unknown) => GateDecision::Pending,
            (RoutePosture::AuthenticatedOnly, CredentialPresence::Present)
            | (RoutePosture::UnauthenticatedOnly, CredentialPresence::Absent) => {
                GateDecision::Render
            }
            (RoutePosture::AuthenticatedOnly, CredentialPresence::Absent) => {
                redirect_unless_here(&current, &self.paths.login, Some(current.clone()))
            }
            (RoutePosture::UnauthenticatedOnly, CredentialPresence::Present) => {
                redirect_unless_here(&current, &self.paths.home, None)
            }
        }
    }

    /// Decision for a path with no registered posture: send the caller home.
    #[must_use]
    pub fn evaluate_unrouted(&self, current_path: &str) -> GateDecision {
        let current = normalize_path(current_path);
        redirect_unless_here(&current, &self.paths.home, None)
    }
}

// A redirect to the path the caller is already on would loop; render instead.
fn redirect_unless_here(current: &str, target: &str, return_path: Option<String>) -> GateDecision {
    if current == target {
        return GateDecision::Render;
    }
    GateDecision::RedirectTo(Redirect {
        target: target.to_string(),
        return_path,
    })
}

/// Drops query and fragment, collapses a trailing slash (except for `/`),
/// and guarantees a leading slash.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let before_query = raw.split('?').next().unwrap_or_default();
    let path = before_query.split('#').next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("route {path} is registered more than once")]
    DuplicateRoute { path: String },
}

/// Static posture assignment, fixed once built.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    exact: HashMap<String, RoutePosture>,
    prefixes: Vec<(String, RoutePosture)>,
}

impl RouteTable {
    pub fn from_routes<I, P>(routes: I) -> Result<Self, RouteTableError>
    where
        I: IntoIterator<Item = (P, RoutePosture)>,
        P: AsRef<str>,
    {
        let mut table = Self::default();
        for (path, posture) in routes {
            let raw = path.as_ref().trim();
            if let Some(prefix) = raw.strip_suffix("/*") {
                let prefix = normalize_path(prefix);
                if table.prefixes.iter().any(|(existing, _)| *existing == prefix) {
                    return Err(RouteTableError::DuplicateRoute {
                        path: raw.to_string(),
                    });
                }
                table.prefixes.push((prefix, posture));
            } else {
                let path = normalize_path(raw);
                if table.exact.insert(path.clone(), posture).is_some() {
                    return Err(RouteTableError::DuplicateRoute { path });
                }
            }
        }
        // Longest prefix first so the most specific entry wins.
        table
            .prefixes
            .sort_by_key(|(prefix, _)| std::cmp::Reverse(prefix.len()));
        Ok(table)
    }

    /// Routes of the notes client.
    #[must_use]
    pub fn notes_default() -> Self {
        let mut exact = HashMap::new();
        exact.insert("/".to_string(), RoutePosture::Public);
        exact.insert("/login".to_string(), RoutePosture::UnauthenticatedOnly);
        exact.insert("/signup".to_string(), RoutePosture::UnauthenticatedOnly);
        exact.insert("/notes".to_string(), RoutePosture::AuthenticatedOnly);
        exact.insert("/publicnotes".to_string(), RoutePosture::AuthenticatedOnly);
        Self {
            exact,
            prefixes: Vec::new(),
        }
    }

    #[must_use]
    pub fn posture_for(&self, path: &str) -> Option<RoutePosture> {
        let path = normalize_path(path);
        if let Some(posture) = self.exact.get(&path) {
            return Some(*posture);
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| {
                path == *prefix
                    || prefix == "/"
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|(_, posture)| *posture)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.prefixes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
