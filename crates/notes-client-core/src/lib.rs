//! Client core for the notes app: session credential, route gate, and AI
//! command dispatch with availability probing.

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod draft;
pub mod fallback;
pub mod gate;
pub mod http;
pub mod navigator;
pub mod operation;
pub mod probe;
pub mod prompt;
pub mod session;

pub use auth::{
    AuthApiTransport, AuthError, AuthInputError, HttpAuthTransport, LoginRequest, RegisterRequest,
    SessionStatus,
};
pub use backend::{AiBackend, AiRequest, BackendError, HttpAiBackend, HttpAiBackendConfig};
pub use client::{NotesClient, NotesClientError};
pub use config::{ClientConfig, ConfigError};
pub use credential::{
    Credential, CredentialError, CredentialPresence, CredentialSnapshot, CredentialStore,
    FileSessionStore, MemorySessionStore, SessionStateStore, SessionStoreError,
};
pub use dispatch::{
    CommandDispatcher, DispatchConfig, DispatchError, DispatchOutput, DispatchResult, DraftUpdate,
    ResultSource,
};
pub use draft::{ApplyOutcome, DraftSlot, DraftTicket};
pub use fallback::{PLACEHOLDER_MARKER, PlaceholderGenerator};
pub use gate::{
    AuthGate, GateDecision, GatePaths, GateState, Redirect, RoutePosture, RouteTable,
    RouteTableError,
};
pub use navigator::{NavigationOutcome, NavigationStatus, Navigator};
pub use operation::{AiOperation, OperationKind, OperationParams, OperationParseError};
pub use probe::{Availability, AvailabilityProbe, AvailabilityState};
pub use session::SessionClient;
