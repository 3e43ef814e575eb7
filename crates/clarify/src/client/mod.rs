//! Async HTTP client for the decision API.
//!
//! The session lives in an explicit [`SessionStore`] that the request layer
//! reads through [`TokenProvider`] at send time. [`ApiClient`] maps one
//! operation to one request; [`DecisionWorkspace`] drives the open-decision
//! workflow on top of it, including the suggest, validate, apply, analyze
//! sequence.

mod api;
mod config;
mod error;
mod inflight;
mod session;
mod workspace;

pub use api::ApiClient;
pub use config::{AuthFailurePolicy, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
pub use error::ClientError;
pub use session::{token_fn, FnTokenProvider, SessionStore, TokenProvider};
pub use workspace::DecisionWorkspace;
