//! Decision evaluation: weighted multi-criteria scoring, the decision and auth
//! services behind the HTTP API, and an async client for that API.

pub mod auth;
pub mod client;
pub mod config;
pub mod decisions;
pub mod error;
pub mod telemetry;
