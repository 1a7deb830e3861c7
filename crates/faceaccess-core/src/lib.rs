//! Core library for faceaccess.
//!
//! Session lifecycle for the access-control admin client: a durable
//! credential store, an HTTP client with an attachable bearer token, the
//! session manager that keeps the two in step, and the route guard that
//! gates screens on the session state. Also holds the wire models of the
//! access-control service and the client configuration.

pub mod api;
pub mod auth;
pub mod config;
pub mod guard;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, CredentialStore, SessionManager, SessionState};
pub use config::Config;
pub use guard::{GuardDecision, Route, RouteGuard};
