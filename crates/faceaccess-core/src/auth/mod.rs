//! Authentication module for managing the admin session.
//!
//! This module provides:
//! - `CredentialStore`: durable storage for the single session token
//!   (file, OS keychain or in-memory backends)
//! - `SessionManager`: login, logout and startup rehydration, and the
//!   published `SessionState`
//!
//! Tokens carry no client-side expiry; a token is dropped on logout or when
//! the server rejects it.

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore, TOKEN_KEY,
};
pub use session::{AuthError, SessionManager, SessionState, GENERIC_LOGIN_ERROR};
