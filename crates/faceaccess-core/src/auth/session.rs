//! Session lifecycle: login, logout and startup rehydration.
//!
//! `SessionManager` is the only writer of the credential. It keeps the
//! credential store and the client's attached token in step and publishes
//! the resulting `SessionState` on a watch channel.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};

use super::CredentialStore;

/// Shown when the server gave no reason or could not be reached
pub const GENERIC_LOGIN_ERROR: &str = "Login failed";

const MISSING_FIELDS_ERROR: &str = "Email and password required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Startup; rehydration has not run yet
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    pub fn is_known(&self) -> bool {
        !matches!(self, SessionState::Unknown)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unknown => write!(f, "checking"),
            SessionState::Authenticated => write!(f, "logged in"),
            SessionState::Unauthenticated => write!(f, "logged out"),
        }
    }
}

/// Why a login did not produce a session. `Display` is the message to show
/// on the login screen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The service refused the credentials
    #[error("{0}")]
    Rejected(String),

    /// The service failed with a reason
    #[error("{0}")]
    Server(String),

    /// No usable answer from the service
    #[error("{}", GENERIC_LOGIN_ERROR)]
    Transport,

    #[error("{}: could not save session", GENERIC_LOGIN_ERROR)]
    Storage,

    /// A logout completed while this login was in flight
    #[error("Login cancelled by logout")]
    Superseded,
}

impl AuthError {
    /// Map a failed login call, preferring the server's own reason.
    pub fn from_api(err: &ApiError) -> Self {
        if err.is_transport() {
            return AuthError::Transport;
        }
        match (err, err.detail()) {
            (
                ApiError::Unauthorized(_) | ApiError::AccessDenied(_) | ApiError::Validation(_),
                Some(detail),
            ) => AuthError::Rejected(detail.to_string()),
            (_, Some(detail)) => AuthError::Server(detail.to_string()),
            (_, None) => AuthError::Transport,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub struct SessionManager {
    client: Arc<ApiClient>,
    store: Arc<dyn CredentialStore>,
    state_tx: watch::Sender<SessionState>,
    /// Serializes credential commits. Holds the logout epoch: bumped by
    /// every logout so that logins started before it cannot commit.
    commit: Mutex<u64>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, store: Arc<dyn CredentialStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unknown);
        Self {
            client,
            store,
            state_tx,
            commit: Mutex::new(0),
        }
    }

    /// The shared client views issue their requests through
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Receiver that sees every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn lock_commit(&self) -> MutexGuard<'_, u64> {
        self.commit.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!(from = ?previous, to = ?state, "Session state changed");
        }
    }

    /// Restore a previously stored token. Local only, no network.
    ///
    /// An unreadable store counts as empty.
    pub fn rehydrate(&self) -> SessionState {
        let _commit = self.lock_commit();

        let token = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, treating as absent");
                None
            }
        };

        let state = match token {
            Some(token) => {
                debug!("Stored token found");
                self.client.attach(token);
                SessionState::Authenticated
            }
            None => {
                debug!("No stored token");
                self.client.detach();
                SessionState::Unauthenticated
            }
        };
        self.publish(state);
        state
    }

    /// Exchange credentials for a token and make it the live session.
    ///
    /// On failure nothing is written and the previous state is kept. When
    /// logins overlap, the one that completes last wins. A logout that
    /// completes while a login is in flight wins over that login.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        if self.state() == SessionState::Unknown {
            self.rehydrate();
        }

        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Rejected(MISSING_FIELDS_ERROR.to_string()));
        }

        let epoch = *self.lock_commit();

        let token = match self.client.authenticate(email, password).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Login failed");
                return Err(AuthError::from_api(&e));
            }
        };

        let commit = self.lock_commit();
        if *commit != epoch {
            info!("Discarding login response that arrived after logout");
            return Err(AuthError::Superseded);
        }

        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist token, login aborted");
            return Err(AuthError::Storage);
        }
        self.client.attach(token);
        self.publish(SessionState::Authenticated);
        drop(commit);

        info!("Login successful");
        Ok(())
    }

    /// Drop the session locally. Never fails and needs no server round-trip.
    pub fn logout(&self) {
        let mut epoch = self.lock_commit();
        *epoch += 1;

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        self.client.detach();
        self.publish(SessionState::Unauthenticated);
    }

    /// Drop a session the server no longer accepts.
    pub fn expire(&self) {
        warn!("Session token rejected by server, logging out");
        self.logout();
    }

    /// Expire the session if `err` is a 401 from a protected endpoint.
    /// Returns whether it did. The error itself is left for the caller.
    pub fn invalidate_if_unauthorized(&self, err: &ApiError) -> bool {
        if err.is_unauthorized() && self.is_authenticated() {
            self.expire();
            true
        } else {
            false
        }
    }
}
