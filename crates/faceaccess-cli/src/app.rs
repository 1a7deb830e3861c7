//! Application state for the faceaccess admin client.
//!
//! `App` owns the single shared API client (through the session manager),
//! runs rehydration at startup and routes every screen through the guard so
//! no protected fetch happens without a session.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use faceaccess_core::api::ApiClient;
use faceaccess_core::auth::{AuthError, CredentialStore};
use faceaccess_core::models::LogQuery;
use faceaccess_core::{Config, GuardDecision, Route, RouteGuard, SessionManager, SessionState};
use tracing::{debug, info, warn};

use crate::views;

/// Environment variable consulted for the login email
pub const EMAIL_ENV: &str = "FACEACCESS_EMAIL";

/// Environment variable consulted for the login password
pub const PASSWORD_ENV: &str = "FACEACCESS_PASSWORD";

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Dashboard,
    Employees,
    Logs(LogQuery),
}

impl Screen {
    pub fn route(&self) -> Route {
        match self {
            Screen::Dashboard => Route::Dashboard,
            Screen::Employees => Route::Employees,
            Screen::Logs(_) => Route::Logs,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ScreenOutput {
    /// Session still being determined
    Loading,
    /// No session; the login screen is where the user belongs
    LoginRequired,
    Rendered(String),
}

pub struct App {
    config: Config,
    session: Arc<SessionManager>,
    guard: RouteGuard,
    persist_config: bool,
}

impl App {
    /// Create the application from a loaded config
    pub fn new(config: Config) -> Result<Self> {
        let store = config.credential_store()?;
        let mut app = Self::with_store(config, store)?;
        app.persist_config = true;
        Ok(app)
    }

    /// Create the application with an explicit credential store.
    /// Config changes made by this instance are not written to disk.
    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let base_url = config.api_base_url();
        let client = ApiClient::with_timeout(&base_url, config.request_timeout())
            .context("Failed to create API client")?;
        let session = Arc::new(SessionManager::new(Arc::new(client), store));
        let guard = RouteGuard::new(session.subscribe());
        debug!(base_url = %base_url, backend = ?config.credential_backend, "App created");

        Ok(Self {
            config,
            session,
            guard,
            persist_config: false,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Restore the stored session. Runs once at startup, before any screen.
    pub fn start(&self) -> SessionState {
        let state = self.session.rehydrate();
        info!(state = ?state, "Session rehydrated");
        state
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} ({})",
            self.session.state(),
            self.session.client().base_url()
        )
    }

    /// Log in and remember the email for next time
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.session.login(email, password).await?;

        self.config.last_email = Some(email.trim().to_string());
        if self.persist_config {
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        Ok(())
    }

    pub fn logout(&self) {
        self.session.logout();
        info!("Logged out");
    }

    /// Gate, fetch and render one screen.
    ///
    /// A 401 from the service ends the session before the error is returned.
    pub async fn show(&mut self, screen: &Screen) -> Result<ScreenOutput> {
        let route = screen.route();
        match self.guard.resolve(route).await {
            GuardDecision::Loading => return Ok(ScreenOutput::Loading),
            // Every screen is protected, so a redirect always lands on login
            GuardDecision::Redirect(_) => return Ok(ScreenOutput::LoginRequired),
            GuardDecision::Render(_) => {}
        }

        let client = self.session.client();
        let rendered = match screen {
            Screen::Dashboard => client.fetch_dashboard().await.map(|s| views::render_dashboard(&s)),
            Screen::Employees => client.fetch_employees().await.map(|e| views::render_employees(&e)),
            Screen::Logs(query) => client.fetch_logs(query).await.map(|l| views::render_logs(&l)),
        };

        match rendered {
            Ok(text) => Ok(ScreenOutput::Rendered(text)),
            Err(e) => {
                if self.session.invalidate_if_unauthorized(&e) {
                    return Err(e).context("Session expired, please log in again");
                }
                Err(e).with_context(|| format!("Failed to load {}", route.title()))
            }
        }
    }

    /// Email to log in with: explicit argument, environment, or prompt
    /// (offering the last used email as default).
    pub fn resolve_email(&self, explicit: Option<String>) -> Result<String> {
        if let Some(email) = explicit.or_else(|| std::env::var(EMAIL_ENV).ok()) {
            return Ok(email);
        }

        match self.config.last_email {
            Some(ref last) => print!("Email [{}]: ", last),
            None => print!("Email: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        match (input.is_empty(), &self.config.last_email) {
            (true, Some(last)) => Ok(last.clone()),
            _ => Ok(input.to_string()),
        }
    }

    /// Password from the environment, else prompted without echo
    pub fn resolve_password() -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Ok(password);
        }
        let password = rpassword::prompt_password("Password: ")?;
        Ok(password)
    }
}
