//! Route gating on session state.
//!
//! Screens ask the guard before rendering. While the session is still being
//! determined the answer is `Loading` for every route, so neither protected
//! content nor the login screen shows prematurely.

use tokio::sync::watch;

use crate::auth::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Employees,
    Logs,
}

impl Route {
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
            Route::Employees => "Employees",
            Route::Logs => "Access Logs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not determined yet; show a neutral placeholder
    Loading,
    Render(Route),
    Redirect(Route),
}

impl GuardDecision {
    pub fn allows(&self, route: Route) -> bool {
        *self == GuardDecision::Render(route)
    }
}

pub struct RouteGuard {
    state: watch::Receiver<SessionState>,
}

impl RouteGuard {
    pub fn new(state: watch::Receiver<SessionState>) -> Self {
        Self { state }
    }

    /// Decide from the state as it is right now
    pub fn check(&self, route: Route) -> GuardDecision {
        decide(*self.state.borrow(), route)
    }

    /// Wait for the session to be determined, then decide.
    ///
    /// If the session manager is gone before that happens the route is
    /// treated as unauthenticated.
    pub async fn resolve(&mut self, route: Route) -> GuardDecision {
        let state = match self.state.wait_for(SessionState::is_known).await {
            Ok(state) => *state,
            Err(_) => SessionState::Unauthenticated,
        };
        decide(state, route)
    }
}

pub fn decide(state: SessionState, route: Route) -> GuardDecision {
    match (state, route.is_protected()) {
        (SessionState::Unknown, _) => GuardDecision::Loading,
        (SessionState::Authenticated, true) => GuardDecision::Render(route),
        (SessionState::Authenticated, false) => GuardDecision::Redirect(Route::Dashboard),
        (SessionState::Unauthenticated, true) => GuardDecision::Redirect(Route::Login),
        (SessionState::Unauthenticated, false) => GuardDecision::Render(route),
    }
}
