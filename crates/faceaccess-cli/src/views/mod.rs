//! Text renderings of the admin screens.
//!
//! Each view turns already-fetched data into a printable block; fetching
//! and gating happen in `App`.

pub mod dashboard;
pub mod employees;
pub mod logs;

pub use dashboard::render_dashboard;
pub use employees::render_employees;
pub use logs::render_logs;

/// Placeholder shown while the session is still being checked
pub const LOADING: &str = "Checking session...";
