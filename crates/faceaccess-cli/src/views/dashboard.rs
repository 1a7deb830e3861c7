use std::fmt::Write;

use faceaccess_core::models::DashboardStats;

use crate::utils::percent_bar;

/// Width of the grant rate bar in characters
const RATE_BAR_WIDTH: usize = 30;

pub fn render_dashboard(stats: &DashboardStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overview");
    let _ = writeln!(out, "--------");
    let _ = writeln!(out, "{:<18}{:>8}", "Employees", stats.total_employees);
    let _ = writeln!(out, "{:<18}{:>8}", "Access attempts", stats.access.total_access_attempts);
    let _ = writeln!(out, "{:<18}{:>8}", "Granted", stats.access.granted);
    let _ = writeln!(out, "{:<18}{:>8}", "Denied", stats.access.denied);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Grant rate  {} {:.2}%",
        percent_bar(stats.access.grant_rate, RATE_BAR_WIDTH),
        stats.access.grant_rate
    );
    out
}
