use std::fmt::Write;

use faceaccess_core::models::{AccessLog, Decision};

use crate::utils::{format_timestamp, truncate_string};

const NAME_WIDTH: usize = 24;

fn decision_label(decision: &Decision) -> String {
    match decision {
        Decision::Granted => "GRANTED".to_string(),
        Decision::Denied => "DENIED".to_string(),
        Decision::Other(other) => other.to_uppercase(),
    }
}

pub fn render_logs(logs: &[AccessLog]) -> String {
    if logs.is_empty() {
        return "No access attempts match.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<8} {:<19} {:<name$} {:>7} {}",
        "ID", "Time", "Employee", "Score", "Decision",
        name = NAME_WIDTH
    );
    for log in logs {
        let _ = writeln!(
            out,
            "{:<8} {:<19} {:<name$} {:>7} {}",
            log.id,
            format_timestamp(&log.timestamp),
            truncate_string(log.employee_display(), NAME_WIDTH),
            log.score_display(),
            decision_label(&log.decision),
            name = NAME_WIDTH
        );
    }
    let granted = logs.iter().filter(|l| l.decision.is_granted()).count();
    let _ = writeln!(out, "\n{} entries, {} granted", logs.len(), granted);
    out
}
