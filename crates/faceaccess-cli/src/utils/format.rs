use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp in local time for table display
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Horizontal bar for a 0..=100 percentage
pub fn percent_bar(percent: f64, width: usize) -> String {
    let clamped = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Parse a `--since`/`--until` argument.
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (local) or `YYYY-MM-DD` (local midnight).
pub fn parse_date_arg(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::default())))
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD or RFC 3339", s))?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("date '{}' does not exist in the local timezone", s))
}
