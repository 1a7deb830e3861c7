use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Default number of log entries requested per page.
pub const DEFAULT_LOG_LIMIT: u32 = 100;

/// Upper bound the log service accepts for `limit`.
pub const MAX_LOG_LIMIT: u32 = 1000;

// ============================================================================
// Decision
// ============================================================================

/// Outcome recorded for an access attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Decision {
    Granted,
    Denied,
    /// Any value the service may add later; kept verbatim.
    Other(String),
}

impl Decision {
    pub fn as_str(&self) -> &str {
        match self {
            Decision::Granted => "granted",
            Decision::Denied => "denied",
            Decision::Other(s) => s.as_str(),
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }
}

impl From<String> for Decision {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("granted") {
            Decision::Granted
        } else if s.eq_ignore_ascii_case("denied") {
            Decision::Denied
        } else {
            Decision::Other(s)
        }
    }
}

impl From<Decision> for String {
    fn from(d: Decision) -> Self {
        d.as_str().to_string()
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    /// Parses user input; only the two known decisions are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Decision::from(s.trim().to_string()) {
            Decision::Other(other) => Err(format!(
                "unknown decision '{}', expected 'granted' or 'denied'",
                other
            )),
            known => Ok(known),
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Access log
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub id: i64,
    #[serde(with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub employee_name: Option<String>,
    /// Similarity score in 0..=1, absent when no face was matched
    #[serde(default)]
    pub recognition_score: Option<f64>,
    pub decision: Decision,
}

impl AccessLog {
    /// Recognition score as a percentage string, or "-" if absent
    pub fn score_display(&self) -> String {
        match self.recognition_score {
            Some(score) => format!("{:.1}%", score * 100.0),
            None => "-".to_string(),
        }
    }

    pub fn employee_display(&self) -> &str {
        self.employee_name.as_deref().unwrap_or("Unknown")
    }
}

/// Filters for `GET /logs`. Unset filters are omitted from the query string.
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub decision: Option<Decision>,
    pub employee_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: u32,
    pub skip: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            decision: None,
            employee_id: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_LOG_LIMIT,
            skip: 0,
        }
    }
}

impl LogQuery {
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Set the page size, clamped to what the service accepts.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_LOG_LIMIT);
        self
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref decision) = self.decision {
            pairs.push(("decision", decision.to_string()));
        }
        if let Some(employee_id) = self.employee_id {
            pairs.push(("employee_id", employee_id.to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        pairs.push(("limit", self.limit.clamp(1, MAX_LOG_LIMIT).to_string()));
        if self.skip > 0 {
            pairs.push(("skip", self.skip.to_string()));
        }
        pairs
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Response of `GET /logs/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessStats {
    #[serde(default)]
    pub total_access_attempts: u64,
    #[serde(default)]
    pub granted: u64,
    #[serde(default)]
    pub denied: u64,
    /// Percentage in 0..=100
    #[serde(default)]
    pub grant_rate: f64,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_employees: usize,
    #[serde(flatten)]
    pub access: AccessStats,
}

// ============================================================================
// Timestamp parsing
// ============================================================================

/// The service emits ISO-8601 timestamps with or without an offset.
/// Naive values are UTC.
pub(crate) mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                Some(s) => super::parse(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_decision_from_wire() {
        assert_eq!(Decision::from("granted".to_string()), Decision::Granted);
        assert_eq!(Decision::from("DENIED".to_string()), Decision::Denied);
        assert_eq!(
            Decision::from("pending".to_string()),
            Decision::Other("pending".to_string())
        );
    }

    #[test]
    fn test_decision_from_str_rejects_unknown() {
        assert_eq!("granted".parse::<Decision>(), Ok(Decision::Granted));
        assert_eq!(" denied ".parse::<Decision>(), Ok(Decision::Denied));
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[test]
    fn test_access_log_parse_naive_timestamp() {
        let json = r#"{
            "id": 7,
            "employee_id": 2,
            "employee_name": "Jane Doe",
            "recognition_score": 0.8734,
            "decision": "granted",
            "timestamp": "2024-05-06T14:03:22.517000"
        }"#;
        let log: AccessLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.id, 7);
        assert!(log.decision.is_granted());
        assert_eq!(log.timestamp.year(), 2024);
        assert_eq!(log.timestamp.hour(), 14);
        assert_eq!(log.score_display(), "87.3%");
    }

    #[test]
    fn test_access_log_parse_unknown_face() {
        let json = r#"{
            "id": 8,
            "employee_id": null,
            "employee_name": null,
            "recognition_score": null,
            "decision": "denied",
            "timestamp": "2024-05-06T14:05:00+02:00"
        }"#;
        let log: AccessLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.decision, Decision::Denied);
        assert_eq!(log.employee_display(), "Unknown");
        assert_eq!(log.score_display(), "-");
        assert_eq!(log.timestamp.hour(), 12);
    }

    #[test]
    fn test_access_log_rejects_garbage_timestamp() {
        let json = r#"{"id": 1, "decision": "granted", "timestamp": "yesterday"}"#;
        assert!(serde_json::from_str::<AccessLog>(json).is_err());
    }

    #[test]
    fn test_log_query_defaults() {
        let pairs = LogQuery::default().to_query_pairs();
        assert_eq!(pairs, vec![("limit", "100".to_string())]);
    }

    #[test]
    fn test_log_query_all_filters() {
        let query = LogQuery {
            employee_id: Some(4),
            start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap()),
            skip: 200,
            ..LogQuery::default()
        }
        .with_decision(Decision::Denied)
        .with_limit(50);

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("decision", "denied".to_string()),
                ("employee_id", "4".to_string()),
                ("start_date", "2024-01-01T00:00:00Z".to_string()),
                ("end_date", "2024-01-31T23:59:59Z".to_string()),
                ("limit", "50".to_string()),
                ("skip", "200".to_string()),
            ]
        );
    }

    #[test]
    fn test_log_query_limit_clamped() {
        assert_eq!(LogQuery::default().with_limit(5000).limit, MAX_LOG_LIMIT);
        assert_eq!(LogQuery::default().with_limit(0).limit, 1);
    }

    #[test]
    fn test_stats_parse() {
        let json = r#"{"total_access_attempts": 40, "granted": 30, "denied": 10, "grant_rate": 75.0}"#;
        let stats: AccessStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.granted, 30);
        assert_eq!(stats.grant_rate, 75.0);
    }

    #[test]
    fn test_stats_parse_integer_rate() {
        // Empty log tables report a plain 0
        let json = r#"{"total_access_attempts": 0, "granted": 0, "denied": 0, "grant_rate": 0}"#;
        let stats: AccessStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats, AccessStats::default());
    }
}
