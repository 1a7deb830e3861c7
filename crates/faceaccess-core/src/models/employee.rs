use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::log::flexible_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    /// Badge / HR identifier assigned by the organization
    pub employee_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, with = "flexible_timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_role() -> String {
    "employee".to_string()
}

fn default_active() -> bool {
    true
}

impl Employee {
    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "active"
        } else {
            "inactive"
        }
    }
}
