use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One back-office change made by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct UserAudit {
    pub id: i64,
    pub username: String,
    pub action_date: DateTime<Utc>,
    pub module: String,
    pub action: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserAudit {
    pub username: String,
    pub module: String,
    pub action: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
}

/// Audit list filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub username: Option<String>,
    pub module: Option<String>,
    pub limit: Option<i64>,
}
