use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known location of a licence plate. One row per plate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct PresentCar {
    pub id: i64,
    pub lpn: String,
    pub camera_id: i32,
    pub current_zone_id: i32,
    pub last_zone_id: i32,
    pub direction: String,
    pub confidence: i32,
    pub transaction_date: DateTime<Utc>,
    pub car_details_id: Option<i64>,
    pub extra: Option<serde_json::Value>,
}

/// Append-only copy of a present car transition
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct PresentCarHistory {
    pub id: i64,
    pub lpn: String,
    pub camera_id: i32,
    pub current_zone_id: i32,
    pub last_zone_id: i32,
    pub direction: String,
    pub confidence: i32,
    pub transaction_date: DateTime<Utc>,
    pub car_details_id: Option<i64>,
    pub extra: Option<serde_json::Value>,
}

/// Values written by the reconciler for one sighting
#[derive(Debug, Clone, PartialEq)]
pub struct PresentCarWrite {
    pub lpn: String,
    pub camera_id: i32,
    pub current_zone_id: i32,
    pub last_zone_id: i32,
    pub direction: String,
    pub confidence: i32,
    pub transaction_date: DateTime<Utc>,
    pub car_details_id: Option<i64>,
    pub extra: Option<serde_json::Value>,
}

/// Whether an upsert created the plate's row or overwrote it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Present car list filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PresentCarQuery {
    pub zone_id: Option<i32>,
    pub lpn: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// History search filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub lpn: Option<String>,
    pub zone_id: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
