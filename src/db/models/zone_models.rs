use super::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;

/// Display name keyed by language code, stored as JSONB
pub type LocalizedName = BTreeMap<String, String>;

/// Zone model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Zone {
    pub zone_id: i32,
    pub name: Json<LocalizedName>,
    pub max_capacity: i32,
    pub free_capacity: i32,
    pub lifecycle: Lifecycle,
    pub last_update: DateTime<Utc>,
    pub extra: Option<serde_json::Value>,
}

impl Zone {
    pub fn new(zone_id: i32, name: LocalizedName, max_capacity: i32, free_capacity: i32) -> Self {
        Self {
            zone_id,
            name: Json(name),
            max_capacity,
            free_capacity,
            lifecycle: Lifecycle::Active,
            last_update: Utc::now(),
            extra: None,
        }
    }

    /// Name in the requested language, falling back to any available one
    pub fn display_name(&self, lang: &str) -> Option<&str> {
        self.name
            .get(lang)
            .or_else(|| self.name.values().next())
            .map(String::as_str)
    }
}

/// Create zone request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateZoneRequest {
    pub zone_id: i32,
    pub name: LocalizedName,
    pub max_capacity: i32,
    /// Defaults to `max_capacity` (empty zone)
    pub free_capacity: Option<i32>,
    pub extra: Option<serde_json::Value>,
}

/// Update zone request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateZoneRequest {
    pub name: Option<LocalizedName>,
    pub max_capacity: Option<i32>,
    pub free_capacity: Option<i32>,
    pub extra: Option<serde_json::Value>,
}

/// Zone as exposed to third-party integrators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneOccupancy {
    pub zone_id: i32,
    pub name: LocalizedName,
    pub max_capacity: i32,
    pub free_capacity: i32,
}

impl From<&Zone> for ZoneOccupancy {
    fn from(zone: &Zone) -> Self {
        Self {
            zone_id: zone.zone_id,
            name: zone.name.0.clone(),
            max_capacity: zone.max_capacity,
            free_capacity: zone.free_capacity,
        }
    }
}
