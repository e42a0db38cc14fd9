use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;

/// Car park wide settings, a single row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Settings {
    pub carpark_id: i32,
    pub carpark_name: Json<BTreeMap<String, String>>,
    pub default_lang: String,
    pub present_car_reset_enabled: bool,
    /// Local hour (0-23) at which the present car table is emptied
    pub present_car_reset_hour: i32,
    pub counting_maintenance_enabled: bool,
    /// Local hour (0-23) at which zone counters are checked
    pub counting_maintenance_hour: i32,
    /// `small` or `large`, the zone map size served to the PKA terminals
    pub pka_image_size: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            carpark_id: 1,
            carpark_name: Json(BTreeMap::new()),
            default_lang: "en".to_string(),
            present_car_reset_enabled: false,
            present_car_reset_hour: 3,
            counting_maintenance_enabled: false,
            counting_maintenance_hour: 4,
            pka_image_size: "large".to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// Update settings request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSettingsRequest {
    pub carpark_name: Option<BTreeMap<String, String>>,
    pub default_lang: Option<String>,
    pub present_car_reset_enabled: Option<bool>,
    pub present_car_reset_hour: Option<i32>,
    pub counting_maintenance_enabled: Option<bool>,
    pub counting_maintenance_hour: Option<i32>,
    pub pka_image_size: Option<String>,
}
