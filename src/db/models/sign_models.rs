use super::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;

/// Sign model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sign {
    pub sign_id: i32,
    pub sign_name: Json<BTreeMap<String, String>>,
    pub sign_type: String,
    pub sign_ip: String,
    pub sign_port: i32,
    pub sign_username: Option<String>,
    #[serde(skip_serializing)]
    pub sign_password: Option<String>,
    pub zone_id: i32,
    pub lifecycle: Lifecycle,
    pub updated_at: DateTime<Utc>,
}

impl Sign {
    /// Key the sign hardware listens on
    pub fn address(&self) -> String {
        format!("{}:{}", self.sign_ip, self.sign_port)
    }
}

/// Create sign request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSignRequest {
    pub sign_id: i32,
    #[serde(default)]
    pub sign_name: BTreeMap<String, String>,
    #[serde(default = "default_sign_type")]
    pub sign_type: String,
    pub sign_ip: String,
    pub sign_port: i32,
    pub sign_username: Option<String>,
    pub sign_password: Option<String>,
    pub zone_id: i32,
}

fn default_sign_type() -> String {
    "led".to_string()
}

/// Update sign request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateSignRequest {
    pub sign_name: Option<BTreeMap<String, String>>,
    pub sign_type: Option<String>,
    pub sign_ip: Option<String>,
    pub sign_port: Option<i32>,
    pub sign_username: Option<String>,
    pub sign_password: Option<String>,
    pub zone_id: Option<i32>,
}

impl From<CreateSignRequest> for Sign {
    fn from(request: CreateSignRequest) -> Self {
        Self {
            sign_id: request.sign_id,
            sign_name: Json(request.sign_name),
            sign_type: request.sign_type,
            sign_ip: request.sign_ip,
            sign_port: request.sign_port,
            sign_username: request.sign_username,
            sign_password: request.sign_password,
            zone_id: request.zone_id,
            lifecycle: Lifecycle::Active,
            updated_at: Utc::now(),
        }
    }
}

impl Sign {
    /// Apply the fields present in an update request
    pub fn apply(&mut self, update: UpdateSignRequest) {
        if let Some(sign_name) = update.sign_name {
            self.sign_name = Json(sign_name);
        }
        if let Some(sign_type) = update.sign_type {
            self.sign_type = sign_type;
        }
        if let Some(sign_ip) = update.sign_ip {
            self.sign_ip = sign_ip;
        }
        if let Some(sign_port) = update.sign_port {
            self.sign_port = sign_port;
        }
        if update.sign_username.is_some() {
            self.sign_username = update.sign_username;
        }
        if update.sign_password.is_some() {
            self.sign_password = update.sign_password;
        }
        if let Some(zone_id) = update.zone_id {
            self.zone_id = zone_id;
        }
    }
}
