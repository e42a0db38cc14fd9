use super::Lifecycle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Camera model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Camera {
    pub cam_id: i32,
    pub cam_name: String,
    pub cam_type: String,
    pub cam_ip: String,
    pub cam_port: i32,
    pub cam_user: Option<String>,
    #[serde(skip_serializing)]
    pub cam_password: Option<String>,
    pub zone_in_id: i32,
    pub zone_out_id: i32,
    /// Informational; the capture payload carries the direction that counts
    pub direction_hint: String,
    pub lifecycle: Lifecycle,
    pub updated_at: DateTime<Utc>,
}

/// Create camera request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCameraRequest {
    pub cam_id: i32,
    pub cam_name: String,
    #[serde(default = "default_cam_type")]
    pub cam_type: String,
    pub cam_ip: String,
    #[serde(default = "default_cam_port")]
    pub cam_port: i32,
    pub cam_user: Option<String>,
    pub cam_password: Option<String>,
    pub zone_in_id: i32,
    pub zone_out_id: i32,
    #[serde(default = "default_direction_hint")]
    pub direction_hint: String,
}

fn default_cam_type() -> String {
    "hikvision".to_string()
}

fn default_cam_port() -> i32 {
    80
}

fn default_direction_hint() -> String {
    "unknown".to_string()
}

/// Update camera request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCameraRequest {
    pub cam_name: Option<String>,
    pub cam_type: Option<String>,
    pub cam_ip: Option<String>,
    pub cam_port: Option<i32>,
    pub cam_user: Option<String>,
    pub cam_password: Option<String>,
    pub zone_in_id: Option<i32>,
    pub zone_out_id: Option<i32>,
    pub direction_hint: Option<String>,
}

impl From<CreateCameraRequest> for Camera {
    fn from(request: CreateCameraRequest) -> Self {
        Self {
            cam_id: request.cam_id,
            cam_name: request.cam_name,
            cam_type: request.cam_type,
            cam_ip: request.cam_ip,
            cam_port: request.cam_port,
            cam_user: request.cam_user,
            cam_password: request.cam_password,
            zone_in_id: request.zone_in_id,
            zone_out_id: request.zone_out_id,
            direction_hint: request.direction_hint.to_lowercase(),
            lifecycle: Lifecycle::Active,
            updated_at: Utc::now(),
        }
    }
}

impl Camera {
    /// Apply the fields present in an update request
    pub fn apply(&mut self, update: UpdateCameraRequest) {
        if let Some(cam_name) = update.cam_name {
            self.cam_name = cam_name;
        }
        if let Some(cam_type) = update.cam_type {
            self.cam_type = cam_type;
        }
        if let Some(cam_ip) = update.cam_ip {
            self.cam_ip = cam_ip;
        }
        if let Some(cam_port) = update.cam_port {
            self.cam_port = cam_port;
        }
        if update.cam_user.is_some() {
            self.cam_user = update.cam_user;
        }
        if update.cam_password.is_some() {
            self.cam_password = update.cam_password;
        }
        if let Some(zone_in_id) = update.zone_in_id {
            self.zone_in_id = zone_in_id;
        }
        if let Some(zone_out_id) = update.zone_out_id {
            self.zone_out_id = zone_out_id;
        }
        if let Some(direction_hint) = update.direction_hint {
            self.direction_hint = direction_hint.to_lowercase();
        }
    }
}
