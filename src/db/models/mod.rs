use serde::{Deserialize, Serialize};

pub mod audit_models;
pub mod camera_models;
pub mod car_detail_models;
pub mod client_models;
pub mod error_message_models;
pub mod present_car_models;
pub mod settings_models;
pub mod sign_models;
pub mod user_models;
pub mod zone_image_models;
pub mod zone_models;

/// Row lifecycle shared by zones, cameras, signs and third-party clients.
/// `Deleted` is terminal; deleted rows stay in the table but are never served.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "lifecycle_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Disabled,
    Deleted,
}

impl Lifecycle {
    pub fn is_live(&self) -> bool {
        *self != Lifecycle::Deleted
    }
}

/// Body for the `/status` routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRequest {
    pub lifecycle: Lifecycle,
}
