use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Camera payload and pictures kept for one sighting
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct CarDetail {
    pub id: i64,
    pub cam_body: serde_json::Value,
    #[serde(skip_serializing)]
    pub plate_image: Option<Vec<u8>>,
    pub plate_image_type: Option<String>,
    #[serde(skip_serializing)]
    pub scene_image: Option<Vec<u8>>,
    pub scene_image_type: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl CarDetail {
    pub fn picture(&self, kind: PictureKind) -> Option<(&[u8], &str)> {
        let (data, content_type) = match kind {
            PictureKind::Plate => (&self.plate_image, &self.plate_image_type),
            PictureKind::Scene => (&self.scene_image, &self.scene_image_type),
        };
        Some((
            data.as_deref()?,
            content_type.as_deref().unwrap_or("application/octet-stream"),
        ))
    }
}

/// Which of the two camera pictures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureKind {
    Plate,
    Scene,
}

impl PictureKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plate" => Some(PictureKind::Plate),
            "scene" => Some(PictureKind::Scene),
            _ => None,
        }
    }
}

/// One picture uploaded next to the XML event
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub kind: PictureKind,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Row written before the present car so the car can point at it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCarDetail {
    pub cam_body: serde_json::Value,
    pub plate_image: Option<Picture>,
    pub scene_image: Option<Picture>,
}
