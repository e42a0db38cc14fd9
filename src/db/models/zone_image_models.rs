use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const JPEG_PREFIX: &str = "data:image/jpeg;base64,";
const PNG_PREFIX: &str = "data:image/png;base64,";

/// Zone map picture for one language, stored as data URIs in two sizes
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct ZoneImage {
    pub id: i32,
    pub zone_id: i32,
    pub language: String,
    pub image_small: String,
    pub image_large: String,
    pub extra: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl ZoneImage {
    pub fn sized(&self, size: ImageSize) -> &str {
        match size {
            ImageSize::Small => &self.image_small,
            ImageSize::Large => &self.image_large,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Small,
    Large,
}

impl ImageSize {
    /// Anything but `small` serves the large picture
    pub fn from_setting(value: &str) -> Self {
        if value.eq_ignore_ascii_case("small") {
            ImageSize::Small
        } else {
            ImageSize::Large
        }
    }
}

/// Body of `PUT /backoffice/zones/:id/images/:lang`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneImageRequest {
    pub image_small: String,
    pub image_large: String,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

/// Split a `data:image/{png,jpeg};base64,` URI into content type and payload
pub fn split_data_uri(uri: &str) -> Result<(&'static str, &str), Error> {
    if let Some(payload) = uri.strip_prefix(JPEG_PREFIX) {
        return Ok(("image/jpeg", payload));
    }
    if let Some(payload) = uri.strip_prefix(PNG_PREFIX) {
        return Ok(("image/png", payload));
    }
    Err(Error::Validation(
        "Image must be a base64 PNG or JPEG data URI".to_string(),
    ))
}

/// Content type and decoded bytes of a stored data URI
pub fn decode_data_uri(uri: &str) -> Result<(&'static str, Vec<u8>), Error> {
    use base64::{engine::general_purpose, Engine as _};

    let (content_type, payload) = split_data_uri(uri)?;
    let data = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Parse(format!("Invalid base64 image: {}", e)))?;
    Ok((content_type, data))
}
