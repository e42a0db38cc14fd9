use crate::db::models::car_detail_models::{NewCarDetail, Picture, PictureKind};
use crate::error::Error;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;
use yaserde::de::from_str;
use yaserde_derive::YaDeserialize;

/// Multipart part name used by the cameras
pub const XML_PART_NAME: &str = "anpr.xml";

// Vendor payload, only the fields that are used
#[derive(Debug, YaDeserialize, Default)]
#[yaserde(rename = "EventNotificationAlert")]
pub struct EventNotificationAlert {
    #[yaserde(rename = "ipAddress")]
    pub ip_address: String,
    #[yaserde(rename = "portNo")]
    pub port_no: String,
    #[yaserde(rename = "macAddress")]
    pub mac_address: String,
    #[yaserde(rename = "channelID")]
    pub channel_id: String,
    #[yaserde(rename = "dateTime")]
    pub date_time: String,
    #[yaserde(rename = "eventType")]
    pub event_type: String,
    #[yaserde(rename = "ANPR")]
    pub anpr: AnprInfo,
}

#[derive(Debug, YaDeserialize, Default)]
pub struct AnprInfo {
    #[yaserde(rename = "country")]
    pub country: String,
    #[yaserde(rename = "licensePlate")]
    pub license_plate: String,
    #[yaserde(rename = "direction")]
    pub direction: String,
    #[yaserde(rename = "confidenceLevel")]
    pub confidence_level: Option<i32>,
    #[yaserde(rename = "vehicleType")]
    pub vehicle_type: String,
    #[yaserde(rename = "originalLicensePlate")]
    pub original_license_plate: String,
}

/// Direction of travel reported by the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
    Unknown,
}

impl Direction {
    /// Vendor strings are matched case-insensitively; anything unrecognised is `Unknown`
    pub fn from_vendor(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "forward" | "enter" | "in" => Direction::Forward,
            "reverse" | "exit" | "out" => Direction::Reverse,
            _ => Direction::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Unknown => "unknown",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One normalised plate sighting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capture {
    pub plate: String,
    pub direction: Direction,
    pub confidence: i32,
    pub camera_address: String,
    pub captured_at: DateTime<Utc>,
    pub country: Option<String>,
    pub vehicle_type: Option<String>,
    /// Pictures uploaded with the event, attached by the webhook
    #[serde(skip)]
    pub pictures: Vec<Picture>,
}

impl Capture {
    /// Vendor details kept alongside the present car row
    pub fn extra(&self) -> Option<serde_json::Value> {
        if self.country.is_none() && self.vehicle_type.is_none() {
            return None;
        }
        Some(serde_json::json!({
            "country": self.country,
            "vehicle_type": self.vehicle_type,
        }))
    }

    /// Car detail row for this sighting: the normalised event plus the first
    /// plate and scene pictures
    pub fn car_detail(&self) -> NewCarDetail {
        let first = |kind: PictureKind| {
            self.pictures
                .iter()
                .find(|picture| picture.kind == kind)
                .cloned()
        };

        NewCarDetail {
            cam_body: serde_json::json!({
                "plate": self.plate,
                "direction": self.direction,
                "confidence": self.confidence,
                "camera_address": self.camera_address,
                "captured_at": self.captured_at,
                "country": self.country,
                "vehicle_type": self.vehicle_type,
            }),
            plate_image: first(PictureKind::Plate),
            scene_image: first(PictureKind::Scene),
        }
    }
}

impl TryFrom<EventNotificationAlert> for Capture {
    type Error = Error;

    fn try_from(alert: EventNotificationAlert) -> Result<Self, Self::Error> {
        let plate = normalize_plate(&alert.anpr.license_plate);
        if plate.is_empty() {
            return Err(Error::Parse("licensePlate is missing".to_string()));
        }

        let camera_address = alert.ip_address.trim().to_string();
        if camera_address.is_empty() {
            return Err(Error::Parse("ipAddress is missing".to_string()));
        }

        let captured_at = DateTime::parse_from_rfc3339(alert.date_time.trim())
            .map(|time| time.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Capture {
            plate,
            direction: Direction::from_vendor(&alert.anpr.direction),
            confidence: alert.anpr.confidence_level.unwrap_or(0),
            camera_address,
            captured_at,
            country: non_empty(alert.anpr.country),
            vehicle_type: non_empty(alert.anpr.vehicle_type),
            pictures: Vec::new(),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Plates are stored upper-case without surrounding or inner whitespace
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

fn strip_default_namespace(xml: &str) -> Result<Cow<'_, str>, Error> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r#"\sxmlns\s*=\s*"[^"]*""#))
        .as_ref()
        .map_err(|e| Error::Internal(format!("Invalid namespace pattern: {}", e)))?;

    Ok(pattern.replace_all(xml, ""))
}

/// Parse the raw XML document of one ANPR event
pub fn parse_event(xml: &str) -> Result<Capture, Error> {
    let xml = xml.trim_start_matches('\u{feff}').trim();
    if xml.is_empty() {
        return Err(Error::Parse("empty XML document".to_string()));
    }

    // yaserde rejects elements in an undeclared default namespace
    let xml = strip_default_namespace(xml)?;

    let alert: EventNotificationAlert =
        from_str(&xml).map_err(|e| Error::Parse(format!("Failed to parse ANPR event: {}", e)))?;

    Capture::try_from(alert)
}

/// A part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

/// Pick the XML document out of the uploaded parts: the part named `anpr.xml`,
/// otherwise the first part whose file name ends in `.xml`
pub fn extract_xml_part(parts: &[UploadedPart]) -> Result<String, Error> {
    let part = parts
        .iter()
        .find(|part| part.name.as_deref() == Some(XML_PART_NAME))
        .or_else(|| {
            parts.iter().find(|part| {
                part.file_name
                    .as_deref()
                    .map(|name| name.to_ascii_lowercase().ends_with(".xml"))
                    .unwrap_or(false)
            })
        })
        .ok_or_else(|| Error::Parse(format!("multipart part {} is missing", XML_PART_NAME)))?;

    String::from_utf8(part.data.clone())
        .map_err(|e| Error::Parse(format!("XML part is not UTF-8: {}", e)))
}

fn picture_content_type(name: &str) -> Option<&'static str> {
    let name = name.to_ascii_lowercase();
    if name.ends_with(".jpg") || name.ends_with(".jpeg") {
        Some("image/jpeg")
    } else if name.ends_with(".png") {
        Some("image/png")
    } else {
        None
    }
}

/// Image parts of the upload. Parts whose name mentions the licence plate are
/// plate close-ups, every other image is a scene picture.
pub fn collect_pictures(parts: &[UploadedPart]) -> Vec<Picture> {
    parts
        .iter()
        .filter(|part| !part.data.is_empty())
        .filter_map(|part| {
            let name = part.file_name.as_deref().or(part.name.as_deref())?;
            let content_type = picture_content_type(name)?;
            let kind = if name.to_ascii_lowercase().contains("plate") {
                PictureKind::Plate
            } else {
                PictureKind::Scene
            };
            Some(Picture {
                kind,
                content_type: content_type.to_string(),
                data: part.data.clone(),
            })
        })
        .collect()
}
