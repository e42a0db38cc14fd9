//! Parking-guidance integration (`/v2`): bay lookup by plate and zone map pictures.
//! Errors use the integrator's `{success, code, message}` body rather than `ApiError`.

use crate::api::rest::third_party_controller::locate;
use crate::api::rest::AppState;
use crate::counting::capture::normalize_plate;
use crate::db::models::present_car_models::PresentCar;
use crate::db::models::zone_image_models::{decode_data_uri, ImageSize, ZoneImage};
use crate::db::models::zone_models::Zone;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

const LANGUAGE: &str = "en";

#[derive(Debug, Default, Deserialize)]
pub struct BayParams {
    #[serde(rename = "visit.plate.text")]
    pub plate: Option<String>,
}

fn failure(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn no_data() -> Response {
    failure(
        StatusCode::NOT_FOUND,
        json!({ "success": false, "code": -4, "message": "No data found !" }),
    )
}

fn internal(message: &str) -> Response {
    failure(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "success": false, "code": -500, "message": message }),
    )
}

/// `HH:MM:SS` since `since`, never negative
pub(crate) fn dwell(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - since).num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Bay position drawn on the map, read from the image's `extra.x` / `extra.y`
fn position(image: &ZoneImage) -> Value {
    let coordinate = |axis: &str| {
        image
            .extra
            .as_ref()
            .and_then(|extra| extra.get(axis))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    };
    json!({ "x": coordinate("x"), "y": coordinate("y") })
}

pub(crate) fn bay(car: &PresentCar, zone: &Zone, image: &ZoneImage, now: DateTime<Utc>) -> Value {
    let name = zone.name.get(LANGUAGE).cloned().unwrap_or_default();
    json!({
        "id": image.id,
        "is_in_violation": false,
        "is_occupied": true,
        "is_out_of_service": false,
        "is_reserved": false,
        "map": { "id": zone.zone_id, "name": name },
        "position": position(image),
        "visit": {
            "id": car.id,
            "dwell": dwell(car.transaction_date, now),
            "entry_timestamp": car.transaction_date,
            "plate": {
                "confidence": car.confidence,
                "text": car.lpn,
                "timestamp": car.transaction_date,
            },
        },
        "zone": { "id": zone.zone_id, "name": name },
    })
}

/// `GET /v2/bays.json?visit.plate.text=`
pub async fn search_bay(State(state): State<AppState>, Query(params): Query<BayParams>) -> Response {
    let plate = normalize_plate(params.plate.as_deref().unwrap_or_default());
    if plate.is_empty() {
        return failure(
            StatusCode::BAD_REQUEST,
            json!({ "error": "No visit plate provided.", "success": false, "code": -4 }),
        );
    }

    let car = match locate(state.catalog.as_ref(), &plate, false).await {
        Ok(Some(car)) => car,
        Ok(None) => {
            debug!("Bay search: {} is not present", plate);
            return no_data();
        }
        Err(e) => {
            warn!("Bay search for {} failed: {}", plate, e);
            return internal("Internal server error");
        }
    };

    let image = match state.catalog.zone_image(car.current_zone_id, LANGUAGE).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            warn!(
                "Zone {} has no {} map, bay search for {} is empty",
                car.current_zone_id, LANGUAGE, plate
            );
            return Json(Vec::<Value>::new()).into_response();
        }
        Err(e) => {
            warn!("Failed to load map of zone {}: {}", car.current_zone_id, e);
            return internal("Internal server error");
        }
    };

    let zone = match state.catalog.zone(car.current_zone_id).await {
        Ok(Some(zone)) => zone,
        Ok(None) => return no_data(),
        Err(e) => {
            warn!("Failed to load zone {}: {}", car.current_zone_id, e);
            return internal("Internal server error");
        }
    };

    info!("Bay search found {} in zone {}", plate, zone.zone_id);

    Json(bay(&car, &zone, &image, Utc::now())).into_response()
}

/// Zone id from `12`, `12.png` or `12.jpeg`
pub(crate) fn map_id(image_name: &str) -> Result<i32, Response> {
    let name = image_name.trim();
    let name = name
        .strip_suffix(".png")
        .or_else(|| name.strip_suffix(".jpeg"))
        .or_else(|| name.strip_suffix(".jpg"))
        .unwrap_or(name);

    if name.is_empty() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "message": "No image name provided", "code": 11 }),
        ));
    }

    name.parse().map_err(|_| {
        failure(
            StatusCode::BAD_REQUEST,
            json!({
                "error": "Invalid ID format",
                "message": "ID must be a valid integer",
                "code": 12,
            }),
        )
    })
}

/// `GET /v2/maps/:imagename`
pub async fn zone_map(State(state): State<AppState>, Path(image_name): Path<String>) -> Response {
    let zone_id = match map_id(&image_name) {
        Ok(zone_id) => zone_id,
        Err(response) => return response,
    };

    let image = match state.catalog.zone_image(zone_id, LANGUAGE).await {
        Ok(Some(image)) => image,
        Ok(None) => {
            return failure(
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "message": "Image not found for the specified ID",
                    "code": -4,
                }),
            )
        }
        Err(e) => {
            warn!("Failed to load map of zone {}: {}", zone_id, e);
            return internal("Internal server error");
        }
    };

    let size = match state.catalog.load_settings().await {
        Ok(settings) => ImageSize::from_setting(&settings.pka_image_size),
        Err(e) => {
            warn!("Failed to load settings, serving large map: {}", e);
            ImageSize::Large
        }
    };

    match decode_data_uri(image.sized(size)) {
        Ok((content_type, data)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type)],
            data,
        )
            .into_response(),
        Err(e) => {
            warn!("Map of zone {} cannot be decoded: {}", zone_id, e);
            internal("Image data is invalid.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    #[test]
    fn map_names() {
        assert_eq!(map_id("12").ok(), Some(12));
        assert_eq!(map_id("12.png").ok(), Some(12));
        assert_eq!(map_id("7.jpeg").ok(), Some(7));
        let rejected = |name: &str| map_id(name).err().map(|response| response.status());
        assert_eq!(rejected("abc.png"), Some(StatusCode::BAD_REQUEST));
        assert_eq!(rejected(".png"), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn dwell_is_clock_time() {
        let entry = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 23, 29, 8).unwrap();
        assert_eq!(dwell(entry, now), "15:29:08");
        assert_eq!(dwell(now, entry), "00:00:00");
    }

    #[test]
    fn bay_carries_plate_zone_and_position() {
        let entry = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let car = PresentCar {
            id: 31,
            lpn: "AB123CD".to_string(),
            camera_id: 1,
            current_zone_id: 5,
            last_zone_id: 4,
            direction: "forward".to_string(),
            confidence: 87,
            transaction_date: entry,
            car_details_id: None,
            extra: None,
        };
        let zone = Zone::new(
            5,
            BTreeMap::from([("en".to_string(), "Level -1".to_string())]),
            100,
            40,
        );
        let image = ZoneImage {
            id: 9,
            zone_id: 5,
            language: "en".to_string(),
            image_small: String::new(),
            image_large: String::new(),
            extra: Some(json!({ "x": 340.5, "y": 215.25 })),
            updated_at: entry,
        };

        let body = bay(&car, &zone, &image, entry);
        assert_eq!(body["id"], 9);
        assert_eq!(body["zone"]["name"], "Level -1");
        assert_eq!(body["map"]["id"], 5);
        assert_eq!(body["position"]["x"], 340.5);
        assert_eq!(body["visit"]["plate"]["confidence"], 87);
        assert_eq!(body["visit"]["plate"]["text"], "AB123CD");
        assert_eq!(body["visit"]["dwell"], "00:00:00");
    }
}
