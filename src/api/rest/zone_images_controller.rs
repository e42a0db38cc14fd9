use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::zone_image_models::{split_data_uri, ZoneImage, ZoneImageRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;

const MODULE: &str = "zoneimages";

fn language(lang: &str) -> Result<String, Error> {
    let lang = lang.trim().to_lowercase();
    if lang.is_empty() || lang.len() > 8 || !lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return Err(Error::Validation(format!("Invalid language code {}", lang)));
    }
    Ok(lang)
}

/// Both sizes must be PNG or JPEG data URIs
pub(crate) fn validate_images(request: &ZoneImageRequest) -> Result<(), Error> {
    split_data_uri(&request.image_small)?;
    split_data_uri(&request.image_large)?;
    Ok(())
}

async fn live_zone(state: &AppState, zone_id: i32) -> Result<(), anyhow::Error> {
    state
        .catalog
        .zone(zone_id)
        .await?
        .filter(|zone| zone.lifecycle.is_live())
        .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone_id)))?;
    Ok(())
}

pub async fn list_zone_images(
    State(state): State<AppState>,
    Path(zone_id): Path<i32>,
) -> ApiResult<Json<Vec<ZoneImage>>> {
    let images = state.catalog.zone_images(zone_id).await?;
    Ok(Json(images))
}

pub async fn get_zone_image(
    State(state): State<AppState>,
    Path((zone_id, lang)): Path<(i32, String)>,
) -> ApiResult<Json<ZoneImage>> {
    let lang = language(&lang)?;
    let image = state
        .catalog
        .zone_image(zone_id, &lang)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Zone {} has no {} image", zone_id, lang)))?;
    Ok(Json(image))
}

pub async fn save_zone_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((zone_id, lang)): Path<(i32, String)>,
    Json(request): Json<ZoneImageRequest>,
) -> ApiResult<Json<ZoneImage>> {
    let lang = language(&lang)?;
    validate_images(&request)?;
    live_zone(&state, zone_id).await?;

    let image = state.catalog.save_zone_image(zone_id, &lang, &request).await?;
    state
        .record_change(
            &claims,
            MODULE,
            "save",
            None,
            Some(serde_json::json!({ "zone_id": zone_id, "language": lang, "id": image.id })),
        )
        .await;

    info!("Image {} of zone {} saved", lang, zone_id);

    Ok(Json(image))
}

pub async fn delete_zone_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((zone_id, lang)): Path<(i32, String)>,
) -> ApiResult<StatusCode> {
    let lang = language(&lang)?;
    let before = state.catalog.zone_image(zone_id, &lang).await?;
    if !state.catalog.delete_zone_image(zone_id, &lang).await? {
        return Err(Error::NotFound(format!("Zone {} has no {} image", zone_id, lang)).into());
    }
    state
        .record_change(
            &claims,
            MODULE,
            "delete",
            before.as_ref().and_then(snapshot),
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes() {
        assert_eq!(language(" EN ").unwrap(), "en");
        assert_eq!(language("fr-ca").unwrap(), "fr-ca");
        assert!(language("").is_err());
        assert!(language("e1").is_err());
    }

    #[test]
    fn both_sizes_are_checked() {
        let request = ZoneImageRequest {
            image_small: "data:image/png;base64,iVBORw==".to_string(),
            image_large: "https://example.com/map.png".to_string(),
            extra: None,
        };
        assert!(matches!(validate_images(&request), Err(Error::Validation(_))));
    }
}
