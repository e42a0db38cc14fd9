use crate::api::rest::{ApiResult, AppState};
use crate::counting::capture::normalize_plate;
use crate::db::models::client_models::ClientCredentials;
use crate::db::models::present_car_models::PresentCar;
use crate::db::models::user_models::AuthToken;
use crate::db::models::zone_models::ZoneOccupancy;
use crate::db::catalog::CatalogStore;
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

const FUZZY_CANDIDATES: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct FindCarParams {
    pub lpn: String,
}

#[derive(Debug, Serialize)]
pub struct FoundCar {
    pub license_plate: String,
    pub zone_id: i32,
    pub zone_name: Option<String>,
    pub last_seen: DateTime<Utc>,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Json(credentials): Json<ClientCredentials>,
) -> ApiResult<Json<AuthToken>> {
    let token = state.auth_service.client_token(&credentials).await?;
    Ok(Json(token))
}

pub async fn list_zones(State(state): State<AppState>) -> ApiResult<Json<Vec<ZoneOccupancy>>> {
    let zones = state.catalog.zones(false).await?;
    Ok(Json(zones.iter().map(ZoneOccupancy::from).collect()))
}

/// Exact match wins; otherwise the most recently seen candidate
pub(crate) fn best_match(plate: &str, candidates: Vec<PresentCar>) -> Option<PresentCar> {
    let exact = candidates.iter().position(|car| car.lpn == plate);
    let mut candidates = candidates;
    match exact {
        Some(index) => Some(candidates.swap_remove(index)),
        None => candidates.into_iter().max_by_key(|car| car.transaction_date),
    }
}

/// Present car for a normalised plate. Fuzzy lookups match plate fragments.
pub(crate) async fn locate(
    catalog: &dyn CatalogStore,
    plate: &str,
    fuzzy: bool,
) -> anyhow::Result<Option<PresentCar>> {
    if fuzzy {
        Ok(best_match(
            plate,
            catalog.search_present_cars(plate, FUZZY_CANDIDATES).await?,
        ))
    } else {
        catalog.present_car(plate).await
    }
}

pub async fn find_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<FindCarParams>,
) -> ApiResult<Json<FoundCar>> {
    let plate = normalize_plate(&params.lpn);
    if plate.is_empty() {
        return Err(Error::Validation("lpn must not be empty".to_string()).into());
    }

    let car = locate(state.catalog.as_ref(), &plate, claims.fuzzy)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Plate {} is not in the car park", plate)))?;

    let lang = state.catalog.load_settings().await?.default_lang;
    let zone_name = state
        .catalog
        .zone(car.current_zone_id)
        .await?
        .and_then(|zone| zone.display_name(&lang).map(str::to_string));

    debug!(
        "Client {} located {} in zone {}",
        claims.sub, car.lpn, car.current_zone_id
    );

    Ok(Json(FoundCar {
        license_plate: car.lpn,
        zone_id: car.current_zone_id,
        zone_name,
        last_seen: car.transaction_date,
    }))
}
