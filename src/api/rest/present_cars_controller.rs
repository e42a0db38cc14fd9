use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::counting::capture::normalize_plate;
use crate::db::models::present_car_models::{PresentCar, PresentCarQuery};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;

pub async fn list_present_cars(
    State(state): State<AppState>,
    Query(mut query): Query<PresentCarQuery>,
) -> ApiResult<Json<Vec<PresentCar>>> {
    query.lpn = query.lpn.as_deref().map(normalize_plate);
    let cars = state.catalog.present_cars(&query).await?;
    Ok(Json(cars))
}

pub async fn get_present_car(
    State(state): State<AppState>,
    Path(lpn): Path<String>,
) -> ApiResult<Json<PresentCar>> {
    let lpn = normalize_plate(&lpn);
    let car = state
        .catalog
        .present_car(&lpn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Plate {} is not present", lpn)))?;
    Ok(Json(car))
}

/// Administrative removal; zone counters are left alone
pub async fn delete_present_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(lpn): Path<String>,
) -> ApiResult<StatusCode> {
    let lpn = normalize_plate(&lpn);
    let before = state.catalog.present_car(&lpn).await?;
    if !state.catalog.delete_present_car(&lpn).await? {
        return Err(Error::NotFound(format!("Plate {} is not present", lpn)).into());
    }
    state
        .record_change(
            &claims,
            "presentcars",
            "delete",
            before.as_ref().and_then(snapshot),
            None,
        )
        .await;

    info!("Present car {} removed by an operator", lpn);

    Ok(StatusCode::NO_CONTENT)
}
