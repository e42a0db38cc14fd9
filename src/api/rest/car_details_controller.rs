use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::car_detail_models::{CarDetail, PictureKind};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use log::info;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CarDetailParams {
    pub limit: Option<i64>,
}

pub async fn list_car_details(
    State(state): State<AppState>,
    Query(params): Query<CarDetailParams>,
) -> ApiResult<Json<Vec<CarDetail>>> {
    let details = state.catalog.car_details(params.limit).await?;
    Ok(Json(details))
}

pub async fn get_car_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CarDetail>> {
    let detail = state
        .catalog
        .car_detail(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Car detail {} not found", id)))?;
    Ok(Json(detail))
}

/// Raw plate or scene picture
pub async fn get_car_picture(
    State(state): State<AppState>,
    Path((id, picture)): Path<(i64, String)>,
) -> ApiResult<Response> {
    let kind = PictureKind::parse(&picture).ok_or_else(|| {
        Error::Validation(format!("Picture must be plate or scene, got {}", picture))
    })?;

    let detail = state
        .catalog
        .car_detail(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Car detail {} not found", id)))?;
    let (data, content_type) = detail
        .picture(kind)
        .ok_or_else(|| Error::NotFound(format!("Car detail {} has no {} picture", id, picture)))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type.to_string())],
        data.to_vec(),
    )
        .into_response())
}

pub async fn delete_car_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let before = state.catalog.car_detail(id).await?;
    if !state.catalog.delete_car_detail(id).await? {
        return Err(Error::NotFound(format!("Car detail {} not found", id)).into());
    }
    state
        .record_change(
            &claims,
            "cardetails",
            "delete",
            before.as_ref().and_then(snapshot),
            None,
        )
        .await;

    info!("Car detail {} deleted", id);

    Ok(StatusCode::NO_CONTENT)
}
