use crate::api::rest::zones_controller::{validate_status, ListParams};
use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::sign_models::{CreateSignRequest, Sign, UpdateSignRequest};
use crate::db::models::{Lifecycle, LifecycleRequest};
use crate::error::Error;
use crate::messaging::SignUpdate;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;

const MODULE: &str = "signs";

/// One live sign per zone, and the zone must exist
async fn validate_sign(state: &AppState, sign: &Sign) -> Result<(), anyhow::Error> {
    if sign.sign_ip.trim().is_empty() {
        return Err(Error::Validation("sign_ip must not be empty".to_string()).into());
    }

    if !state.registries.zones.contains(sign.zone_id) {
        return Err(Error::Validation(format!("Zone {} does not exist", sign.zone_id)).into());
    }

    if let Some(other) = state.catalog.live_sign_for_zone(sign.zone_id).await? {
        if other.sign_id != sign.sign_id {
            return Err(Error::AlreadyExists(format!(
                "Zone {} already has sign {}",
                sign.zone_id, other.sign_id
            ))
            .into());
        }
    }

    Ok(())
}

pub async fn list_signs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Sign>>> {
    let signs = state.catalog.signs(params.include_deleted).await?;
    Ok(Json(signs))
}

pub async fn get_sign(
    State(state): State<AppState>,
    Path(sign_id): Path<i32>,
) -> ApiResult<Json<Sign>> {
    let sign = state
        .catalog
        .sign(sign_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Sign {} not found", sign_id)))?;
    Ok(Json(sign))
}

pub async fn create_sign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateSignRequest>,
) -> ApiResult<(StatusCode, Json<Sign>)> {
    let sign = Sign::from(request);
    validate_sign(&state, &sign).await?;

    let sign = state.catalog.create_sign(&sign).await?;
    state
        .record_change(&claims, MODULE, "create", None, snapshot(&sign))
        .await;

    info!(
        "Sign {} at {} serves zone {}",
        sign.sign_id,
        sign.address(),
        sign.zone_id
    );

    Ok((StatusCode::CREATED, Json(sign)))
}

pub async fn update_sign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(sign_id): Path<i32>,
    Json(request): Json<UpdateSignRequest>,
) -> ApiResult<Json<Sign>> {
    let before = state
        .catalog
        .sign(sign_id)
        .await?
        .filter(|sign| sign.lifecycle.is_live())
        .ok_or_else(|| Error::NotFound(format!("Sign {} not found", sign_id)))?;

    let mut sign = before.clone();
    sign.apply(request);
    validate_sign(&state, &sign).await?;

    let sign = state.catalog.update_sign(&sign).await?;
    state
        .record_change(&claims, MODULE, "update", snapshot(&before), snapshot(&sign))
        .await;
    Ok(Json(sign))
}

pub async fn set_sign_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(sign_id): Path<i32>,
    Json(request): Json<LifecycleRequest>,
) -> ApiResult<Json<Sign>> {
    let lifecycle = validate_status(&request)?;

    if !state.catalog.set_sign_lifecycle(sign_id, lifecycle).await? {
        return Err(Error::NotFound(format!("Sign {} not found", sign_id)).into());
    }

    let sign = state
        .catalog
        .sign(sign_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Sign {} not found", sign_id)))?;
    state
        .record_change(&claims, MODULE, "status", None, snapshot(&sign))
        .await;
    Ok(Json(sign))
}

pub async fn delete_sign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(sign_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let before = state.catalog.sign(sign_id).await?;
    if !state
        .catalog
        .set_sign_lifecycle(sign_id, Lifecycle::Deleted)
        .await?
    {
        return Err(Error::NotFound(format!("Sign {} not found", sign_id)).into());
    }
    state
        .record_change(&claims, MODULE, "delete", before.as_ref().and_then(snapshot), None)
        .await;

    info!("Sign {} deleted", sign_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Send the zone's current free capacity to the sign again
pub async fn push_sign(
    State(state): State<AppState>,
    Path(sign_id): Path<i32>,
) -> ApiResult<Json<SignUpdate>> {
    let sign = state
        .catalog
        .sign(sign_id)
        .await?
        .filter(|sign| sign.lifecycle == Lifecycle::Active)
        .ok_or_else(|| Error::NotFound(format!("Active sign {} not found", sign_id)))?;

    let free_capacity = state
        .catalog
        .zone_free_capacity(sign.zone_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Active zone {} not found", sign.zone_id)))?;

    let update = state.signage.push(&sign, free_capacity).await?;
    Ok(Json(update))
}
