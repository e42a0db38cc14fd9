use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::zone_models::{CreateZoneRequest, UpdateZoneRequest, Zone};
use crate::db::models::{Lifecycle, LifecycleRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;
use serde::Deserialize;

const MODULE: &str = "zones";

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_deleted: bool,
}

pub(crate) fn validate_capacity(max_capacity: i32, free_capacity: i32) -> Result<(), Error> {
    if max_capacity < 0 {
        return Err(Error::Validation(format!(
            "max_capacity must not be negative, got {}",
            max_capacity
        )));
    }
    if free_capacity < 0 || free_capacity > max_capacity {
        return Err(Error::Validation(format!(
            "free_capacity must be between 0 and {}, got {}",
            max_capacity, free_capacity
        )));
    }
    Ok(())
}

/// A lifecycle change through `/status` may only toggle between active and disabled
pub(crate) fn validate_status(request: &LifecycleRequest) -> Result<Lifecycle, Error> {
    match request.lifecycle {
        Lifecycle::Deleted => Err(Error::Validation(
            "use DELETE to remove an entry".to_string(),
        )),
        lifecycle => Ok(lifecycle),
    }
}

pub async fn list_zones(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Zone>>> {
    let zones = state.catalog.zones(params.include_deleted).await?;
    Ok(Json(zones))
}

pub async fn get_zone(
    State(state): State<AppState>,
    Path(zone_id): Path<i32>,
) -> ApiResult<Json<Zone>> {
    let zone = state
        .catalog
        .zone(zone_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone_id)))?;
    Ok(Json(zone))
}

pub async fn create_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateZoneRequest>,
) -> ApiResult<(StatusCode, Json<Zone>)> {
    let free_capacity = request.free_capacity.unwrap_or(request.max_capacity);
    validate_capacity(request.max_capacity, free_capacity)?;

    let mut zone = Zone::new(
        request.zone_id,
        request.name,
        request.max_capacity,
        free_capacity,
    );
    zone.extra = request.extra;

    // a duplicate id comes back from the store as AlreadyExists
    let zone = state.catalog.create_zone(&zone).await?;
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "create", None, snapshot(&zone))
        .await;

    Ok((StatusCode::CREATED, Json(zone)))
}

pub async fn update_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(zone_id): Path<i32>,
    Json(request): Json<UpdateZoneRequest>,
) -> ApiResult<Json<Zone>> {
    let before = state
        .catalog
        .zone(zone_id)
        .await?
        .filter(|zone| zone.lifecycle.is_live())
        .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone_id)))?;

    let mut zone = before.clone();
    if let Some(name) = request.name {
        zone.name.0 = name;
    }
    if let Some(max_capacity) = request.max_capacity {
        zone.max_capacity = max_capacity;
    }
    if request.extra.is_some() {
        zone.extra = request.extra;
    }
    match request.free_capacity {
        Some(free_capacity) => validate_capacity(zone.max_capacity, free_capacity)?,
        None => validate_capacity(zone.max_capacity, 0)?,
    }

    let zone = state
        .catalog
        .update_zone(&zone, request.free_capacity)
        .await?;
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "update", snapshot(&before), snapshot(&zone))
        .await;

    info!(
        "Zone {} updated: max {} free {}",
        zone.zone_id, zone.max_capacity, zone.free_capacity
    );

    Ok(Json(zone))
}

pub async fn set_zone_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(zone_id): Path<i32>,
    Json(request): Json<LifecycleRequest>,
) -> ApiResult<Json<Zone>> {
    let lifecycle = validate_status(&request)?;

    if !state.catalog.set_zone_lifecycle(zone_id, lifecycle).await? {
        return Err(Error::NotFound(format!("Zone {} not found", zone_id)).into());
    }
    state.reload_registries().await?;

    let zone = state
        .catalog
        .zone(zone_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone_id)))?;
    state
        .record_change(&claims, MODULE, "status", None, snapshot(&zone))
        .await;
    Ok(Json(zone))
}

pub async fn delete_zone(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(zone_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let references = state.catalog.zone_references(zone_id).await?;
    if references > 0 {
        return Err(Error::AlreadyExists(format!(
            "Zone {} is still used by {} cameras or signs",
            zone_id, references
        ))
        .into());
    }

    let before = state.catalog.zone(zone_id).await?;
    if !state
        .catalog
        .set_zone_lifecycle(zone_id, Lifecycle::Deleted)
        .await?
    {
        return Err(Error::NotFound(format!("Zone {} not found", zone_id)).into());
    }
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "delete", before.as_ref().and_then(snapshot), None)
        .await;

    info!("Zone {} deleted", zone_id);

    Ok(StatusCode::NO_CONTENT)
}
