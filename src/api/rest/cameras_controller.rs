use crate::api::rest::zones_controller::{validate_status, ListParams};
use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::camera_models::{Camera, CreateCameraRequest, UpdateCameraRequest};
use crate::db::models::{Lifecycle, LifecycleRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use log::info;

const MODULE: &str = "cameras";

/// Both zones must be known and the address must not belong to another live camera
async fn validate_camera(state: &AppState, camera: &Camera) -> Result<(), anyhow::Error> {
    if camera.cam_ip.trim().is_empty() {
        return Err(Error::Validation("cam_ip must not be empty".to_string()).into());
    }

    for zone_id in [camera.zone_in_id, camera.zone_out_id] {
        if !state.registries.zones.contains(zone_id) {
            return Err(Error::Validation(format!("Zone {} does not exist", zone_id)).into());
        }
    }

    if let Some(other) = state.catalog.live_camera_by_ip(&camera.cam_ip).await? {
        if other.cam_id != camera.cam_id {
            return Err(Error::AlreadyExists(format!(
                "Address {} is already used by camera {}",
                camera.cam_ip, other.cam_id
            ))
            .into());
        }
    }

    Ok(())
}

pub async fn list_cameras(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Camera>>> {
    let cameras = state.catalog.cameras(params.include_deleted).await?;
    Ok(Json(cameras))
}

pub async fn get_camera(
    State(state): State<AppState>,
    Path(cam_id): Path<i32>,
) -> ApiResult<Json<Camera>> {
    let camera = state
        .catalog
        .camera(cam_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Camera {} not found", cam_id)))?;
    Ok(Json(camera))
}

pub async fn create_camera(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateCameraRequest>,
) -> ApiResult<(StatusCode, Json<Camera>)> {
    let camera = Camera::from(request);
    validate_camera(&state, &camera).await?;

    let camera = state.catalog.create_camera(&camera).await?;
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "create", None, snapshot(&camera))
        .await;

    info!(
        "Camera {} at {} counts zone {} -> {}",
        camera.cam_id, camera.cam_ip, camera.zone_out_id, camera.zone_in_id
    );

    Ok((StatusCode::CREATED, Json(camera)))
}

pub async fn update_camera(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cam_id): Path<i32>,
    Json(request): Json<UpdateCameraRequest>,
) -> ApiResult<Json<Camera>> {
    let before = state
        .catalog
        .camera(cam_id)
        .await?
        .filter(|camera| camera.lifecycle.is_live())
        .ok_or_else(|| Error::NotFound(format!("Camera {} not found", cam_id)))?;

    let mut camera = before.clone();
    camera.apply(request);
    validate_camera(&state, &camera).await?;

    let camera = state.catalog.update_camera(&camera).await?;
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "update", snapshot(&before), snapshot(&camera))
        .await;

    Ok(Json(camera))
}

pub async fn set_camera_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cam_id): Path<i32>,
    Json(request): Json<LifecycleRequest>,
) -> ApiResult<Json<Camera>> {
    let lifecycle = validate_status(&request)?;

    if !state.catalog.set_camera_lifecycle(cam_id, lifecycle).await? {
        return Err(Error::NotFound(format!("Camera {} not found", cam_id)).into());
    }
    state.reload_registries().await?;

    let camera = state
        .catalog
        .camera(cam_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Camera {} not found", cam_id)))?;
    state
        .record_change(&claims, MODULE, "status", None, snapshot(&camera))
        .await;
    Ok(Json(camera))
}

pub async fn delete_camera(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cam_id): Path<i32>,
) -> ApiResult<StatusCode> {
    let before = state.catalog.camera(cam_id).await?;
    if !state
        .catalog
        .set_camera_lifecycle(cam_id, Lifecycle::Deleted)
        .await?
    {
        return Err(Error::NotFound(format!("Camera {} not found", cam_id)).into());
    }
    state.reload_registries().await?;
    state
        .record_change(&claims, MODULE, "delete", before.as_ref().and_then(snapshot), None)
        .await;

    info!("Camera {} deleted", cam_id);

    Ok(StatusCode::NO_CONTENT)
}
