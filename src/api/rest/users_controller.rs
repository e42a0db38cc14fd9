use crate::api::rest::zones_controller::validate_status;
use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::user_models::{CreateUserRequest, UpdateUserRequest, User, UserRole};
use crate::db::models::{Lifecycle, LifecycleRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

const MODULE: &str = "users";

#[derive(Debug, Serialize)]
pub struct PasswordResetResponse {
    pub username: String,
    pub password: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<User>>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let users = state.auth_service.list_users().await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let user = state.auth_service.user(&username).await?;
    Ok(Json(user))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let user = state.auth_service.register(&request).await?;
    state
        .record_change(&claims, MODULE, "create", None, snapshot(&user))
        .await;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let before = state.auth_service.user(&username).await?;
    let user = state.auth_service.update_user(&username, request).await?;
    state
        .record_change(&claims, MODULE, "update", snapshot(&before), snapshot(&user))
        .await;
    Ok(Json(user))
}

pub async fn set_user_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Json(request): Json<LifecycleRequest>,
) -> ApiResult<Json<User>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let lifecycle = validate_status(&request)?;
    if username == claims.sub && lifecycle != Lifecycle::Active {
        return Err(Error::Validation("You cannot disable your own account".to_string()).into());
    }

    let user = state.auth_service.set_lifecycle(&username, lifecycle).await?;
    state
        .record_change(&claims, MODULE, "status", None, snapshot(&user))
        .await;
    Ok(Json(user))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> ApiResult<Json<PasswordResetResponse>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let password = state.auth_service.reset_password(&username).await?;
    state
        .record_change(
            &claims,
            MODULE,
            "reset-password",
            None,
            Some(serde_json::json!({ "username": username })),
        )
        .await;
    Ok(Json(PasswordResetResponse { username, password }))
}

/// Soft delete; the username stays reserved
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.security.require_role(&claims, UserRole::Admin)?;
    if username == claims.sub {
        return Err(Error::Validation("You cannot delete your own account".to_string()).into());
    }

    let user = state
        .auth_service
        .set_lifecycle(&username, Lifecycle::Deleted)
        .await?;
    state
        .record_change(&claims, MODULE, "delete", snapshot(&user), None)
        .await;
    Ok(StatusCode::NO_CONTENT)
}
