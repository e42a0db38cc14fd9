use crate::api::rest::{ApiResult, AppState};
use crate::db::models::client_models::{ApiClient, CreateClientRequest, CreatedClient};
use crate::db::models::user_models::UserRole;
use crate::security::Claims;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ApiClient>>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let clients = state.auth_service.list_clients().await?;
    Ok(Json(clients))
}

/// The generated secret is part of this response only
pub async fn create_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<CreatedClient>)> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let created = state.auth_service.create_client(&request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(client_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.security.require_role(&claims, UserRole::Admin)?;
    state.auth_service.delete_client(&client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
