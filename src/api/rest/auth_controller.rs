use crate::api::rest::{ApiResult, AppState};
use crate::db::models::user_models::{LoginCredentials, LoginResponse};
use axum::extract::State;
use axum::Json;

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, token) = state.auth_service.login(&credentials).await?;
    Ok(Json(LoginResponse { user, token }))
}
