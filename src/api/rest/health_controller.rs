use crate::api::rest::AppState;
use crate::db;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub pubsub: &'static str,
    pub zones: usize,
    pub cameras: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = db::health_check(&state.db_pool).await.unwrap_or(false);

    Json(HealthResponse {
        status: "ok",
        database,
        pubsub: state.signage.bus().name(),
        zones: state.registries.zones.len(),
        cameras: state.registries.cameras.len(),
    })
}
