use crate::api::rest::{ApiResult, AppState};
use crate::counting::capture::normalize_plate;
use crate::db::models::present_car_models::{HistoryQuery, PresentCarHistory};
use crate::error::Error;
use axum::extract::{Query, State};
use axum::Json;

pub async fn search_history(
    State(state): State<AppState>,
    Query(mut query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<PresentCarHistory>>> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(Error::Validation("'from' must not be after 'to'".to_string()).into());
        }
    }
    query.lpn = query.lpn.as_deref().map(normalize_plate);

    let rows = state.catalog.search_history(&query).await?;
    Ok(Json(rows))
}
