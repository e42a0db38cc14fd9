use crate::api::rest::{ApiResult, AppState};
use crate::db::models::audit_models::{AuditQuery, UserAudit};
use crate::db::models::user_models::UserRole;
use crate::security::Claims;
use axum::extract::{Query, State};
use axum::{Extension, Json};

pub async fn list_audit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Vec<UserAudit>>> {
    state.security.require_role(&claims, UserRole::Admin)?;
    let entries = state.catalog.audit_entries(&query).await?;
    Ok(Json(entries))
}
