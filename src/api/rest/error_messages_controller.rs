use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::error_message_models::{ErrorMessage, ErrorMessageRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MODULE: &str = "errors";

#[derive(Debug, Default, Deserialize)]
pub struct LangParams {
    pub lang: Option<String>,
}

/// One code, optionally narrowed to a single language
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorMessageView {
    Full(ErrorMessage),
    Text { code: i32, lang: String, message: String },
}

pub async fn list_error_messages(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ErrorMessage>>> {
    let messages = state.catalog.error_messages().await?;
    Ok(Json(messages))
}

pub async fn get_error_message(
    State(state): State<AppState>,
    Path(code): Path<i32>,
    Query(params): Query<LangParams>,
) -> ApiResult<Json<ErrorMessageView>> {
    let message = state
        .catalog
        .error_message(code)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Error code {} not found", code)))?;

    let lang = match params.lang {
        Some(lang) => lang.trim().to_lowercase(),
        None => return Ok(Json(ErrorMessageView::Full(message))),
    };
    let text = message
        .text(&lang)
        .ok_or_else(|| Error::NotFound(format!("Error code {} has no text", code)))?
        .to_string();

    Ok(Json(ErrorMessageView::Text {
        code,
        lang,
        message: text,
    }))
}

pub async fn save_error_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<i32>,
    Json(request): Json<ErrorMessageRequest>,
) -> ApiResult<Json<ErrorMessage>> {
    if request.messages.is_empty() {
        return Err(Error::Validation("messages must not be empty".to_string()).into());
    }
    let messages: BTreeMap<String, String> = request
        .messages
        .into_iter()
        .map(|(lang, text)| (lang.trim().to_lowercase(), text))
        .collect();

    let before = state.catalog.error_message(code).await?;
    let message = state.catalog.merge_error_message(code, &messages).await?;
    state
        .record_change(
            &claims,
            MODULE,
            "save",
            before.as_ref().and_then(snapshot),
            snapshot(&message),
        )
        .await;

    Ok(Json(message))
}

pub async fn delete_error_language(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((code, lang)): Path<(i32, String)>,
) -> ApiResult<Json<ErrorMessage>> {
    let lang = lang.trim().to_lowercase();
    let message = state
        .catalog
        .remove_error_language(code, &lang)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Error code {} not found", code)))?;
    state
        .record_change(&claims, MODULE, "delete-language", None, snapshot(&message))
        .await;
    Ok(Json(message))
}
