use crate::api::rest::{snapshot, ApiResult, AppState};
use crate::db::models::settings_models::{Settings, UpdateSettingsRequest};
use crate::error::Error;
use crate::security::Claims;
use axum::extract::State;
use axum::{Extension, Json};
use log::info;
use sqlx::types::Json as JsonColumn;

fn validate_hour(field: &str, hour: i32) -> Result<i32, Error> {
    if (0..=23).contains(&hour) {
        Ok(hour)
    } else {
        Err(Error::Validation(format!(
            "{} must be between 0 and 23, got {}",
            field, hour
        )))
    }
}

/// Merge an update into the stored settings
pub(crate) fn merge(mut settings: Settings, update: UpdateSettingsRequest) -> Result<Settings, Error> {
    if let Some(name) = update.carpark_name {
        settings.carpark_name = JsonColumn(name);
    }
    if let Some(lang) = update.default_lang {
        if lang.trim().is_empty() {
            return Err(Error::Validation("default_lang must not be empty".to_string()));
        }
        settings.default_lang = lang.trim().to_lowercase();
    }
    if let Some(enabled) = update.present_car_reset_enabled {
        settings.present_car_reset_enabled = enabled;
    }
    if let Some(hour) = update.present_car_reset_hour {
        settings.present_car_reset_hour = validate_hour("present_car_reset_hour", hour)?;
    }
    if let Some(enabled) = update.counting_maintenance_enabled {
        settings.counting_maintenance_enabled = enabled;
    }
    if let Some(hour) = update.counting_maintenance_hour {
        settings.counting_maintenance_hour = validate_hour("counting_maintenance_hour", hour)?;
    }
    if let Some(size) = update.pka_image_size {
        let size = size.trim().to_lowercase();
        if size != "small" && size != "large" {
            return Err(Error::Validation(format!(
                "pka_image_size must be small or large, got {}",
                size
            )));
        }
        settings.pka_image_size = size;
    }
    Ok(settings)
}

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    let settings = state.catalog.load_settings().await?;
    Ok(Json(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<Settings>> {
    let before = state.catalog.load_settings().await?;
    let settings = merge(before.clone(), request)?;
    let settings = state.catalog.save_settings(&settings).await?;
    state
        .record_change(&claims, "settings", "update", snapshot(&before), snapshot(&settings))
        .await;

    info!(
        "Settings updated: reset {}@{}h, maintenance {}@{}h",
        settings.present_car_reset_enabled,
        settings.present_car_reset_hour,
        settings.counting_maintenance_enabled,
        settings.counting_maintenance_hour
    );

    Ok(Json(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_unset_fields() {
        let settings = merge(
            Settings::default(),
            UpdateSettingsRequest {
                present_car_reset_enabled: Some(true),
                present_car_reset_hour: Some(0),
                default_lang: Some(" FR ".to_string()),
                ..UpdateSettingsRequest::default()
            },
        )
        .unwrap();

        assert!(settings.present_car_reset_enabled);
        assert_eq!(settings.present_car_reset_hour, 0);
        assert_eq!(settings.default_lang, "fr");
        assert!(!settings.counting_maintenance_enabled);
        assert_eq!(settings.counting_maintenance_hour, 4);
    }

    #[test]
    fn pka_image_size_is_small_or_large() {
        let settings = merge(
            Settings::default(),
            UpdateSettingsRequest {
                pka_image_size: Some("Small".to_string()),
                ..UpdateSettingsRequest::default()
            },
        )
        .unwrap();
        assert_eq!(settings.pka_image_size, "small");

        let result = merge(
            Settings::default(),
            UpdateSettingsRequest {
                pka_image_size: Some("huge".to_string()),
                ..UpdateSettingsRequest::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn hours_outside_the_day_are_rejected() {
        for hour in [-1, 24] {
            let result = merge(
                Settings::default(),
                UpdateSettingsRequest {
                    counting_maintenance_hour: Some(hour),
                    ..UpdateSettingsRequest::default()
                },
            );
            assert!(matches!(result, Err(Error::Validation(_))));
        }
    }
}
