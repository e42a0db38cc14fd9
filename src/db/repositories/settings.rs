use crate::{db::models::settings_models::Settings, error::Error};
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;

/// Settings repository. The table holds a single row.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: Arc<PgPool>,
}

impl SettingsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Current settings, defaults when the row is missing
    pub async fn get(&self) -> Result<Settings> {
        let result = sqlx::query_as::<_, Settings>(
            r#"
            SELECT carpark_id, carpark_name, default_lang, present_car_reset_enabled,
                   present_car_reset_hour, counting_maintenance_enabled, counting_maintenance_hour,
                   pka_image_size, updated_at
            FROM settings
            ORDER BY carpark_id
            LIMIT 1
            "#,
        )
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get settings: {}", e)))?;

        Ok(result.unwrap_or_default())
    }

    /// Store settings
    pub async fn save(&self, settings: &Settings) -> Result<Settings> {
        let result = sqlx::query_as::<_, Settings>(
            r#"
            INSERT INTO settings (carpark_id, carpark_name, default_lang, present_car_reset_enabled,
                                  present_car_reset_hour, counting_maintenance_enabled,
                                  counting_maintenance_hour, pka_image_size, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (carpark_id) DO UPDATE
            SET carpark_name = EXCLUDED.carpark_name,
                default_lang = EXCLUDED.default_lang,
                present_car_reset_enabled = EXCLUDED.present_car_reset_enabled,
                present_car_reset_hour = EXCLUDED.present_car_reset_hour,
                counting_maintenance_enabled = EXCLUDED.counting_maintenance_enabled,
                counting_maintenance_hour = EXCLUDED.counting_maintenance_hour,
                pka_image_size = EXCLUDED.pka_image_size,
                updated_at = EXCLUDED.updated_at
            RETURNING carpark_id, carpark_name, default_lang, present_car_reset_enabled,
                      present_car_reset_hour, counting_maintenance_enabled,
                      counting_maintenance_hour, pka_image_size, updated_at
            "#,
        )
        .bind(settings.carpark_id)
        .bind(&settings.carpark_name)
        .bind(&settings.default_lang)
        .bind(settings.present_car_reset_enabled)
        .bind(settings.present_car_reset_hour)
        .bind(settings.counting_maintenance_enabled)
        .bind(settings.counting_maintenance_hour)
        .bind(&settings.pka_image_size)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to save settings: {}", e)))?;

        Ok(result)
    }
}
