use crate::{db::models::zone_image_models::ZoneImage, error::Error};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

/// Zone map pictures, one per zone and language
#[derive(Clone)]
pub struct ZoneImagesRepository {
    pool: Arc<PgPool>,
}

impl ZoneImagesRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn get_by_zone(&self, zone_id: i32) -> Result<Vec<ZoneImage>> {
        let result = sqlx::query_as::<_, ZoneImage>(
            r#"
            SELECT id, zone_id, language, image_small, image_large, extra, updated_at
            FROM zone_images
            WHERE zone_id = $1
            ORDER BY language
            "#,
        )
        .bind(zone_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list images of zone {}: {}", zone_id, e)))?;

        Ok(result)
    }

    pub async fn get(&self, zone_id: i32, language: &str) -> Result<Option<ZoneImage>> {
        let result = sqlx::query_as::<_, ZoneImage>(
            r#"
            SELECT id, zone_id, language, image_small, image_large, extra, updated_at
            FROM zone_images
            WHERE zone_id = $1 AND language = $2
            "#,
        )
        .bind(zone_id)
        .bind(language)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get image of zone {}: {}", zone_id, e)))?;

        Ok(result)
    }

    /// Insert or replace the picture for `(zone_id, language)`
    pub async fn upsert(
        &self,
        zone_id: i32,
        language: &str,
        image_small: &str,
        image_large: &str,
        extra: Option<&serde_json::Value>,
    ) -> Result<ZoneImage> {
        let result = sqlx::query_as::<_, ZoneImage>(
            r#"
            INSERT INTO zone_images (zone_id, language, image_small, image_large, extra, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (zone_id, language) DO UPDATE
            SET image_small = EXCLUDED.image_small,
                image_large = EXCLUDED.image_large,
                extra = EXCLUDED.extra,
                updated_at = EXCLUDED.updated_at
            RETURNING id, zone_id, language, image_small, image_large, extra, updated_at
            "#,
        )
        .bind(zone_id)
        .bind(language)
        .bind(image_small)
        .bind(image_large)
        .bind(extra)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to save image of zone {}: {}", zone_id, e)))?;

        Ok(result)
    }

    pub async fn delete(&self, zone_id: i32, language: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM zone_images WHERE zone_id = $1 AND language = $2")
            .bind(zone_id)
            .bind(language)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                Error::Database(format!("Failed to delete image of zone {}: {}", zone_id, e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
