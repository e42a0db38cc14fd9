use crate::{
    db::models::car_detail_models::{CarDetail, NewCarDetail},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: i64 = 100;

/// Car details repository
#[derive(Clone)]
pub struct CarDetailsRepository {
    pool: Arc<PgPool>,
}

impl CarDetailsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Store the camera payload and pictures, returning the new id
    pub async fn create(&self, detail: &NewCarDetail) -> Result<i64> {
        let plate = detail.plate_image.as_ref();
        let scene = detail.scene_image.as_ref();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO car_details (cam_body, plate_image, plate_image_type, scene_image,
                                     scene_image_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&detail.cam_body)
        .bind(plate.map(|picture| picture.data.as_slice()))
        .bind(plate.map(|picture| picture.content_type.as_str()))
        .bind(scene.map(|picture| picture.data.as_slice()))
        .bind(scene.map(|picture| picture.content_type.as_str()))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create car detail: {}", e)))?;

        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CarDetail>> {
        let result = sqlx::query_as::<_, CarDetail>(
            r#"
            SELECT id, cam_body, plate_image, plate_image_type, scene_image, scene_image_type,
                   extra, created_at
            FROM car_details
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get car detail {}: {}", id, e)))?;

        Ok(result)
    }

    /// Newest first, without the picture bytes
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<CarDetail>> {
        let result = sqlx::query_as::<_, CarDetail>(
            r#"
            SELECT id, cam_body, NULL::BYTEA AS plate_image, plate_image_type,
                   NULL::BYTEA AS scene_image, scene_image_type, extra, created_at
            FROM car_details
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list car details: {}", e)))?;

        Ok(result)
    }

    /// Present cars and history rows pointing at it lose the link
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM car_details WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete car detail {}: {}", id, e)))?;

        Ok(result.rows_affected() > 0)
    }
}
