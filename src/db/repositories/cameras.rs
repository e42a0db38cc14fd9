use crate::{
    db::models::{camera_models::Camera, Lifecycle},
    error::Error,
};
use crate::db::repositories::map_insert_error;
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Cameras repository
#[derive(Clone)]
pub struct CamerasRepository {
    pool: Arc<PgPool>,
}

impl CamerasRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a new camera
    pub async fn create(&self, camera: &Camera) -> Result<Camera> {
        info!("Creating camera {} at {}", camera.cam_id, camera.cam_ip);

        let result = sqlx::query_as::<_, Camera>(
            r#"
            INSERT INTO cameras (cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                                 zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                      zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            "#,
        )
        .bind(camera.cam_id)
        .bind(&camera.cam_name)
        .bind(&camera.cam_type)
        .bind(&camera.cam_ip)
        .bind(camera.cam_port)
        .bind(&camera.cam_user)
        .bind(&camera.cam_password)
        .bind(camera.zone_in_id)
        .bind(camera.zone_out_id)
        .bind(&camera.direction_hint)
        .bind(camera.lifecycle)
        .bind(camera.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("Camera {}", camera.cam_id)))?;

        Ok(result)
    }

    /// Get camera by ID, deleted cameras included
    pub async fn get_by_id(&self, cam_id: i32) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                   zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            FROM cameras
            WHERE cam_id = $1
            "#,
        )
        .bind(cam_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get camera by ID: {}", e)))?;

        Ok(result)
    }

    /// Live camera registered at the given address
    pub async fn get_by_ip(&self, cam_ip: &str) -> Result<Option<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                   zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            FROM cameras
            WHERE cam_ip = $1 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(cam_ip)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get camera by address: {}", e)))?;

        Ok(result)
    }

    /// List cameras
    pub async fn get_all(&self, include_deleted: bool) -> Result<Vec<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                   zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            FROM cameras
            WHERE $1 OR lifecycle <> 'deleted'
            ORDER BY cam_id
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list cameras: {}", e)))?;

        Ok(result)
    }

    /// Cameras whose captures are counted
    pub async fn get_active(&self) -> Result<Vec<Camera>> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            SELECT cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                   zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            FROM cameras
            WHERE lifecycle = 'active'
            ORDER BY cam_id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list active cameras: {}", e)))?;

        Ok(result)
    }

    /// Update camera
    pub async fn update(&self, camera: &Camera) -> Result<Camera> {
        let result = sqlx::query_as::<_, Camera>(
            r#"
            UPDATE cameras
            SET cam_name = $1, cam_type = $2, cam_ip = $3, cam_port = $4, cam_user = $5,
                cam_password = $6, zone_in_id = $7, zone_out_id = $8, direction_hint = $9,
                updated_at = $10
            WHERE cam_id = $11 AND lifecycle <> 'deleted'
            RETURNING cam_id, cam_name, cam_type, cam_ip, cam_port, cam_user, cam_password,
                      zone_in_id, zone_out_id, direction_hint, lifecycle, updated_at
            "#,
        )
        .bind(&camera.cam_name)
        .bind(&camera.cam_type)
        .bind(&camera.cam_ip)
        .bind(camera.cam_port)
        .bind(&camera.cam_user)
        .bind(&camera.cam_password)
        .bind(camera.zone_in_id)
        .bind(camera.zone_out_id)
        .bind(&camera.direction_hint)
        .bind(Utc::now())
        .bind(camera.cam_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update camera: {}", e)))?
        .ok_or_else(|| Error::NotFound(format!("Camera {} not found", camera.cam_id)))?;

        Ok(result)
    }

    /// Move a live camera to another lifecycle state
    pub async fn set_lifecycle(&self, cam_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cameras
            SET lifecycle = $1, updated_at = $2
            WHERE cam_id = $3 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(lifecycle)
        .bind(Utc::now())
        .bind(cam_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set camera lifecycle: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
