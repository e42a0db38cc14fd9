use crate::{
    db::models::{sign_models::Sign, Lifecycle},
    error::Error,
};
use crate::db::repositories::map_insert_error;
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Signs repository
#[derive(Clone)]
pub struct SignsRepository {
    pool: Arc<PgPool>,
}

impl SignsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a new sign
    pub async fn create(&self, sign: &Sign) -> Result<Sign> {
        info!("Creating sign {} for zone {}", sign.sign_id, sign.zone_id);

        let result = sqlx::query_as::<_, Sign>(
            r#"
            INSERT INTO signs (sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                               sign_password, zone_id, lifecycle, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                      sign_password, zone_id, lifecycle, updated_at
            "#,
        )
        .bind(sign.sign_id)
        .bind(&sign.sign_name)
        .bind(&sign.sign_type)
        .bind(&sign.sign_ip)
        .bind(sign.sign_port)
        .bind(&sign.sign_username)
        .bind(&sign.sign_password)
        .bind(sign.zone_id)
        .bind(sign.lifecycle)
        .bind(sign.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("Sign {}", sign.sign_id)))?;

        Ok(result)
    }

    /// Get sign by ID, deleted signs included
    pub async fn get_by_id(&self, sign_id: i32) -> Result<Option<Sign>> {
        let result = sqlx::query_as::<_, Sign>(
            r#"
            SELECT sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                   sign_password, zone_id, lifecycle, updated_at
            FROM signs
            WHERE sign_id = $1
            "#,
        )
        .bind(sign_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get sign by ID: {}", e)))?;

        Ok(result)
    }

    /// The active sign serving a zone
    pub async fn get_active_by_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        let result = sqlx::query_as::<_, Sign>(
            r#"
            SELECT sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                   sign_password, zone_id, lifecycle, updated_at
            FROM signs
            WHERE zone_id = $1 AND lifecycle = 'active'
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get sign by zone: {}", e)))?;

        Ok(result)
    }

    /// The live (active or disabled) sign serving a zone
    pub async fn get_live_by_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        let result = sqlx::query_as::<_, Sign>(
            r#"
            SELECT sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                   sign_password, zone_id, lifecycle, updated_at
            FROM signs
            WHERE zone_id = $1 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get sign by zone: {}", e)))?;

        Ok(result)
    }

    /// List signs
    pub async fn get_all(&self, include_deleted: bool) -> Result<Vec<Sign>> {
        let result = sqlx::query_as::<_, Sign>(
            r#"
            SELECT sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                   sign_password, zone_id, lifecycle, updated_at
            FROM signs
            WHERE $1 OR lifecycle <> 'deleted'
            ORDER BY sign_id
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list signs: {}", e)))?;

        Ok(result)
    }

    /// Update sign
    pub async fn update(&self, sign: &Sign) -> Result<Sign> {
        let result = sqlx::query_as::<_, Sign>(
            r#"
            UPDATE signs
            SET sign_name = $1, sign_type = $2, sign_ip = $3, sign_port = $4, sign_username = $5,
                sign_password = $6, zone_id = $7, updated_at = $8
            WHERE sign_id = $9 AND lifecycle <> 'deleted'
            RETURNING sign_id, sign_name, sign_type, sign_ip, sign_port, sign_username,
                      sign_password, zone_id, lifecycle, updated_at
            "#,
        )
        .bind(&sign.sign_name)
        .bind(&sign.sign_type)
        .bind(&sign.sign_ip)
        .bind(sign.sign_port)
        .bind(&sign.sign_username)
        .bind(&sign.sign_password)
        .bind(sign.zone_id)
        .bind(Utc::now())
        .bind(sign.sign_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update sign: {}", e)))?
        .ok_or_else(|| Error::NotFound(format!("Sign {} not found", sign.sign_id)))?;

        Ok(result)
    }

    /// Move a live sign to another lifecycle state
    pub async fn set_lifecycle(&self, sign_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE signs
            SET lifecycle = $1, updated_at = $2
            WHERE sign_id = $3 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(lifecycle)
        .bind(Utc::now())
        .bind(sign_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set sign lifecycle: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
