use crate::{
    db::models::{zone_models::Zone, Lifecycle},
    error::Error,
};
use crate::db::repositories::map_insert_error;
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Zones repository
#[derive(Clone)]
pub struct ZonesRepository {
    pool: Arc<PgPool>,
}

impl ZonesRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a new zone
    pub async fn create(&self, zone: &Zone) -> Result<Zone> {
        info!("Creating zone {}", zone.zone_id);

        let result = sqlx::query_as::<_, Zone>(
            r#"
            INSERT INTO zones (zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra
            "#,
        )
        .bind(zone.zone_id)
        .bind(&zone.name)
        .bind(zone.max_capacity)
        .bind(zone.free_capacity)
        .bind(zone.lifecycle)
        .bind(zone.last_update)
        .bind(&zone.extra)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("Zone {}", zone.zone_id)))?;

        Ok(result)
    }

    /// Get zone by ID, deleted zones included
    pub async fn get_by_id(&self, zone_id: i32) -> Result<Option<Zone>> {
        let result = sqlx::query_as::<_, Zone>(
            r#"
            SELECT zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra
            FROM zones
            WHERE zone_id = $1
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get zone by ID: {}", e)))?;

        Ok(result)
    }

    /// List zones
    pub async fn get_all(&self, include_deleted: bool) -> Result<Vec<Zone>> {
        let result = sqlx::query_as::<_, Zone>(
            r#"
            SELECT zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra
            FROM zones
            WHERE $1 OR lifecycle <> 'deleted'
            ORDER BY zone_id
            "#,
        )
        .bind(include_deleted)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list zones: {}", e)))?;

        Ok(result)
    }

    /// Zones that take part in counting
    pub async fn get_active(&self) -> Result<Vec<Zone>> {
        let result = sqlx::query_as::<_, Zone>(
            r#"
            SELECT zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra
            FROM zones
            WHERE lifecycle = 'active'
            ORDER BY zone_id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list active zones: {}", e)))?;

        Ok(result)
    }

    /// Update name, max capacity and extra data. The stored free capacity is
    /// kept (or replaced by `free_capacity`) and clamped to the new maximum
    /// in the same statement, so concurrent counter changes are not lost.
    pub async fn update(&self, zone: &Zone, free_capacity: Option<i32>) -> Result<Zone> {
        let result = sqlx::query_as::<_, Zone>(
            r#"
            UPDATE zones
            SET name = $1,
                max_capacity = $2,
                free_capacity = LEAST(COALESCE($3, free_capacity), $2),
                extra = $4,
                last_update = $5
            WHERE zone_id = $6 AND lifecycle <> 'deleted'
            RETURNING zone_id, name, max_capacity, free_capacity, lifecycle, last_update, extra
            "#,
        )
        .bind(&zone.name)
        .bind(zone.max_capacity)
        .bind(free_capacity)
        .bind(&zone.extra)
        .bind(Utc::now())
        .bind(zone.zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update zone: {}", e)))?
        .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone.zone_id)))?;

        Ok(result)
    }

    /// Move a live zone to another lifecycle state
    pub async fn set_lifecycle(&self, zone_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE zones
            SET lifecycle = $1, last_update = $2
            WHERE zone_id = $3 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(lifecycle)
        .bind(Utc::now())
        .bind(zone_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set zone lifecycle: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of live cameras and signs pointing at the zone
    pub async fn count_references(&self, zone_id: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM cameras
                 WHERE (zone_in_id = $1 OR zone_out_id = $1) AND lifecycle <> 'deleted')
              + (SELECT COUNT(*) FROM signs
                 WHERE zone_id = $1 AND lifecycle <> 'deleted')
            "#,
        )
        .bind(zone_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to count zone references: {}", e)))?;

        Ok(count)
    }

    /// Take one space. Applies only while `0 < free_capacity <= max_capacity`.
    pub async fn decrement_free_capacity(&self, zone_id: i32) -> Result<Option<i32>> {
        let result: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE zones
            SET free_capacity = free_capacity - 1, last_update = NOW()
            WHERE zone_id = $1
              AND lifecycle = 'active'
              AND free_capacity > 0
              AND free_capacity <= max_capacity
            RETURNING free_capacity
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to decrement zone capacity: {}", e)))?;

        Ok(result)
    }

    /// Release one space. Applies only while `free_capacity < max_capacity`.
    pub async fn increment_free_capacity(&self, zone_id: i32) -> Result<Option<i32>> {
        let result: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE zones
            SET free_capacity = free_capacity + 1, last_update = NOW()
            WHERE zone_id = $1
              AND lifecycle = 'active'
              AND free_capacity < max_capacity
            RETURNING free_capacity
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to increment zone capacity: {}", e)))?;

        Ok(result)
    }

    /// Current free capacity of an active zone
    pub async fn free_capacity(&self, zone_id: i32) -> Result<Option<i32>> {
        let result: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT free_capacity FROM zones
            WHERE zone_id = $1 AND lifecycle = 'active'
            "#,
        )
        .bind(zone_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to read zone capacity: {}", e)))?;

        Ok(result)
    }
}
