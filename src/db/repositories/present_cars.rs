use crate::{
    db::models::present_car_models::{PresentCar, PresentCarQuery, PresentCarWrite, UpsertOutcome},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    car: PresentCar,
    inserted: bool,
}

/// Present cars repository
#[derive(Clone)]
pub struct PresentCarsRepository {
    pool: Arc<PgPool>,
}

impl PresentCarsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Insert the plate's row or overwrite it in place.
    /// A single statement, so two sightings of one plate never produce two rows.
    pub async fn upsert(&self, write: &PresentCarWrite) -> Result<(PresentCar, UpsertOutcome)> {
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            INSERT INTO present_cars (lpn, camera_id, current_zone_id, last_zone_id, direction,
                                      confidence, transaction_date, car_details_id, extra)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (lpn) DO UPDATE
            SET camera_id = EXCLUDED.camera_id,
                current_zone_id = EXCLUDED.current_zone_id,
                last_zone_id = EXCLUDED.last_zone_id,
                direction = EXCLUDED.direction,
                confidence = EXCLUDED.confidence,
                transaction_date = EXCLUDED.transaction_date,
                car_details_id = EXCLUDED.car_details_id,
                extra = EXCLUDED.extra
            RETURNING id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                      transaction_date, car_details_id, extra, (xmax = 0) AS inserted
            "#,
        )
        .bind(&write.lpn)
        .bind(write.camera_id)
        .bind(write.current_zone_id)
        .bind(write.last_zone_id)
        .bind(&write.direction)
        .bind(write.confidence)
        .bind(write.transaction_date)
        .bind(write.car_details_id)
        .bind(&write.extra)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to upsert present car: {}", e)))?;

        let outcome = if row.inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        };

        Ok((row.car, outcome))
    }

    /// Get present car by plate
    pub async fn get_by_lpn(&self, lpn: &str) -> Result<Option<PresentCar>> {
        let result = sqlx::query_as::<_, PresentCar>(
            r#"
            SELECT id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                   transaction_date, car_details_id, extra
            FROM present_cars
            WHERE lpn = $1
            "#,
        )
        .bind(lpn)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get present car: {}", e)))?;

        Ok(result)
    }

    /// Most recent present cars whose plate contains `fragment`, case-insensitive
    pub async fn search_by_lpn(&self, fragment: &str, limit: i64) -> Result<Vec<PresentCar>> {
        let pattern = format!("%{}%", fragment.replace('%', "").replace('_', ""));

        let result = sqlx::query_as::<_, PresentCar>(
            r#"
            SELECT id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                   transaction_date, car_details_id, extra
            FROM present_cars
            WHERE lpn ILIKE $1
            ORDER BY transaction_date DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to search present cars: {}", e)))?;

        Ok(result)
    }

    /// List present cars
    pub async fn list(&self, query: &PresentCarQuery) -> Result<Vec<PresentCar>> {
        let result = sqlx::query_as::<_, PresentCar>(
            r#"
            SELECT id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                   transaction_date, car_details_id, extra
            FROM present_cars
            WHERE ($1::INT IS NULL OR current_zone_id = $1)
              AND ($2::TEXT IS NULL OR lpn = $2)
            ORDER BY transaction_date DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.zone_id)
        .bind(&query.lpn)
        .bind(query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .bind(query.offset.unwrap_or(0))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list present cars: {}", e)))?;

        Ok(result)
    }

    /// Delete one plate
    pub async fn delete_by_lpn(&self, lpn: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM present_cars
            WHERE lpn = $1
            "#,
        )
        .bind(lpn)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete present car: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty the table. History is untouched.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM present_cars")
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to reset present cars: {}", e)))?;

        info!("Removed {} present cars", result.rows_affected());

        Ok(result.rows_affected())
    }
}
