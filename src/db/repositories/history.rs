use crate::{
    db::models::present_car_models::{HistoryQuery, PresentCar, PresentCarHistory},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: i64 = 100;

/// Present car history repository. Rows are only ever appended.
#[derive(Clone)]
pub struct HistoryRepository {
    pool: Arc<PgPool>,
}

impl HistoryRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Append a copy of the present car state
    pub async fn append(&self, car: &PresentCar) -> Result<PresentCarHistory> {
        let result = sqlx::query_as::<_, PresentCarHistory>(
            r#"
            INSERT INTO present_car_history (lpn, camera_id, current_zone_id, last_zone_id, direction,
                                             confidence, transaction_date, car_details_id, extra)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                      transaction_date, car_details_id, extra
            "#,
        )
        .bind(&car.lpn)
        .bind(car.camera_id)
        .bind(car.current_zone_id)
        .bind(car.last_zone_id)
        .bind(&car.direction)
        .bind(car.confidence)
        .bind(car.transaction_date)
        .bind(car.car_details_id)
        .bind(&car.extra)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to append present car history: {}", e)))?;

        Ok(result)
    }

    /// Search history, newest first
    pub async fn search(&self, query: &HistoryQuery) -> Result<Vec<PresentCarHistory>> {
        let result = sqlx::query_as::<_, PresentCarHistory>(
            r#"
            SELECT id, lpn, camera_id, current_zone_id, last_zone_id, direction, confidence,
                   transaction_date, car_details_id, extra
            FROM present_car_history
            WHERE ($1::TEXT IS NULL OR lpn = $1)
              AND ($2::INT IS NULL OR current_zone_id = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR transaction_date >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR transaction_date <= $4)
            ORDER BY transaction_date DESC, id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(&query.lpn)
        .bind(query.zone_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .bind(query.offset.unwrap_or(0))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to search present car history: {}", e)))?;

        Ok(result)
    }
}
