use crate::{
    db::models::audit_models::{AuditQuery, NewUserAudit, UserAudit},
    error::Error,
};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

const DEFAULT_PAGE_SIZE: i64 = 100;

/// User audit trail. Rows are only appended.
#[derive(Clone)]
pub struct AuditRepository {
    pool: Arc<PgPool>,
}

impl AuditRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: &NewUserAudit) -> Result<UserAudit> {
        let result = sqlx::query_as::<_, UserAudit>(
            r#"
            INSERT INTO user_audit (username, module, action, old_value, new_value)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, action_date, module, action, old_value, new_value
            "#,
        )
        .bind(&entry.username)
        .bind(&entry.module)
        .bind(&entry.action)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to append user audit: {}", e)))?;

        Ok(result)
    }

    /// Newest first
    pub async fn search(&self, query: &AuditQuery) -> Result<Vec<UserAudit>> {
        let result = sqlx::query_as::<_, UserAudit>(
            r#"
            SELECT id, username, action_date, module, action, old_value, new_value
            FROM user_audit
            WHERE ($1::TEXT IS NULL OR username = $1)
              AND ($2::TEXT IS NULL OR module = $2)
            ORDER BY action_date DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(&query.username)
        .bind(&query.module)
        .bind(query.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to search user audit: {}", e)))?;

        Ok(result)
    }
}
