use crate::db::models::{user_models::User, Lifecycle};
use crate::db::repositories::map_insert_error;
use crate::error::Error;
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

const USER_COLUMNS: &str =
    "username, first_name, last_name, password_hash, role, lifecycle, created_at, updated_at";

/// Back-office users repository
#[derive(Clone)]
pub struct UsersRepository {
    pool: Arc<PgPool>,
}

impl UsersRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        info!("Creating user {} ({})", user.username, user.role.as_str());

        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, first_name, last_name, password_hash, role, lifecycle,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.lifecycle)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("User {}", user.username)))?;

        Ok(result)
    }

    /// Deleted users are returned too; callers decide what a deleted account may do
    pub async fn get(&self, username: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get user {}: {}", username, e)))?;

        Ok(result)
    }

    /// Users that are not deleted
    pub async fn get_live(&self) -> Result<Vec<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE lifecycle <> 'deleted' ORDER BY username",
            USER_COLUMNS
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list users: {}", e)))?;

        Ok(result)
    }

    /// Profile, role and password. Deleted users are left alone.
    pub async fn update(&self, user: &User) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, password_hash = $4, role = $5, updated_at = NOW()
            WHERE username = $1 AND lifecycle <> 'deleted'
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update user {}: {}", user.username, e)))?;

        Ok(result)
    }

    /// Move a live user to `lifecycle`; `None` when the user is missing or already deleted
    pub async fn set_lifecycle(&self, username: &str, lifecycle: Lifecycle) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET lifecycle = $2, updated_at = NOW()
            WHERE username = $1 AND lifecycle <> 'deleted'
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(lifecycle)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set status of user {}: {}", username, e)))?;

        Ok(result)
    }

    /// Users that can still log in or be re-enabled
    pub async fn count_live(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE lifecycle <> 'deleted'")
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to count users: {}", e)))?;

        Ok(count)
    }
}
