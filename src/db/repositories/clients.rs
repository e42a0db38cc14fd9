use crate::{
    db::models::{client_models::ApiClient, Lifecycle},
    error::Error,
};
use crate::db::repositories::map_insert_error;
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Third-party API clients repository
#[derive(Clone)]
pub struct ClientsRepository {
    pool: Arc<PgPool>,
}

impl ClientsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Register a client
    pub async fn create(&self, client: &ApiClient) -> Result<ApiClient> {
        info!("Registering API client {}", client.client_id);

        let result = sqlx::query_as::<_, ApiClient>(
            r#"
            INSERT INTO api_clients (client_id, client_name, secret_hash, fuzzy_search, lifecycle, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING client_id, client_name, secret_hash, fuzzy_search, lifecycle, created_at
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.client_name)
        .bind(&client.secret_hash)
        .bind(client.fuzzy_search)
        .bind(client.lifecycle)
        .bind(client.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("API client {}", client.client_id)))?;

        Ok(result)
    }

    /// Get client by ID, deleted clients included
    pub async fn get_by_id(&self, client_id: &str) -> Result<Option<ApiClient>> {
        let result = sqlx::query_as::<_, ApiClient>(
            r#"
            SELECT client_id, client_name, secret_hash, fuzzy_search, lifecycle, created_at
            FROM api_clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get API client: {}", e)))?;

        Ok(result)
    }

    /// List live clients
    pub async fn get_all(&self) -> Result<Vec<ApiClient>> {
        let result = sqlx::query_as::<_, ApiClient>(
            r#"
            SELECT client_id, client_name, secret_hash, fuzzy_search, lifecycle, created_at
            FROM api_clients
            WHERE lifecycle <> 'deleted'
            ORDER BY client_id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list API clients: {}", e)))?;

        Ok(result)
    }

    /// Move a live client to another lifecycle state
    pub async fn set_lifecycle(&self, client_id: &str, lifecycle: Lifecycle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_clients
            SET lifecycle = $1
            WHERE client_id = $2 AND lifecycle <> 'deleted'
            "#,
        )
        .bind(lifecycle)
        .bind(client_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set API client lifecycle: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
