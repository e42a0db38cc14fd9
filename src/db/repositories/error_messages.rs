use crate::{db::models::error_message_models::ErrorMessage, error::Error};
use anyhow::Result;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Response code catalogue
#[derive(Clone)]
pub struct ErrorMessagesRepository {
    pool: Arc<PgPool>,
}

impl ErrorMessagesRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> Result<Vec<ErrorMessage>> {
        let result = sqlx::query_as::<_, ErrorMessage>(
            "SELECT code, messages FROM error_messages ORDER BY code",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list error messages: {}", e)))?;

        Ok(result)
    }

    pub async fn get(&self, code: i32) -> Result<Option<ErrorMessage>> {
        let result = sqlx::query_as::<_, ErrorMessage>(
            "SELECT code, messages FROM error_messages WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get error message {}: {}", code, e)))?;

        Ok(result)
    }

    /// Merge `messages` into the code's languages, creating the code when missing
    pub async fn merge(&self, code: i32, messages: &BTreeMap<String, String>) -> Result<ErrorMessage> {
        let result = sqlx::query_as::<_, ErrorMessage>(
            r#"
            INSERT INTO error_messages (code, messages)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE
            SET messages = error_messages.messages || EXCLUDED.messages
            RETURNING code, messages
            "#,
        )
        .bind(code)
        .bind(Json(messages))
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to save error message {}: {}", code, e)))?;

        Ok(result)
    }

    /// Drop one language of a code; `None` when the code is unknown
    pub async fn remove_language(&self, code: i32, language: &str) -> Result<Option<ErrorMessage>> {
        let result = sqlx::query_as::<_, ErrorMessage>(
            r#"
            UPDATE error_messages
            SET messages = messages - $2
            WHERE code = $1
            RETURNING code, messages
            "#,
        )
        .bind(code)
        .bind(language)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to update error message {}: {}", code, e)))?;

        Ok(result)
    }
}
