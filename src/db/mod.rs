use crate::config::{DatabaseConfig, SecurityConfig};
use crate::db::models::user_models::{User, UserRole};
use crate::db::repositories::users::UsersRepository;
use crate::error::Error;
use crate::security::password;
use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod catalog;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod store;

/// Database service for handling connections and migrations
pub struct DatabaseService {
    pub pool: Arc<PgPool>,
}

impl DatabaseService {
    /// Create a new database service
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Initializing Database service");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        info!("Connected to PostgreSQL database");

        let service = Self {
            pool: Arc::new(pool),
        };

        if config.auto_migrate {
            service.run_migrations().await?;
        }

        Ok(service)
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        migrations::run_migrations(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to run migrations: {}", e)))?;

        info!("Database migrations completed successfully");

        Ok(())
    }

    /// Create the configured administrator if no live users exist
    pub async fn seed_admin(&self, security: &SecurityConfig) -> Result<()> {
        let users = UsersRepository::new(self.pool.clone());
        if users.count_live().await? > 0 {
            return Ok(());
        }

        let admin = User::new(
            &security.admin_username,
            "",
            "",
            password::hash_password(&security.admin_password, security)?,
            UserRole::Admin,
        );
        users.create(&admin).await?;

        warn!(
            "Created administrator '{}'; change its password immediately",
            admin.username
        );

        Ok(())
    }

    /// Health check for database
    pub async fn health_check(&self) -> Result<bool> {
        health_check(&self.pool).await
    }
}

pub async fn health_check(pool: &PgPool) -> Result<bool> {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(true),
        Err(e) => {
            error!("Database health check failed: {}", e);
            Ok(false)
        }
    }
}
