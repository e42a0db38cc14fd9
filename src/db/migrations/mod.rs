use anyhow::Result;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Embedded migrations, applied in order
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_create_types", include_str!("sql/001_create_types.sql")),
    (
        "002_create_zones_cameras_signs",
        include_str!("sql/002_create_zones_cameras_signs.sql"),
    ),
    (
        "003_create_present_cars",
        include_str!("sql/003_create_present_cars.sql"),
    ),
    (
        "004_create_settings_users_clients",
        include_str!("sql/004_create_settings_users_clients.sql"),
    ),
    (
        "005_create_car_details_zone_images",
        include_str!("sql/005_create_car_details_zone_images.sql"),
    ),
    (
        "006_create_error_messages_user_audit",
        include_str!("sql/006_create_error_messages_user_audit.sql"),
    ),
];

pub fn migration_names() -> impl Iterator<Item = &'static str> {
    MIGRATIONS.iter().map(|(name, _)| *name)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            name VARCHAR(255) PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .await?;

    for (name, sql) in MIGRATIONS {
        let applied: Option<String> =
            sqlx::query_scalar("SELECT name FROM schema_migrations WHERE name = $1")
                .bind(name)
                .fetch_optional(pool)
                .await?;

        if applied.is_some() {
            continue;
        }

        execute_migration(pool, name, sql).await?;
        info!("Applied migration: {}", name);
    }

    Ok(())
}

async fn execute_migration(pool: &PgPool, name: &str, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await?;

    // Multi-statement scripts go through the simple query protocol
    (&mut *tx).execute(sql).await?;

    sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1)")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
