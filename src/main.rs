use anyhow::{Context, Result};
use clap::Parser;
use fyc_backend::api::{AppState, RestApi};
use fyc_backend::config::{self, Overrides};
use fyc_backend::db::catalog::PgCatalogStore;
use fyc_backend::db::store::PgCountingStore;
use fyc_backend::db::DatabaseService;
use fyc_backend::messaging;
use fyc_backend::scheduler::MaintenanceScheduler;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Find-your-car backend: camera webhook, zone counting and sign updates
#[derive(Parser, Debug)]
#[command(name = "fyc-backend")]
#[command(version)]
struct Args {
    /// Configuration file (.toml or .json)
    #[arg(short, long, env = "FYC_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port
    #[arg(short, long, env = "FYC_PORT")]
    port: Option<u16>,

    /// PostgreSQL URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Pub/sub URI (redis:// or amqp://)
    #[arg(long, env = "PUBSUB_URI")]
    pubsub_uri: Option<String>,

    /// Channel the signs listen on
    #[arg(long, env = "PUBSUB_CHANNEL")]
    pubsub_channel: Option<String>,

    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Require bearer tokens on back-office and third-party routes
    #[arg(long, env = "TOKEN_CHECK")]
    token_check: Option<bool>,

    /// Keep a copy of every camera payload on disk
    #[arg(long, env = "SAVE_RAW_PAYLOAD")]
    save_raw_payload: Option<bool>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            port: self.port,
            database_url: self.database_url.clone(),
            pubsub_uri: self.pubsub_uri.clone(),
            pubsub_channel: self.pubsub_channel.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_check: self.token_check,
            save_raw_payload: self.save_raw_payload,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    config.apply_overrides(&args.overrides());

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting find-your-car backend {}", env!("CARGO_PKG_VERSION"));

    let database = DatabaseService::new(&config.database)
        .await
        .context("Failed to initialize database")?;
    database.seed_admin(&config.security).await?;

    let store = Arc::new(PgCountingStore::new(database.pool.clone()));
    let catalog = Arc::new(PgCatalogStore::new(database.pool.clone()));

    let bus = messaging::connect_sign_bus(&config.pubsub)
        .await
        .context("Failed to connect sign bus")?;

    let check_interval = config.scheduler.check_interval_secs;
    let state = AppState::new(
        config,
        database.pool.clone(),
        store.clone(),
        catalog,
        bus,
    );

    state.reload_registries().await?;
    info!(
        "Loaded {} zones and {} cameras",
        state.registries.zones.len(),
        state.registries.cameras.len()
    );

    let scheduler = Arc::new(MaintenanceScheduler::new(
        store,
        state.registries.clone(),
        state.signage.clone(),
        check_interval,
    ));
    let scheduler_task = scheduler.start();

    let http_server = RestApi::new(state);

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!("API server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    scheduler_task.abort();

    Ok(())
}
