use crate::config::PubSubConfig;
use crate::error::Error;
use crate::messaging::bus::SignBus;
use crate::messaging::event::SignUpdate;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Valkey (Redis protocol) sign bus.
/// The last value is kept under the sign address so a sign that restarts can read it back.
pub struct ValkeyBus {
    connection: ConnectionManager,
    channel: String,
}

impl ValkeyBus {
    pub async fn connect(config: &PubSubConfig) -> Result<Self> {
        let client = redis::Client::open(config.uri.as_str())
            .map_err(|e| Error::Config(format!("Invalid Valkey URI {}: {}", config.uri, e)))?;

        let connection = tokio::time::timeout(
            Duration::from_millis(config.timeout_ms),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| Error::PubSub(format!("Timed out connecting to Valkey at {}", config.uri)))?
        .map_err(|e| Error::PubSub(format!("Failed to connect to Valkey: {}", e)))?;

        Ok(Self {
            connection,
            channel: config.channel.clone(),
        })
    }
}

#[async_trait]
impl SignBus for ValkeyBus {
    async fn publish(&self, update: &SignUpdate) -> Result<()> {
        let payload = update.payload()?;
        let mut connection = self.connection.clone();

        let _: () = connection
            .set(&update.sign_address, update.free_capacity)
            .await
            .map_err(|e| Error::PubSub(format!("Failed to store sign value: {}", e)))?;

        let receivers: i64 = connection
            .publish(&self.channel, &payload)
            .await
            .map_err(|e| Error::PubSub(format!("Failed to publish sign update: {}", e)))?;

        debug!(
            "Published {} on {} to {} subscribers",
            payload, self.channel, receivers
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "valkey"
    }
}
