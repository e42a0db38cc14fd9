use crate::config::PubSubConfig;
use crate::error::Error;
use crate::messaging::bus::SignBus;
use crate::messaging::event::SignUpdate;
use anyhow::Result;
use async_trait::async_trait;
use deadpool_lapin::{Config, Manager, Pool};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, ConnectionProperties, ExchangeKind,
};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::Mutex;

/// RabbitMQ sign bus. Updates go to a durable topic exchange,
/// routed by the configured channel name.
pub struct AmqpBus {
    pool: Pool,
    config: PubSubConfig,
    channel: Mutex<Option<Channel>>,
}

impl AmqpBus {
    pub async fn connect(config: PubSubConfig) -> Result<Self> {
        let pool_config = Config {
            url: Some(config.uri.clone()),
            pool: Some(deadpool_lapin::PoolConfig {
                max_size: config.pool_size as usize,
                queue_mode: deadpool::managed::QueueMode::Fifo,
                timeouts: deadpool::managed::Timeouts {
                    wait: Some(Duration::from_millis(config.timeout_ms)),
                    create: Some(Duration::from_millis(config.timeout_ms)),
                    recycle: Some(Duration::from_millis(config.timeout_ms)),
                },
            }),
            connection_properties: ConnectionProperties::default(),
        };
        let pool = pool_config
            .create_pool(Some(deadpool_lapin::Runtime::Tokio1))
            .map_err(|e| Error::Config(format!("Invalid RabbitMQ pool config: {}", e)))?;

        let bus = Self {
            pool,
            config,
            channel: Mutex::new(None),
        };

        // Declare the exchange up front so configuration errors surface at startup
        bus.get_channel().await?;
        info!("RabbitMQ sign bus initialized on {}", bus.config.exchange);

        Ok(bus)
    }

    /// Get a connection from the pool with retry
    async fn get_connection(&self) -> Result<deadpool::managed::Object<Manager>> {
        let mut attempts = 0;
        let max_attempts = self.config.retry_attempts.max(1);

        loop {
            attempts += 1;
            match self.pool.get().await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    if attempts >= max_attempts {
                        return Err(Error::PubSub(format!(
                            "Failed to get RabbitMQ connection after {} attempts: {}",
                            attempts, err
                        ))
                        .into());
                    }

                    warn!(
                        "Failed to get RabbitMQ connection (attempt {}/{}): {}",
                        attempts, max_attempts, err
                    );

                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
            }
        }
    }

    /// Reuse the open channel or open a new one and declare the exchange on it
    async fn get_channel(&self) -> Result<Channel> {
        let mut channel_guard = self.channel.lock().await;

        if let Some(channel) = &*channel_guard {
            if channel.status().connected() {
                return Ok(channel.clone());
            }
        }

        let conn = self.get_connection().await?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| Error::PubSub(format!("Failed to create RabbitMQ channel: {}", e)))?;

        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::PubSub(format!("Failed to declare exchange: {}", e)))?;

        *channel_guard = Some(channel.clone());

        Ok(channel)
    }
}

#[async_trait]
impl SignBus for AmqpBus {
    async fn publish(&self, update: &SignUpdate) -> Result<()> {
        let payload = update.payload()?;
        let channel = self.get_channel().await?;

        channel
            .basic_publish(
                &self.config.exchange,
                &self.config.channel,
                BasicPublishOptions::default(),
                payload.as_bytes(),
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| Error::PubSub(format!("Failed to publish sign update: {}", e)))?;

        debug!(
            "Published {} to {} with routing key {}",
            payload, self.config.exchange, self.config.channel
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "amqp"
    }
}
