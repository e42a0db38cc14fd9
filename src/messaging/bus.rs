use crate::config::{PubSubBackend, PubSubConfig};
use crate::messaging::amqp::AmqpBus;
use crate::messaging::event::SignUpdate;
use crate::messaging::memory::MemoryBus;
use crate::messaging::valkey::ValkeyBus;
use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

/// Transport that carries sign updates to the sign hardware
#[async_trait]
pub trait SignBus: Send + Sync {
    /// Publish one update on the shared channel
    async fn publish(&self, update: &SignUpdate) -> Result<()>;

    /// Backend name, for logs and the health endpoint
    fn name(&self) -> &'static str;
}

/// Connect the backend selected in the configuration
pub async fn connect_sign_bus(config: &PubSubConfig) -> Result<Arc<dyn SignBus>> {
    let bus: Arc<dyn SignBus> = match config.backend {
        PubSubBackend::Valkey => Arc::new(ValkeyBus::connect(config).await?),
        PubSubBackend::Amqp => Arc::new(AmqpBus::connect(config.clone()).await?),
        PubSubBackend::Memory => Arc::new(MemoryBus::new(64)),
    };

    info!(
        "Sign bus connected: {} on channel {}",
        bus.name(),
        config.channel
    );

    Ok(bus)
}
