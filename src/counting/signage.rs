use crate::config::PubSubConfig;
use crate::db::models::sign_models::Sign;
use crate::db::store::CountingStore;
use crate::error::Error;
use crate::messaging::{SignBus, SignUpdate};
use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// What happened when a zone's sign was notified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignNotice {
    Published(SignUpdate),
    /// Signage is optional per zone
    NoSign,
}

/// Pushes zone free-capacity values to the zone's sign
pub struct SignagePublisher {
    store: Arc<dyn CountingStore>,
    bus: Arc<dyn SignBus>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl SignagePublisher {
    pub fn new(store: Arc<dyn CountingStore>, bus: Arc<dyn SignBus>, config: &PubSubConfig) -> Self {
        Self {
            store,
            bus,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub fn bus(&self) -> &Arc<dyn SignBus> {
        &self.bus
    }

    /// Publish `free_capacity` to the sign serving `zone_id`.
    /// A zone without a sign is not an error.
    pub async fn notify(&self, zone_id: i32, free_capacity: i32) -> Result<SignNotice> {
        let sign = match self.store.sign_for_zone(zone_id).await? {
            Some(sign) => sign,
            None => {
                info!("Zone {} has no active sign, nothing to publish", zone_id);
                return Ok(SignNotice::NoSign);
            }
        };

        let update = SignUpdate::new(sign.sign_id, zone_id, sign.address(), free_capacity);
        self.publish_with_retry(&update).await?;

        Ok(SignNotice::Published(update))
    }

    /// Publish `free_capacity` to one specific sign, whatever its zone's sign lookup says
    pub async fn push(&self, sign: &Sign, free_capacity: i32) -> Result<SignUpdate> {
        let update = SignUpdate::new(sign.sign_id, sign.zone_id, sign.address(), free_capacity);
        self.publish_with_retry(&update).await?;
        Ok(update)
    }

    async fn publish_with_retry(&self, update: &SignUpdate) -> Result<()> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.bus.publish(update).await {
                Ok(()) => {
                    info!(
                        "Sign {} ({}) for zone {} set to {}",
                        update.sign_id, update.sign_address, update.zone_id, update.free_capacity
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.retry_attempts => {
                    warn!(
                        "Publishing to sign {} failed (attempt {}/{}): {}",
                        update.sign_address, attempt, self.retry_attempts, e
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => {
                    return Err(Error::PubSub(format!(
                        "Giving up on sign {} after {} attempts: {}",
                        update.sign_address, attempt, e
                    ))
                    .into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryCountingStore;
    use crate::db::models::sign_models::CreateSignRequest;
    use crate::messaging::MemoryBus;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyBus {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SignBus for FlakyBus {
        async fn publish(&self, _update: &SignUpdate) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::PubSub("connection reset".to_string()).into());
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn sign(sign_id: i32, zone_id: i32) -> Sign {
        Sign::from(CreateSignRequest {
            sign_id,
            sign_name: BTreeMap::new(),
            sign_type: "led".to_string(),
            sign_ip: "10.0.1.7".to_string(),
            sign_port: 5000,
            sign_username: None,
            sign_password: None,
            zone_id,
        })
    }

    fn config(retry_attempts: u32) -> PubSubConfig {
        PubSubConfig {
            retry_attempts,
            retry_delay_ms: 1,
            ..PubSubConfig::default()
        }
    }

    #[tokio::test]
    async fn publishes_to_zone_sign() {
        let store = Arc::new(MemoryCountingStore::new());
        store.insert_sign(sign(3, 5)).await;
        let bus = Arc::new(MemoryBus::new(8));
        let publisher = SignagePublisher::new(store, bus.clone(), &config(3));

        let notice = publisher.notify(5, 9).await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].sign_address, "10.0.1.7:5000");
        assert_eq!(published[0].free_capacity, 9);
        assert_eq!(notice, SignNotice::Published(published[0].clone()));
    }

    #[tokio::test]
    async fn zone_without_sign_is_fine() {
        let store = Arc::new(MemoryCountingStore::new());
        let bus = Arc::new(MemoryBus::new(8));
        let publisher = SignagePublisher::new(store, bus.clone(), &config(3));

        assert_eq!(publisher.notify(6, 4).await.unwrap(), SignNotice::NoSign);
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let store = Arc::new(MemoryCountingStore::new());
        store.insert_sign(sign(3, 5)).await;
        let bus = Arc::new(FlakyBus {
            failures_left: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });
        let publisher = SignagePublisher::new(store, bus.clone(), &config(3));

        assert!(matches!(
            publisher.notify(5, 1).await.unwrap(),
            SignNotice::Published(_)
        ));
        assert_eq!(bus.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let store = Arc::new(MemoryCountingStore::new());
        store.insert_sign(sign(3, 5)).await;
        let bus = Arc::new(FlakyBus {
            failures_left: AtomicU32::new(10),
            calls: AtomicU32::new(0),
        });
        let publisher = SignagePublisher::new(store, bus.clone(), &config(2));

        let err = publisher.notify(5, 1).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::PubSub(_))));
        assert_eq!(bus.calls.load(Ordering::SeqCst), 2);
    }
}
