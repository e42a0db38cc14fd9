use crate::messaging::bus::SignBus;
use crate::messaging::event::SignUpdate;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

/// In-process sign bus. Keeps the last `capacity` published updates for inspection.
pub struct MemoryBus {
    sender: broadcast::Sender<SignUpdate>,
    capacity: usize,
    published: Mutex<VecDeque<SignUpdate>>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            published: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignUpdate> {
        self.sender.subscribe()
    }

    /// Most recent updates, oldest first
    pub fn published(&self) -> Vec<SignUpdate> {
        self.history().iter().cloned().collect()
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<SignUpdate>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SignBus for MemoryBus {
    async fn publish(&self, update: &SignUpdate) -> Result<()> {
        {
            let mut history = self.history();
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(update.clone());
        }

        // No subscriber is not an error, same as PUBLISH to an empty channel
        let receivers = self.sender.send(update.clone()).unwrap_or(0);
        debug!(
            "Published sign {} = {} to {} receivers",
            update.sign_address, update.free_capacity, receivers
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
