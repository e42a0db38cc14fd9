use crate::db::store::CountingStore;
use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Direction of a free-capacity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStep {
    /// A car left; one more free space
    Increment,
    /// A car arrived; one less free space
    Decrement,
}

impl CapacityStep {
    pub fn delta(&self) -> i32 {
        match self {
            CapacityStep::Increment => 1,
            CapacityStep::Decrement => -1,
        }
    }

    /// Whether the step may be applied to a zone currently at `free` out of `max`.
    /// Both guards keep the counter inside `[0, max]`.
    pub fn guard_holds(&self, free: i32, max: i32) -> bool {
        match self {
            CapacityStep::Decrement => free > 0 && free <= max,
            CapacityStep::Increment => free < max,
        }
    }
}

/// Result of one guarded counter change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapacityOutcome {
    Applied { free_capacity: i32 },
    /// The guard failed; the counter was left as is
    Skipped { free_capacity: i32 },
    /// No active zone with that id
    UnknownZone,
}

impl CapacityOutcome {
    pub fn applied(&self) -> Option<i32> {
        match self {
            CapacityOutcome::Applied { free_capacity } => Some(*free_capacity),
            _ => None,
        }
    }
}

/// Moves zone counters one space at a time
pub struct CapacityAdjuster {
    store: Arc<dyn CountingStore>,
}

impl CapacityAdjuster {
    pub fn new(store: Arc<dyn CountingStore>) -> Self {
        Self { store }
    }

    pub async fn adjust(&self, zone_id: i32, step: CapacityStep) -> Result<CapacityOutcome> {
        let outcome = self.store.adjust_free_capacity(zone_id, step).await?;

        match outcome {
            CapacityOutcome::Applied { free_capacity } => {
                info!(
                    "Zone {} free capacity {:?} to {}",
                    zone_id, step, free_capacity
                );
            }
            CapacityOutcome::Skipped { free_capacity } => {
                warn!(
                    "Zone {} {:?} skipped, free capacity stays at {}",
                    zone_id, step, free_capacity
                );
            }
            CapacityOutcome::UnknownZone => {
                warn!("Zone {} {:?} skipped, zone is not active", zone_id, step);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryCountingStore;
    use crate::db::models::{zone_models::Zone, Lifecycle};
    use std::collections::BTreeMap;

    async fn adjuster_with_zone(max: i32, free: i32) -> (CapacityAdjuster, Arc<MemoryCountingStore>) {
        let store = Arc::new(MemoryCountingStore::new());
        store.insert_zone(Zone::new(1, BTreeMap::new(), max, free)).await;
        (CapacityAdjuster::new(store.clone()), store)
    }

    #[test]
    fn guards() {
        assert!(CapacityStep::Decrement.guard_holds(1, 10));
        assert!(CapacityStep::Decrement.guard_holds(10, 10));
        assert!(!CapacityStep::Decrement.guard_holds(0, 10));
        assert!(!CapacityStep::Decrement.guard_holds(11, 10));
        assert!(CapacityStep::Increment.guard_holds(0, 10));
        assert!(CapacityStep::Increment.guard_holds(9, 10));
        assert!(!CapacityStep::Increment.guard_holds(10, 10));
    }

    #[tokio::test]
    async fn decrement_stops_at_zero() {
        let (adjuster, store) = adjuster_with_zone(2, 2).await;

        assert_eq!(
            adjuster.adjust(1, CapacityStep::Decrement).await.unwrap(),
            CapacityOutcome::Applied { free_capacity: 1 }
        );
        assert_eq!(
            adjuster.adjust(1, CapacityStep::Decrement).await.unwrap(),
            CapacityOutcome::Applied { free_capacity: 0 }
        );
        assert_eq!(
            adjuster.adjust(1, CapacityStep::Decrement).await.unwrap(),
            CapacityOutcome::Skipped { free_capacity: 0 }
        );
        assert_eq!(store.zone(1).await.unwrap().free_capacity, 0);
    }

    #[tokio::test]
    async fn increment_stops_at_max() {
        let (adjuster, store) = adjuster_with_zone(3, 2).await;

        assert_eq!(
            adjuster.adjust(1, CapacityStep::Increment).await.unwrap(),
            CapacityOutcome::Applied { free_capacity: 3 }
        );
        assert_eq!(
            adjuster.adjust(1, CapacityStep::Increment).await.unwrap(),
            CapacityOutcome::Skipped { free_capacity: 3 }
        );
        assert_eq!(store.zone(1).await.unwrap().free_capacity, 3);
    }

    #[tokio::test]
    async fn bounds_hold_under_mixed_bursts() {
        let (adjuster, store) = adjuster_with_zone(5, 3).await;

        let pattern = [
            CapacityStep::Decrement,
            CapacityStep::Decrement,
            CapacityStep::Decrement,
            CapacityStep::Decrement,
            CapacityStep::Decrement,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
            CapacityStep::Increment,
        ];
        for step in pattern.iter().cycle().take(200) {
            adjuster.adjust(1, *step).await.unwrap();
            let zone = store.zone(1).await.unwrap();
            assert!(zone.free_capacity >= 0 && zone.free_capacity <= zone.max_capacity);
        }
    }

    #[tokio::test]
    async fn concurrent_decrements_never_go_negative() {
        let (adjuster, store) = adjuster_with_zone(10, 10).await;
        let adjuster = Arc::new(adjuster);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let adjuster = adjuster.clone();
                tokio::spawn(async move { adjuster.adjust(1, CapacityStep::Decrement).await })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().applied().is_some() {
                applied += 1;
            }
        }

        assert_eq!(applied, 10);
        assert_eq!(store.zone(1).await.unwrap().free_capacity, 0);
    }

    #[tokio::test]
    async fn disabled_zone_is_unknown() {
        let store = Arc::new(MemoryCountingStore::new());
        let mut zone = Zone::new(7, BTreeMap::new(), 10, 5);
        zone.lifecycle = Lifecycle::Disabled;
        store.insert_zone(zone).await;
        let adjuster = CapacityAdjuster::new(store.clone());

        assert_eq!(
            adjuster.adjust(7, CapacityStep::Decrement).await.unwrap(),
            CapacityOutcome::UnknownZone
        );
        assert_eq!(
            adjuster.adjust(99, CapacityStep::Increment).await.unwrap(),
            CapacityOutcome::UnknownZone
        );
        assert_eq!(store.zone(7).await.unwrap().free_capacity, 5);
    }
}
