use crate::counting::capacity::{CapacityAdjuster, CapacityOutcome, CapacityStep};
use crate::counting::capture::{Capture, Direction};
use crate::counting::registry::Registries;
use crate::counting::signage::{SignNotice, SignagePublisher};
use crate::db::models::camera_models::Camera;
use crate::db::models::present_car_models::{PresentCarWrite, UpsertOutcome};
use crate::db::store::CountingStore;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Zones a sighting moves a car between, and the counter change it implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneTransition {
    pub current_zone_id: i32,
    pub previous_zone_id: i32,
    pub step: Option<CapacityStep>,
}

impl ZoneTransition {
    /// `forward` enters zone-in from zone-out, `reverse` the opposite.
    /// `unknown` records the car in zone-in without touching any counter.
    /// The counter that changes is always the current zone's.
    pub fn resolve(direction: Direction, camera: &Camera) -> Self {
        match direction {
            Direction::Forward => Self {
                current_zone_id: camera.zone_in_id,
                previous_zone_id: camera.zone_out_id,
                step: Some(CapacityStep::Decrement),
            },
            Direction::Reverse => Self {
                current_zone_id: camera.zone_out_id,
                previous_zone_id: camera.zone_in_id,
                step: Some(CapacityStep::Increment),
            },
            Direction::Unknown => Self {
                current_zone_id: camera.zone_in_id,
                previous_zone_id: camera.zone_out_id,
                step: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// No active camera at the capture's address
    UnknownCamera,
    /// The present car could not be written; nothing else was attempted
    Dropped,
    Completed,
}

/// Per-step account of one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub plate: String,
    pub camera_address: String,
    pub status: ReconcileStatus,
    pub camera_id: Option<i32>,
    pub car_details_id: Option<i64>,
    pub transition: Option<ZoneTransition>,
    pub upsert: Option<UpsertOutcome>,
    pub history_appended: bool,
    pub capacity: Option<CapacityOutcome>,
    pub sign_notified: bool,
}

impl ReconcileReport {
    fn new(capture: &Capture, status: ReconcileStatus) -> Self {
        Self {
            plate: capture.plate.clone(),
            camera_address: capture.camera_address.clone(),
            status,
            camera_id: None,
            car_details_id: None,
            transition: None,
            upsert: None,
            history_appended: false,
            capacity: None,
            sign_notified: false,
        }
    }
}

/// Applies captures to present cars, history, zone counters and signs.
/// Steps are not rolled back when a later one fails.
pub struct Reconciler {
    store: Arc<dyn CountingStore>,
    registries: Arc<Registries>,
    capacity: CapacityAdjuster,
    signage: Arc<SignagePublisher>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn CountingStore>,
        registries: Arc<Registries>,
        signage: Arc<SignagePublisher>,
    ) -> Self {
        Self {
            capacity: CapacityAdjuster::new(store.clone()),
            store,
            registries,
            signage,
        }
    }

    pub fn registries(&self) -> &Arc<Registries> {
        &self.registries
    }

    pub async fn process(&self, capture: &Capture) -> ReconcileReport {
        let camera = match self
            .registries
            .cameras
            .camera_by_address(&capture.camera_address)
        {
            Some(camera) => camera,
            None => {
                warn!(
                    "Capture {} from unregistered camera {} ignored",
                    capture.plate, capture.camera_address
                );
                return ReconcileReport::new(capture, ReconcileStatus::UnknownCamera);
            }
        };

        let transition = ZoneTransition::resolve(capture.direction, &camera);
        let mut report = ReconcileReport::new(capture, ReconcileStatus::Completed);
        report.camera_id = Some(camera.cam_id);
        report.transition = Some(transition);

        // A missing detail row only loses the pictures
        report.car_details_id = match self.store.save_car_detail(&capture.car_detail()).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(
                    "Car detail for {} from camera {} not saved: {}",
                    capture.plate, capture.camera_address, e
                );
                None
            }
        };

        let write = PresentCarWrite {
            lpn: capture.plate.clone(),
            camera_id: camera.cam_id,
            current_zone_id: transition.current_zone_id,
            last_zone_id: transition.previous_zone_id,
            direction: capture.direction.to_string(),
            confidence: capture.confidence,
            transaction_date: capture.captured_at,
            car_details_id: report.car_details_id,
            extra: capture.extra(),
        };

        let car = match self.store.upsert_present_car(&write).await {
            Ok((car, outcome)) => {
                info!(
                    "Present car {} {:?} in zone {} (camera {} at {}, {})",
                    car.lpn,
                    outcome,
                    car.current_zone_id,
                    camera.cam_id,
                    capture.camera_address,
                    capture.direction
                );
                report.upsert = Some(outcome);
                car
            }
            Err(e) => {
                error!(
                    "Dropping capture {} from camera {} (zone {}): {}",
                    capture.plate, capture.camera_address, transition.current_zone_id, e
                );
                report.status = ReconcileStatus::Dropped;
                return report;
            }
        };

        match self.store.append_history(&car).await {
            Ok(_) => report.history_appended = true,
            Err(e) => error!(
                "History for {} from camera {} (zone {}) not written: {}",
                car.lpn, capture.camera_address, car.current_zone_id, e
            ),
        }

        let step = match transition.step {
            Some(step) => step,
            None => return report,
        };

        let outcome = match self.capacity.adjust(transition.current_zone_id, step).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Capacity of zone {} not adjusted for {} from camera {}: {}",
                    transition.current_zone_id, car.lpn, capture.camera_address, e
                );
                return report;
            }
        };
        report.capacity = Some(outcome);

        if let Some(free_capacity) = outcome.applied() {
            match self
                .signage
                .notify(transition.current_zone_id, free_capacity)
                .await
            {
                Ok(SignNotice::Published(_)) => report.sign_notified = true,
                Ok(SignNotice::NoSign) => {}
                Err(e) => error!(
                    "Sign for zone {} not updated after {} from camera {}: {}",
                    transition.current_zone_id, car.lpn, capture.camera_address, e
                ),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PubSubConfig;
    use crate::db::memory::MemoryCountingStore;
    use crate::db::models::camera_models::CreateCameraRequest;
    use crate::db::models::car_detail_models::{Picture, PictureKind};
    use crate::db::models::sign_models::{CreateSignRequest, Sign};
    use crate::db::models::zone_models::Zone;
    use crate::messaging::MemoryBus;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    struct Fixture {
        store: Arc<MemoryCountingStore>,
        bus: Arc<MemoryBus>,
        reconciler: Reconciler,
    }

    fn camera_42() -> Camera {
        Camera::from(CreateCameraRequest {
            cam_id: 42,
            cam_name: "gate".to_string(),
            cam_type: "hikvision".to_string(),
            cam_ip: "10.0.0.42".to_string(),
            cam_port: 80,
            cam_user: None,
            cam_password: None,
            zone_in_id: 5,
            zone_out_id: 6,
            direction_hint: "forward".to_string(),
        })
    }

    fn sign_for(zone_id: i32) -> Sign {
        Sign::from(CreateSignRequest {
            sign_id: zone_id * 10,
            sign_name: BTreeMap::new(),
            sign_type: "led".to_string(),
            sign_ip: format!("10.0.1.{}", zone_id),
            sign_port: 5000,
            sign_username: None,
            sign_password: None,
            zone_id,
        })
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryCountingStore::new());
        store.insert_zone(Zone::new(5, BTreeMap::new(), 10, 10)).await;
        store.insert_zone(Zone::new(6, BTreeMap::new(), 10, 5)).await;
        store.insert_camera(camera_42()).await;
        store.insert_sign(sign_for(5)).await;

        let registries = Arc::new(Registries::new());
        registries.reload_all(store.as_ref()).await.unwrap();

        let bus = Arc::new(MemoryBus::new(16));
        let config = PubSubConfig {
            retry_delay_ms: 1,
            ..PubSubConfig::default()
        };
        let signage = Arc::new(SignagePublisher::new(store.clone(), bus.clone(), &config));
        let reconciler = Reconciler::new(store.clone(), registries, signage);

        Fixture {
            store,
            bus,
            reconciler,
        }
    }

    fn capture(plate: &str, direction: Direction, minute: i64) -> Capture {
        Capture {
            plate: plate.to_string(),
            direction,
            confidence: 90,
            camera_address: "10.0.0.42".to_string(),
            captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minute),
            country: None,
            vehicle_type: None,
            pictures: Vec::new(),
        }
    }

    async fn free(store: &MemoryCountingStore, zone_id: i32) -> i32 {
        store.zone(zone_id).await.unwrap().free_capacity
    }

    #[tokio::test]
    async fn entry_exit_scenario() {
        let f = fixture().await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Forward, 0))
            .await;
        assert_eq!(report.status, ReconcileStatus::Completed);
        assert_eq!(report.upsert, Some(UpsertOutcome::Inserted));
        assert!(report.sign_notified);
        let car = f.store.present_car("ABC123").await.unwrap();
        assert_eq!(car.current_zone_id, 5);
        assert_eq!(car.last_zone_id, 6);
        assert_eq!(free(&f.store, 5).await, 9);
        let published = f.bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].sign_address, "10.0.1.5:5000");
        assert_eq!(published[0].free_capacity, 9);

        f.reconciler
            .process(&capture("XYZ999", Direction::Forward, 1))
            .await;
        assert_eq!(free(&f.store, 5).await, 8);

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Reverse, 2))
            .await;
        assert_eq!(report.upsert, Some(UpsertOutcome::Updated));
        let car = f.store.present_car("ABC123").await.unwrap();
        assert_eq!(car.current_zone_id, 6);
        assert_eq!(car.last_zone_id, 5);
        // reverse changes the current zone, which is zone-out
        assert_eq!(free(&f.store, 6).await, 6);
        assert_eq!(free(&f.store, 5).await, 8);
        assert_eq!(
            report.capacity,
            Some(CapacityOutcome::Applied { free_capacity: 6 })
        );
        // zone 6 has no sign
        assert!(!report.sign_notified);
        assert_eq!(f.bus.published().len(), 2);
    }

    #[tokio::test]
    async fn resighting_keeps_one_present_car_and_two_history_rows() {
        let f = fixture().await;

        f.reconciler
            .process(&capture("ABC123", Direction::Unknown, 0))
            .await;
        f.reconciler
            .process(&capture("ABC123", Direction::Unknown, 5))
            .await;

        assert_eq!(f.store.present_car_count().await, 1);
        let car = f.store.present_car("ABC123").await.unwrap();
        assert_eq!(car.transaction_date, capture("ABC123", Direction::Unknown, 5).captured_at);

        let history = f.store.history().await;
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|row| row.lpn == "ABC123"));
        assert!(history[0].transaction_date < history[1].transaction_date);
    }

    #[tokio::test]
    async fn unknown_direction_never_changes_capacity() {
        let f = fixture().await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Unknown, 0))
            .await;

        assert_eq!(report.status, ReconcileStatus::Completed);
        assert_eq!(report.capacity, None);
        assert_eq!(free(&f.store, 5).await, 10);
        assert_eq!(free(&f.store, 6).await, 5);
        assert_eq!(f.store.present_car("ABC123").await.unwrap().current_zone_id, 5);
        assert!(f.bus.published().is_empty());
    }

    #[tokio::test]
    async fn unregistered_camera_writes_nothing() {
        let f = fixture().await;
        let mut stray = capture("ABC123", Direction::Forward, 0);
        stray.camera_address = "10.9.9.9".to_string();

        let report = f.reconciler.process(&stray).await;

        assert_eq!(report.status, ReconcileStatus::UnknownCamera);
        assert_eq!(f.store.present_car_count().await, 0);
        assert_eq!(f.store.car_detail_count().await, 0);
        assert!(f.store.history().await.is_empty());
        assert_eq!(free(&f.store, 5).await, 10);
        assert!(f.bus.published().is_empty());
    }

    #[tokio::test]
    async fn failed_guard_leaves_counter_and_sign_alone() {
        let f = fixture().await;
        f.store.insert_zone(Zone::new(5, BTreeMap::new(), 10, 0)).await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Forward, 0))
            .await;

        assert_eq!(
            report.capacity,
            Some(CapacityOutcome::Skipped { free_capacity: 0 })
        );
        assert_eq!(free(&f.store, 5).await, 0);
        assert!(f.bus.published().is_empty());
        // the sighting itself is still recorded
        assert!(f.store.present_car("ABC123").await.is_some());
    }

    #[tokio::test]
    async fn upsert_failure_drops_the_event() {
        let f = fixture().await;
        f.store.fail_upserts(true).await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Forward, 0))
            .await;

        assert_eq!(report.status, ReconcileStatus::Dropped);
        assert!(f.store.history().await.is_empty());
        assert_eq!(free(&f.store, 5).await, 10);
        assert!(f.bus.published().is_empty());
    }

    #[tokio::test]
    async fn history_failure_does_not_stop_counting() {
        let f = fixture().await;
        f.store.fail_history(true).await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Forward, 0))
            .await;

        assert_eq!(report.status, ReconcileStatus::Completed);
        assert!(!report.history_appended);
        assert_eq!(free(&f.store, 5).await, 9);
        assert!(report.sign_notified);
    }

    #[tokio::test]
    async fn present_car_and_history_point_at_the_car_detail() {
        let f = fixture().await;
        let mut sighting = capture("ABC123", Direction::Forward, 0);
        sighting.pictures.push(Picture {
            kind: PictureKind::Plate,
            content_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8],
        });

        let report = f.reconciler.process(&sighting).await;

        let id = report.car_details_id.unwrap();
        assert_eq!(f.store.present_car("ABC123").await.unwrap().car_details_id, Some(id));
        assert_eq!(f.store.history().await[0].car_details_id, Some(id));
        let detail = f.store.car_detail(id).await.unwrap();
        assert_eq!(detail.plate_image, Some(vec![0xff, 0xd8]));
        assert_eq!(detail.scene_image, None);
        assert_eq!(detail.cam_body["plate"], "ABC123");
    }

    #[tokio::test]
    async fn car_detail_failure_keeps_counting() {
        let f = fixture().await;
        f.store.fail_car_details(true).await;

        let report = f
            .reconciler
            .process(&capture("ABC123", Direction::Forward, 0))
            .await;

        assert_eq!(report.status, ReconcileStatus::Completed);
        assert_eq!(report.car_details_id, None);
        assert_eq!(f.store.present_car("ABC123").await.unwrap().car_details_id, None);
        assert_eq!(free(&f.store, 5).await, 9);
    }
}
