use crate::db::models::{camera_models::Camera, zone_models::Zone};
use crate::db::store::CountingStore;
use anyhow::Result;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Immutable value published by a single pointer swap.
/// Readers clone the `Arc` and never observe a half-built value.
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    pub fn load(&self) -> Arc<T> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn store(&self, value: T) {
        let value = Arc::new(value);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = value;
    }
}

/// Active zones by id
pub struct ZoneRegistry {
    snapshot: Snapshot<HashMap<i32, Zone>>,
    // Held from the store read to the swap so an older read never replaces a newer one
    reload_lock: Mutex<()>,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::new(HashMap::new()),
            reload_lock: Mutex::new(()),
        }
    }

    /// Rebuild from the store and publish the result.
    /// Concurrent reloads run one after the other.
    pub async fn reload(&self, store: &dyn CountingStore) -> Result<usize> {
        let _reload = self.reload_lock.lock().await;
        let zones: HashMap<i32, Zone> = store
            .active_zones()
            .await?
            .into_iter()
            .map(|zone| (zone.zone_id, zone))
            .collect();
        let count = zones.len();

        self.snapshot.store(zones);
        info!("Zone registry loaded with {} zones", count);

        Ok(count)
    }

    pub fn zone(&self, zone_id: i32) -> Option<Zone> {
        self.snapshot.load().get(&zone_id).cloned()
    }

    pub fn contains(&self, zone_id: i32) -> bool {
        self.snapshot.load().contains_key(&zone_id)
    }

    pub fn all(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.snapshot.load().values().cloned().collect();
        zones.sort_by_key(|zone| zone.zone_id);
        zones
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct CameraIndex {
    by_address: HashMap<String, Camera>,
    ids: HashMap<i32, String>,
}

/// Active cameras by network address
pub struct CameraRegistry {
    snapshot: Snapshot<CameraIndex>,
    reload_lock: Mutex<()>,
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::new(CameraIndex::default()),
            reload_lock: Mutex::new(()),
        }
    }

    /// Rebuild from the store and publish the result.
    /// Concurrent reloads run one after the other.
    pub async fn reload(&self, store: &dyn CountingStore) -> Result<usize> {
        let _reload = self.reload_lock.lock().await;
        let mut index = CameraIndex::default();
        for camera in store.active_cameras().await? {
            index.ids.insert(camera.cam_id, camera.cam_ip.clone());
            index.by_address.insert(camera.cam_ip.clone(), camera);
        }
        let count = index.by_address.len();

        self.snapshot.store(index);
        info!("Camera registry loaded with {} cameras", count);

        Ok(count)
    }

    pub fn camera_by_address(&self, address: &str) -> Option<Camera> {
        self.snapshot.load().by_address.get(address).cloned()
    }

    pub fn contains(&self, cam_id: i32) -> bool {
        self.snapshot.load().ids.contains_key(&cam_id)
    }

    pub fn all(&self) -> Vec<Camera> {
        let mut cameras: Vec<Camera> = self.snapshot.load().by_address.values().cloned().collect();
        cameras.sort_by_key(|camera| camera.cam_id);
        cameras
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both registries, reloaded together at startup
#[derive(Default)]
pub struct Registries {
    pub zones: ZoneRegistry,
    pub cameras: CameraRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reload_all(&self, store: &dyn CountingStore) -> Result<()> {
        self.zones.reload(store).await?;
        self.cameras.reload(store).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::capacity::{CapacityOutcome, CapacityStep};
    use crate::db::memory::MemoryCountingStore;
    use crate::db::models::camera_models::CreateCameraRequest;
    use crate::db::models::car_detail_models::NewCarDetail;
    use crate::db::models::present_car_models::{
        PresentCar, PresentCarHistory, PresentCarWrite, UpsertOutcome,
    };
    use crate::db::models::settings_models::Settings;
    use crate::db::models::sign_models::Sign;
    use crate::db::models::Lifecycle;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Holds on to the first camera read for a while, like a slow query
    struct SlowFirstRead {
        inner: MemoryCountingStore,
        slowed: AtomicBool,
        read_taken: Notify,
    }

    #[async_trait]
    impl CountingStore for SlowFirstRead {
        async fn active_zones(&self) -> Result<Vec<Zone>> {
            self.inner.active_zones().await
        }

        async fn active_cameras(&self) -> Result<Vec<Camera>> {
            let cameras = self.inner.active_cameras().await?;
            if !self.slowed.swap(true, Ordering::SeqCst) {
                self.read_taken.notify_one();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(cameras)
        }

        async fn save_car_detail(&self, detail: &NewCarDetail) -> Result<i64> {
            self.inner.save_car_detail(detail).await
        }

        async fn upsert_present_car(
            &self,
            write: &PresentCarWrite,
        ) -> Result<(PresentCar, UpsertOutcome)> {
            self.inner.upsert_present_car(write).await
        }

        async fn append_history(&self, car: &PresentCar) -> Result<PresentCarHistory> {
            self.inner.append_history(car).await
        }

        async fn adjust_free_capacity(
            &self,
            zone_id: i32,
            step: CapacityStep,
        ) -> Result<CapacityOutcome> {
            self.inner.adjust_free_capacity(zone_id, step).await
        }

        async fn sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
            self.inner.sign_for_zone(zone_id).await
        }

        async fn settings(&self) -> Result<Settings> {
            self.inner.settings().await
        }

        async fn reset_present_cars(&self) -> Result<u64> {
            self.inner.reset_present_cars().await
        }
    }

    fn camera(cam_id: i32, ip: &str) -> Camera {
        Camera::from(CreateCameraRequest {
            cam_id,
            cam_name: format!("cam {}", cam_id),
            cam_type: "hikvision".to_string(),
            cam_ip: ip.to_string(),
            cam_port: 80,
            cam_user: None,
            cam_password: None,
            zone_in_id: 1,
            zone_out_id: 2,
            direction_hint: "unknown".to_string(),
        })
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let snapshot = Snapshot::new(vec![1, 2, 3]);
        let before = snapshot.load();

        snapshot.store(vec![4]);

        assert_eq!(*before, vec![1, 2, 3]);
        assert_eq!(*snapshot.load(), vec![4]);
    }

    #[tokio::test]
    async fn reload_replaces_zone_set() {
        let store = MemoryCountingStore::new();
        store.insert_zone(Zone::new(1, BTreeMap::new(), 10, 10)).await;
        let mut disabled = Zone::new(2, BTreeMap::new(), 10, 10);
        disabled.lifecycle = Lifecycle::Disabled;
        store.insert_zone(disabled).await;

        let registry = ZoneRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.reload(&store).await.unwrap(), 1);
        assert!(registry.contains(1));
        assert!(!registry.contains(2));

        store.insert_zone(Zone::new(3, BTreeMap::new(), 5, 5)).await;
        registry.reload(&store).await.unwrap();
        let ids: Vec<i32> = registry.all().iter().map(|zone| zone.zone_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn cameras_resolve_by_address() {
        let store = MemoryCountingStore::new();
        store.insert_camera(camera(42, "10.0.0.42")).await;
        let mut deleted = camera(43, "10.0.0.43");
        deleted.lifecycle = Lifecycle::Deleted;
        store.insert_camera(deleted).await;

        let registry = CameraRegistry::new();
        registry.reload(&store).await.unwrap();

        assert_eq!(registry.camera_by_address("10.0.0.42").unwrap().cam_id, 42);
        assert!(registry.camera_by_address("10.0.0.43").is_none());
        assert!(registry.contains(42));
        assert!(!registry.contains(43));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_snapshots() {
        let registry = Arc::new(ZoneRegistry::new());
        let store = Arc::new(MemoryCountingStore::new());
        for id in 0..50 {
            store.insert_zone(Zone::new(id, BTreeMap::new(), 1, 1)).await;
        }

        let reader = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..1000 {
                    let len = registry.len();
                    assert!(len == 0 || len == 50);
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..20 {
            registry.reload(store.as_ref()).await.unwrap();
        }
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn stale_reload_does_not_overwrite_a_newer_one() {
        let store = Arc::new(SlowFirstRead {
            inner: MemoryCountingStore::new(),
            slowed: AtomicBool::new(false),
            read_taken: Notify::new(),
        });
        store.inner.insert_camera(camera(7, "10.0.0.7")).await;
        let registry = Arc::new(CameraRegistry::new());

        // A reads camera 7, then stalls before publishing
        let first = {
            let registry = registry.clone();
            let store = store.clone();
            tokio::spawn(async move { registry.reload(store.as_ref()).await })
        };
        store.read_taken.notified().await;

        let mut deleted = camera(7, "10.0.0.7");
        deleted.lifecycle = Lifecycle::Deleted;
        store.inner.insert_camera(deleted).await;

        // B starts after the delete and must be the one that sticks
        registry.reload(store.as_ref()).await.unwrap();
        first.await.unwrap().unwrap();

        assert!(!registry.contains(7));
        assert!(registry.camera_by_address("10.0.0.7").is_none());
        assert!(registry.is_empty());
    }
}
