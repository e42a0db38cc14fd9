use crate::counting::capacity::{CapacityOutcome, CapacityStep};
use crate::db::models::{
    camera_models::Camera,
    car_detail_models::NewCarDetail,
    present_car_models::{PresentCar, PresentCarHistory, PresentCarWrite, UpsertOutcome},
    settings_models::Settings,
    sign_models::Sign,
    zone_models::Zone,
};
use crate::db::repositories::{
    cameras::CamerasRepository, car_details::CarDetailsRepository, history::HistoryRepository,
    present_cars::PresentCarsRepository, settings::SettingsRepository, signs::SignsRepository,
    zones::ZonesRepository,
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Everything the counting pipeline and its maintenance jobs read or write
#[async_trait]
pub trait CountingStore: Send + Sync {
    async fn active_zones(&self) -> Result<Vec<Zone>>;

    async fn active_cameras(&self) -> Result<Vec<Camera>>;

    /// Store the payload and pictures of one sighting, returning the row id
    async fn save_car_detail(&self, detail: &NewCarDetail) -> Result<i64>;

    /// Insert or overwrite the row for `write.lpn` in one atomic step
    async fn upsert_present_car(&self, write: &PresentCarWrite)
        -> Result<(PresentCar, UpsertOutcome)>;

    async fn append_history(&self, car: &PresentCar) -> Result<PresentCarHistory>;

    /// Guarded single-statement counter change, see [`CapacityStep`]
    async fn adjust_free_capacity(&self, zone_id: i32, step: CapacityStep)
        -> Result<CapacityOutcome>;

    async fn sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>>;

    async fn settings(&self) -> Result<Settings>;

    async fn reset_present_cars(&self) -> Result<u64>;
}

/// PostgreSQL backed store
#[derive(Clone)]
pub struct PgCountingStore {
    zones: ZonesRepository,
    cameras: CamerasRepository,
    car_details: CarDetailsRepository,
    signs: SignsRepository,
    present_cars: PresentCarsRepository,
    history: HistoryRepository,
    settings: SettingsRepository,
}

impl PgCountingStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            zones: ZonesRepository::new(pool.clone()),
            cameras: CamerasRepository::new(pool.clone()),
            car_details: CarDetailsRepository::new(pool.clone()),
            signs: SignsRepository::new(pool.clone()),
            present_cars: PresentCarsRepository::new(pool.clone()),
            history: HistoryRepository::new(pool.clone()),
            settings: SettingsRepository::new(pool),
        }
    }
}

#[async_trait]
impl CountingStore for PgCountingStore {
    async fn active_zones(&self) -> Result<Vec<Zone>> {
        self.zones.get_active().await
    }

    async fn active_cameras(&self) -> Result<Vec<Camera>> {
        self.cameras.get_active().await
    }

    async fn save_car_detail(&self, detail: &NewCarDetail) -> Result<i64> {
        self.car_details.create(detail).await
    }

    async fn upsert_present_car(
        &self,
        write: &PresentCarWrite,
    ) -> Result<(PresentCar, UpsertOutcome)> {
        self.present_cars.upsert(write).await
    }

    async fn append_history(&self, car: &PresentCar) -> Result<PresentCarHistory> {
        self.history.append(car).await
    }

    async fn adjust_free_capacity(
        &self,
        zone_id: i32,
        step: CapacityStep,
    ) -> Result<CapacityOutcome> {
        let applied = match step {
            CapacityStep::Decrement => self.zones.decrement_free_capacity(zone_id).await?,
            CapacityStep::Increment => self.zones.increment_free_capacity(zone_id).await?,
        };

        if let Some(free_capacity) = applied {
            return Ok(CapacityOutcome::Applied { free_capacity });
        }

        Ok(match self.zones.free_capacity(zone_id).await? {
            Some(free_capacity) => CapacityOutcome::Skipped { free_capacity },
            None => CapacityOutcome::UnknownZone,
        })
    }

    async fn sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        self.signs.get_active_by_zone(zone_id).await
    }

    async fn settings(&self) -> Result<Settings> {
        self.settings.get().await
    }

    async fn reset_present_cars(&self) -> Result<u64> {
        self.present_cars.delete_all().await
    }
}
