use crate::db::models::{
    audit_models::{AuditQuery, NewUserAudit, UserAudit},
    camera_models::Camera,
    car_detail_models::CarDetail,
    error_message_models::ErrorMessage,
    present_car_models::{HistoryQuery, PresentCar, PresentCarHistory, PresentCarQuery},
    settings_models::Settings,
    sign_models::Sign,
    zone_image_models::{ZoneImage, ZoneImageRequest},
    zone_models::Zone,
    Lifecycle,
};
use crate::db::repositories::{
    audit::AuditRepository, cameras::CamerasRepository, car_details::CarDetailsRepository,
    error_messages::ErrorMessagesRepository, history::HistoryRepository,
    present_cars::PresentCarsRepository, settings::SettingsRepository, signs::SignsRepository,
    zone_images::ZoneImagesRepository, zones::ZonesRepository,
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Reference data and read models behind the back-office, third-party and
/// PKA routes.
///
/// Creates fail with `Error::AlreadyExists` on a duplicate key. Updates and
/// lifecycle changes never touch deleted rows.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn zones(&self, include_deleted: bool) -> Result<Vec<Zone>>;

    async fn zone(&self, zone_id: i32) -> Result<Option<Zone>>;

    async fn create_zone(&self, zone: &Zone) -> Result<Zone>;

    /// Name, maximum and extra data. The stored free capacity, or
    /// `free_capacity` when given, is clamped to the new maximum.
    async fn update_zone(&self, zone: &Zone, free_capacity: Option<i32>) -> Result<Zone>;

    async fn set_zone_lifecycle(&self, zone_id: i32, lifecycle: Lifecycle) -> Result<bool>;

    /// Live cameras and signs that point at the zone
    async fn zone_references(&self, zone_id: i32) -> Result<i64>;

    /// Free capacity of an active zone
    async fn zone_free_capacity(&self, zone_id: i32) -> Result<Option<i32>>;

    async fn cameras(&self, include_deleted: bool) -> Result<Vec<Camera>>;

    async fn camera(&self, cam_id: i32) -> Result<Option<Camera>>;

    async fn live_camera_by_ip(&self, cam_ip: &str) -> Result<Option<Camera>>;

    async fn create_camera(&self, camera: &Camera) -> Result<Camera>;

    async fn update_camera(&self, camera: &Camera) -> Result<Camera>;

    async fn set_camera_lifecycle(&self, cam_id: i32, lifecycle: Lifecycle) -> Result<bool>;

    async fn signs(&self, include_deleted: bool) -> Result<Vec<Sign>>;

    async fn sign(&self, sign_id: i32) -> Result<Option<Sign>>;

    async fn live_sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>>;

    async fn create_sign(&self, sign: &Sign) -> Result<Sign>;

    async fn update_sign(&self, sign: &Sign) -> Result<Sign>;

    async fn set_sign_lifecycle(&self, sign_id: i32, lifecycle: Lifecycle) -> Result<bool>;

    async fn load_settings(&self) -> Result<Settings>;

    async fn save_settings(&self, settings: &Settings) -> Result<Settings>;

    async fn present_cars(&self, query: &PresentCarQuery) -> Result<Vec<PresentCar>>;

    async fn present_car(&self, lpn: &str) -> Result<Option<PresentCar>>;

    /// Plates containing `fragment`, most recent first
    async fn search_present_cars(&self, fragment: &str, limit: i64) -> Result<Vec<PresentCar>>;

    async fn delete_present_car(&self, lpn: &str) -> Result<bool>;

    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<PresentCarHistory>>;

    /// Newest first, without picture bytes
    async fn car_details(&self, limit: Option<i64>) -> Result<Vec<CarDetail>>;

    async fn car_detail(&self, id: i64) -> Result<Option<CarDetail>>;

    /// Present cars and history rows keep their place but lose the link
    async fn delete_car_detail(&self, id: i64) -> Result<bool>;

    async fn zone_images(&self, zone_id: i32) -> Result<Vec<ZoneImage>>;

    async fn zone_image(&self, zone_id: i32, language: &str) -> Result<Option<ZoneImage>>;

    async fn save_zone_image(
        &self,
        zone_id: i32,
        language: &str,
        image: &ZoneImageRequest,
    ) -> Result<ZoneImage>;

    async fn delete_zone_image(&self, zone_id: i32, language: &str) -> Result<bool>;

    async fn error_messages(&self) -> Result<Vec<ErrorMessage>>;

    async fn error_message(&self, code: i32) -> Result<Option<ErrorMessage>>;

    /// Add or replace languages of a code
    async fn merge_error_message(
        &self,
        code: i32,
        messages: &BTreeMap<String, String>,
    ) -> Result<ErrorMessage>;

    async fn remove_error_language(&self, code: i32, language: &str)
        -> Result<Option<ErrorMessage>>;

    async fn record_audit(&self, entry: &NewUserAudit) -> Result<UserAudit>;

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<UserAudit>>;
}

/// PostgreSQL backed catalog
#[derive(Clone)]
pub struct PgCatalogStore {
    zones: ZonesRepository,
    cameras: CamerasRepository,
    signs: SignsRepository,
    settings: SettingsRepository,
    present_cars: PresentCarsRepository,
    history: HistoryRepository,
    car_details: CarDetailsRepository,
    zone_images: ZoneImagesRepository,
    error_messages: ErrorMessagesRepository,
    audit: AuditRepository,
}

impl PgCatalogStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            zones: ZonesRepository::new(pool.clone()),
            cameras: CamerasRepository::new(pool.clone()),
            signs: SignsRepository::new(pool.clone()),
            settings: SettingsRepository::new(pool.clone()),
            present_cars: PresentCarsRepository::new(pool.clone()),
            history: HistoryRepository::new(pool.clone()),
            car_details: CarDetailsRepository::new(pool.clone()),
            zone_images: ZoneImagesRepository::new(pool.clone()),
            error_messages: ErrorMessagesRepository::new(pool.clone()),
            audit: AuditRepository::new(pool),
        }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn zones(&self, include_deleted: bool) -> Result<Vec<Zone>> {
        self.zones.get_all(include_deleted).await
    }

    async fn zone(&self, zone_id: i32) -> Result<Option<Zone>> {
        self.zones.get_by_id(zone_id).await
    }

    async fn create_zone(&self, zone: &Zone) -> Result<Zone> {
        self.zones.create(zone).await
    }

    async fn update_zone(&self, zone: &Zone, free_capacity: Option<i32>) -> Result<Zone> {
        self.zones.update(zone, free_capacity).await
    }

    async fn set_zone_lifecycle(&self, zone_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        self.zones.set_lifecycle(zone_id, lifecycle).await
    }

    async fn zone_references(&self, zone_id: i32) -> Result<i64> {
        self.zones.count_references(zone_id).await
    }

    async fn zone_free_capacity(&self, zone_id: i32) -> Result<Option<i32>> {
        self.zones.free_capacity(zone_id).await
    }

    async fn cameras(&self, include_deleted: bool) -> Result<Vec<Camera>> {
        self.cameras.get_all(include_deleted).await
    }

    async fn camera(&self, cam_id: i32) -> Result<Option<Camera>> {
        self.cameras.get_by_id(cam_id).await
    }

    async fn live_camera_by_ip(&self, cam_ip: &str) -> Result<Option<Camera>> {
        self.cameras.get_by_ip(cam_ip).await
    }

    async fn create_camera(&self, camera: &Camera) -> Result<Camera> {
        self.cameras.create(camera).await
    }

    async fn update_camera(&self, camera: &Camera) -> Result<Camera> {
        self.cameras.update(camera).await
    }

    async fn set_camera_lifecycle(&self, cam_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        self.cameras.set_lifecycle(cam_id, lifecycle).await
    }

    async fn signs(&self, include_deleted: bool) -> Result<Vec<Sign>> {
        self.signs.get_all(include_deleted).await
    }

    async fn sign(&self, sign_id: i32) -> Result<Option<Sign>> {
        self.signs.get_by_id(sign_id).await
    }

    async fn live_sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        self.signs.get_live_by_zone(zone_id).await
    }

    async fn create_sign(&self, sign: &Sign) -> Result<Sign> {
        self.signs.create(sign).await
    }

    async fn update_sign(&self, sign: &Sign) -> Result<Sign> {
        self.signs.update(sign).await
    }

    async fn set_sign_lifecycle(&self, sign_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        self.signs.set_lifecycle(sign_id, lifecycle).await
    }

    async fn load_settings(&self) -> Result<Settings> {
        self.settings.get().await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings> {
        self.settings.save(settings).await
    }

    async fn present_cars(&self, query: &PresentCarQuery) -> Result<Vec<PresentCar>> {
        self.present_cars.list(query).await
    }

    async fn present_car(&self, lpn: &str) -> Result<Option<PresentCar>> {
        self.present_cars.get_by_lpn(lpn).await
    }

    async fn search_present_cars(&self, fragment: &str, limit: i64) -> Result<Vec<PresentCar>> {
        self.present_cars.search_by_lpn(fragment, limit).await
    }

    async fn delete_present_car(&self, lpn: &str) -> Result<bool> {
        self.present_cars.delete_by_lpn(lpn).await
    }

    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<PresentCarHistory>> {
        self.history.search(query).await
    }

    async fn car_details(&self, limit: Option<i64>) -> Result<Vec<CarDetail>> {
        self.car_details.list(limit).await
    }

    async fn car_detail(&self, id: i64) -> Result<Option<CarDetail>> {
        self.car_details.get_by_id(id).await
    }

    async fn delete_car_detail(&self, id: i64) -> Result<bool> {
        self.car_details.delete(id).await
    }

    async fn zone_images(&self, zone_id: i32) -> Result<Vec<ZoneImage>> {
        self.zone_images.get_by_zone(zone_id).await
    }

    async fn zone_image(&self, zone_id: i32, language: &str) -> Result<Option<ZoneImage>> {
        self.zone_images.get(zone_id, language).await
    }

    async fn save_zone_image(
        &self,
        zone_id: i32,
        language: &str,
        image: &ZoneImageRequest,
    ) -> Result<ZoneImage> {
        self.zone_images
            .upsert(
                zone_id,
                language,
                &image.image_small,
                &image.image_large,
                image.extra.as_ref(),
            )
            .await
    }

    async fn delete_zone_image(&self, zone_id: i32, language: &str) -> Result<bool> {
        self.zone_images.delete(zone_id, language).await
    }

    async fn error_messages(&self) -> Result<Vec<ErrorMessage>> {
        self.error_messages.get_all().await
    }

    async fn error_message(&self, code: i32) -> Result<Option<ErrorMessage>> {
        self.error_messages.get(code).await
    }

    async fn merge_error_message(
        &self,
        code: i32,
        messages: &BTreeMap<String, String>,
    ) -> Result<ErrorMessage> {
        self.error_messages.merge(code, messages).await
    }

    async fn remove_error_language(
        &self,
        code: i32,
        language: &str,
    ) -> Result<Option<ErrorMessage>> {
        self.error_messages.remove_language(code, language).await
    }

    async fn record_audit(&self, entry: &NewUserAudit) -> Result<UserAudit> {
        self.audit.append(entry).await
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<UserAudit>> {
        self.audit.search(query).await
    }
}
