use crate::counting::capacity::{CapacityOutcome, CapacityStep};
use crate::db::catalog::CatalogStore;
use crate::db::models::{
    audit_models::{AuditQuery, NewUserAudit, UserAudit},
    camera_models::Camera,
    car_detail_models::{CarDetail, NewCarDetail},
    error_message_models::ErrorMessage,
    present_car_models::{
        HistoryQuery, PresentCar, PresentCarHistory, PresentCarQuery, PresentCarWrite,
        UpsertOutcome,
    },
    settings_models::Settings,
    sign_models::Sign,
    zone_image_models::{ZoneImage, ZoneImageRequest},
    zone_models::Zone,
    Lifecycle,
};
use crate::db::store::CountingStore;
use crate::error::Error;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Default)]
struct MemoryState {
    zones: BTreeMap<i32, Zone>,
    cameras: BTreeMap<i32, Camera>,
    signs: BTreeMap<i32, Sign>,
    present_cars: BTreeMap<String, PresentCar>,
    history: Vec<PresentCarHistory>,
    settings: Settings,
    car_details: BTreeMap<i64, CarDetail>,
    zone_images: BTreeMap<(i32, String), ZoneImage>,
    error_messages: BTreeMap<i32, ErrorMessage>,
    audit: Vec<UserAudit>,
    next_present_id: i64,
    next_car_detail_id: i64,
    next_zone_image_id: i32,
    fail_upserts: bool,
    fail_history: bool,
    fail_car_details: bool,
}

fn page<T>(rows: impl Iterator<Item = T>, limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).max(0) as usize;
    rows.skip(offset).take(limit).collect()
}

/// In-process store with the same guards and key checks as the SQL one
#[derive(Default)]
pub struct MemoryCountingStore {
    state: Mutex<MemoryState>,
}

impl MemoryCountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_zone(&self, zone: Zone) {
        self.state.lock().await.zones.insert(zone.zone_id, zone);
    }

    pub async fn insert_camera(&self, camera: Camera) {
        self.state.lock().await.cameras.insert(camera.cam_id, camera);
    }

    pub async fn insert_sign(&self, sign: Sign) {
        self.state.lock().await.signs.insert(sign.sign_id, sign);
    }

    pub async fn set_settings(&self, settings: Settings) {
        self.state.lock().await.settings = settings;
    }

    pub async fn zone(&self, zone_id: i32) -> Option<Zone> {
        self.state.lock().await.zones.get(&zone_id).cloned()
    }

    pub async fn present_car(&self, lpn: &str) -> Option<PresentCar> {
        self.state.lock().await.present_cars.get(lpn).cloned()
    }

    pub async fn present_car_count(&self) -> usize {
        self.state.lock().await.present_cars.len()
    }

    pub async fn history(&self) -> Vec<PresentCarHistory> {
        self.state.lock().await.history.clone()
    }

    /// Make every following upsert fail
    pub async fn fail_upserts(&self, fail: bool) {
        self.state.lock().await.fail_upserts = fail;
    }

    /// Make every following history append fail
    pub async fn fail_history(&self, fail: bool) {
        self.state.lock().await.fail_history = fail;
    }

    /// Make every following car detail write fail
    pub async fn fail_car_details(&self, fail: bool) {
        self.state.lock().await.fail_car_details = fail;
    }

    pub async fn car_detail_count(&self) -> usize {
        self.state.lock().await.car_details.len()
    }

    pub async fn car_detail(&self, id: i64) -> Option<CarDetail> {
        self.state.lock().await.car_details.get(&id).cloned()
    }

    pub async fn audit_trail(&self) -> Vec<UserAudit> {
        self.state.lock().await.audit.clone()
    }
}

#[async_trait]
impl CountingStore for MemoryCountingStore {
    async fn active_zones(&self) -> Result<Vec<Zone>> {
        let state = self.state.lock().await;
        Ok(state
            .zones
            .values()
            .filter(|zone| zone.lifecycle == Lifecycle::Active)
            .cloned()
            .collect())
    }

    async fn active_cameras(&self) -> Result<Vec<Camera>> {
        let state = self.state.lock().await;
        Ok(state
            .cameras
            .values()
            .filter(|camera| camera.lifecycle == Lifecycle::Active)
            .cloned()
            .collect())
    }

    async fn save_car_detail(&self, detail: &NewCarDetail) -> Result<i64> {
        let mut state = self.state.lock().await;
        if state.fail_car_details {
            return Err(Error::Database("Failed to create car detail: injected".to_string()).into());
        }

        state.next_car_detail_id += 1;
        let id = state.next_car_detail_id;
        let plate = detail.plate_image.as_ref();
        let scene = detail.scene_image.as_ref();
        state.car_details.insert(
            id,
            CarDetail {
                id,
                cam_body: detail.cam_body.clone(),
                plate_image: plate.map(|picture| picture.data.clone()),
                plate_image_type: plate.map(|picture| picture.content_type.clone()),
                scene_image: scene.map(|picture| picture.data.clone()),
                scene_image_type: scene.map(|picture| picture.content_type.clone()),
                extra: None,
                created_at: Utc::now(),
            },
        );

        Ok(id)
    }

    async fn upsert_present_car(
        &self,
        write: &PresentCarWrite,
    ) -> Result<(PresentCar, UpsertOutcome)> {
        let mut state = self.state.lock().await;
        if state.fail_upserts {
            return Err(Error::Database("Failed to upsert present car: injected".to_string()).into());
        }

        if let Some(car) = state.present_cars.get_mut(&write.lpn) {
            car.camera_id = write.camera_id;
            car.current_zone_id = write.current_zone_id;
            car.last_zone_id = write.last_zone_id;
            car.direction = write.direction.clone();
            car.confidence = write.confidence;
            car.transaction_date = write.transaction_date;
            car.car_details_id = write.car_details_id;
            car.extra = write.extra.clone();
            return Ok((car.clone(), UpsertOutcome::Updated));
        }

        state.next_present_id += 1;
        let car = PresentCar {
            id: state.next_present_id,
            lpn: write.lpn.clone(),
            camera_id: write.camera_id,
            current_zone_id: write.current_zone_id,
            last_zone_id: write.last_zone_id,
            direction: write.direction.clone(),
            confidence: write.confidence,
            transaction_date: write.transaction_date,
            car_details_id: write.car_details_id,
            extra: write.extra.clone(),
        };
        state.present_cars.insert(car.lpn.clone(), car.clone());

        Ok((car, UpsertOutcome::Inserted))
    }

    async fn append_history(&self, car: &PresentCar) -> Result<PresentCarHistory> {
        let mut state = self.state.lock().await;
        if state.fail_history {
            return Err(
                Error::Database("Failed to append present car history: injected".to_string())
                    .into(),
            );
        }

        let row = PresentCarHistory {
            id: state.history.len() as i64 + 1,
            lpn: car.lpn.clone(),
            camera_id: car.camera_id,
            current_zone_id: car.current_zone_id,
            last_zone_id: car.last_zone_id,
            direction: car.direction.clone(),
            confidence: car.confidence,
            transaction_date: car.transaction_date,
            car_details_id: car.car_details_id,
            extra: car.extra.clone(),
        };
        state.history.push(row.clone());

        Ok(row)
    }

    async fn adjust_free_capacity(
        &self,
        zone_id: i32,
        step: CapacityStep,
    ) -> Result<CapacityOutcome> {
        let mut state = self.state.lock().await;
        let zone = match state.zones.get_mut(&zone_id) {
            Some(zone) if zone.lifecycle == Lifecycle::Active => zone,
            _ => return Ok(CapacityOutcome::UnknownZone),
        };

        if !step.guard_holds(zone.free_capacity, zone.max_capacity) {
            return Ok(CapacityOutcome::Skipped {
                free_capacity: zone.free_capacity,
            });
        }

        zone.free_capacity += step.delta();
        zone.last_update = Utc::now();

        Ok(CapacityOutcome::Applied {
            free_capacity: zone.free_capacity,
        })
    }

    async fn sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        let state = self.state.lock().await;
        Ok(state
            .signs
            .values()
            .find(|sign| sign.zone_id == zone_id && sign.lifecycle == Lifecycle::Active)
            .cloned())
    }

    async fn settings(&self) -> Result<Settings> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn reset_present_cars(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        let removed = state.present_cars.len() as u64;
        state.present_cars.clear();
        Ok(removed)
    }
}

#[async_trait]
impl CatalogStore for MemoryCountingStore {
    async fn zones(&self, include_deleted: bool) -> Result<Vec<Zone>> {
        let state = self.state.lock().await;
        Ok(state
            .zones
            .values()
            .filter(|zone| include_deleted || zone.lifecycle.is_live())
            .cloned()
            .collect())
    }

    async fn zone(&self, zone_id: i32) -> Result<Option<Zone>> {
        Ok(self.state.lock().await.zones.get(&zone_id).cloned())
    }

    async fn create_zone(&self, zone: &Zone) -> Result<Zone> {
        let mut state = self.state.lock().await;
        if state.zones.contains_key(&zone.zone_id) {
            return Err(Error::AlreadyExists(format!("Zone {} already exists", zone.zone_id)).into());
        }
        state.zones.insert(zone.zone_id, zone.clone());
        Ok(zone.clone())
    }

    async fn update_zone(&self, zone: &Zone, free_capacity: Option<i32>) -> Result<Zone> {
        let mut state = self.state.lock().await;
        let stored = state
            .zones
            .get_mut(&zone.zone_id)
            .filter(|stored| stored.lifecycle.is_live())
            .ok_or_else(|| Error::NotFound(format!("Zone {} not found", zone.zone_id)))?;

        stored.name = zone.name.clone();
        stored.max_capacity = zone.max_capacity;
        stored.free_capacity = free_capacity
            .unwrap_or(stored.free_capacity)
            .min(zone.max_capacity);
        stored.extra = zone.extra.clone();
        stored.last_update = Utc::now();

        Ok(stored.clone())
    }

    async fn set_zone_lifecycle(&self, zone_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.zones.get_mut(&zone_id) {
            Some(zone) if zone.lifecycle.is_live() => {
                zone.lifecycle = lifecycle;
                zone.last_update = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn zone_references(&self, zone_id: i32) -> Result<i64> {
        let state = self.state.lock().await;
        let cameras = state
            .cameras
            .values()
            .filter(|camera| camera.lifecycle.is_live())
            .filter(|camera| camera.zone_in_id == zone_id || camera.zone_out_id == zone_id)
            .count();
        let signs = state
            .signs
            .values()
            .filter(|sign| sign.lifecycle.is_live() && sign.zone_id == zone_id)
            .count();
        Ok((cameras + signs) as i64)
    }

    async fn zone_free_capacity(&self, zone_id: i32) -> Result<Option<i32>> {
        let state = self.state.lock().await;
        Ok(state
            .zones
            .get(&zone_id)
            .filter(|zone| zone.lifecycle == Lifecycle::Active)
            .map(|zone| zone.free_capacity))
    }

    async fn cameras(&self, include_deleted: bool) -> Result<Vec<Camera>> {
        let state = self.state.lock().await;
        Ok(state
            .cameras
            .values()
            .filter(|camera| include_deleted || camera.lifecycle.is_live())
            .cloned()
            .collect())
    }

    async fn camera(&self, cam_id: i32) -> Result<Option<Camera>> {
        Ok(self.state.lock().await.cameras.get(&cam_id).cloned())
    }

    async fn live_camera_by_ip(&self, cam_ip: &str) -> Result<Option<Camera>> {
        let state = self.state.lock().await;
        Ok(state
            .cameras
            .values()
            .find(|camera| camera.cam_ip == cam_ip && camera.lifecycle.is_live())
            .cloned())
    }

    async fn create_camera(&self, camera: &Camera) -> Result<Camera> {
        let mut state = self.state.lock().await;
        let clash = state.cameras.contains_key(&camera.cam_id)
            || state
                .cameras
                .values()
                .any(|other| other.cam_ip == camera.cam_ip && other.lifecycle.is_live());
        if clash {
            return Err(
                Error::AlreadyExists(format!("Camera {} already exists", camera.cam_id)).into(),
            );
        }
        state.cameras.insert(camera.cam_id, camera.clone());
        Ok(camera.clone())
    }

    async fn update_camera(&self, camera: &Camera) -> Result<Camera> {
        let mut state = self.state.lock().await;
        let stored = state
            .cameras
            .get_mut(&camera.cam_id)
            .filter(|stored| stored.lifecycle.is_live())
            .ok_or_else(|| Error::NotFound(format!("Camera {} not found", camera.cam_id)))?;

        let lifecycle = stored.lifecycle;
        *stored = camera.clone();
        stored.lifecycle = lifecycle;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn set_camera_lifecycle(&self, cam_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.cameras.get_mut(&cam_id) {
            Some(camera) if camera.lifecycle.is_live() => {
                camera.lifecycle = lifecycle;
                camera.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn signs(&self, include_deleted: bool) -> Result<Vec<Sign>> {
        let state = self.state.lock().await;
        Ok(state
            .signs
            .values()
            .filter(|sign| include_deleted || sign.lifecycle.is_live())
            .cloned()
            .collect())
    }

    async fn sign(&self, sign_id: i32) -> Result<Option<Sign>> {
        Ok(self.state.lock().await.signs.get(&sign_id).cloned())
    }

    async fn live_sign_for_zone(&self, zone_id: i32) -> Result<Option<Sign>> {
        let state = self.state.lock().await;
        Ok(state
            .signs
            .values()
            .find(|sign| sign.zone_id == zone_id && sign.lifecycle.is_live())
            .cloned())
    }

    async fn create_sign(&self, sign: &Sign) -> Result<Sign> {
        let mut state = self.state.lock().await;
        let clash = state.signs.contains_key(&sign.sign_id)
            || state
                .signs
                .values()
                .any(|other| other.zone_id == sign.zone_id && other.lifecycle.is_live());
        if clash {
            return Err(Error::AlreadyExists(format!("Sign {} already exists", sign.sign_id)).into());
        }
        state.signs.insert(sign.sign_id, sign.clone());
        Ok(sign.clone())
    }

    async fn update_sign(&self, sign: &Sign) -> Result<Sign> {
        let mut state = self.state.lock().await;
        let stored = state
            .signs
            .get_mut(&sign.sign_id)
            .filter(|stored| stored.lifecycle.is_live())
            .ok_or_else(|| Error::NotFound(format!("Sign {} not found", sign.sign_id)))?;

        let lifecycle = stored.lifecycle;
        *stored = sign.clone();
        stored.lifecycle = lifecycle;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn set_sign_lifecycle(&self, sign_id: i32, lifecycle: Lifecycle) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(match state.signs.get_mut(&sign_id) {
            Some(sign) if sign.lifecycle.is_live() => {
                sign.lifecycle = lifecycle;
                sign.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn load_settings(&self) -> Result<Settings> {
        Ok(self.state.lock().await.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<Settings> {
        let mut state = self.state.lock().await;
        state.settings = settings.clone();
        state.settings.updated_at = Utc::now();
        Ok(state.settings.clone())
    }

    async fn present_cars(&self, query: &PresentCarQuery) -> Result<Vec<PresentCar>> {
        let state = self.state.lock().await;
        let mut cars: Vec<&PresentCar> = state
            .present_cars
            .values()
            .filter(|car| query.zone_id.map_or(true, |zone_id| car.current_zone_id == zone_id))
            .filter(|car| query.lpn.as_deref().map_or(true, |lpn| car.lpn == lpn))
            .collect();
        cars.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(page(cars.into_iter().cloned(), query.limit, query.offset))
    }

    async fn present_car(&self, lpn: &str) -> Result<Option<PresentCar>> {
        Ok(self.state.lock().await.present_cars.get(lpn).cloned())
    }

    async fn search_present_cars(&self, fragment: &str, limit: i64) -> Result<Vec<PresentCar>> {
        let fragment = fragment.to_uppercase();
        let state = self.state.lock().await;
        let mut cars: Vec<&PresentCar> = state
            .present_cars
            .values()
            .filter(|car| car.lpn.to_uppercase().contains(&fragment))
            .collect();
        cars.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(page(cars.into_iter().cloned(), Some(limit), None))
    }

    async fn delete_present_car(&self, lpn: &str) -> Result<bool> {
        Ok(self.state.lock().await.present_cars.remove(lpn).is_some())
    }

    async fn search_history(&self, query: &HistoryQuery) -> Result<Vec<PresentCarHistory>> {
        let state = self.state.lock().await;
        let mut rows: Vec<&PresentCarHistory> = state
            .history
            .iter()
            .filter(|row| query.lpn.as_deref().map_or(true, |lpn| row.lpn == lpn))
            .filter(|row| query.zone_id.map_or(true, |zone_id| row.current_zone_id == zone_id))
            .filter(|row| query.from.map_or(true, |from| row.transaction_date >= from))
            .filter(|row| query.to.map_or(true, |to| row.transaction_date <= to))
            .collect();
        rows.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(page(rows.into_iter().cloned(), query.limit, query.offset))
    }

    async fn car_details(&self, limit: Option<i64>) -> Result<Vec<CarDetail>> {
        let state = self.state.lock().await;
        let details = state.car_details.values().rev().map(|detail| CarDetail {
            plate_image: None,
            scene_image: None,
            ..detail.clone()
        });
        Ok(page(details, limit, None))
    }

    async fn car_detail(&self, id: i64) -> Result<Option<CarDetail>> {
        Ok(self.state.lock().await.car_details.get(&id).cloned())
    }

    async fn delete_car_detail(&self, id: i64) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.car_details.remove(&id).is_none() {
            return Ok(false);
        }
        for car in state.present_cars.values_mut() {
            if car.car_details_id == Some(id) {
                car.car_details_id = None;
            }
        }
        for row in state.history.iter_mut() {
            if row.car_details_id == Some(id) {
                row.car_details_id = None;
            }
        }
        Ok(true)
    }

    async fn zone_images(&self, zone_id: i32) -> Result<Vec<ZoneImage>> {
        let state = self.state.lock().await;
        Ok(state
            .zone_images
            .values()
            .filter(|image| image.zone_id == zone_id)
            .cloned()
            .collect())
    }

    async fn zone_image(&self, zone_id: i32, language: &str) -> Result<Option<ZoneImage>> {
        let state = self.state.lock().await;
        Ok(state
            .zone_images
            .get(&(zone_id, language.to_string()))
            .cloned())
    }

    async fn save_zone_image(
        &self,
        zone_id: i32,
        language: &str,
        image: &ZoneImageRequest,
    ) -> Result<ZoneImage> {
        let mut state = self.state.lock().await;
        if !state.zones.contains_key(&zone_id) {
            return Err(Error::Database(format!(
                "Failed to save image of zone {}: unknown zone",
                zone_id
            ))
            .into());
        }

        let key = (zone_id, language.to_string());
        let id = match state.zone_images.get(&key) {
            Some(existing) => existing.id,
            None => {
                state.next_zone_image_id += 1;
                state.next_zone_image_id
            }
        };
        let saved = ZoneImage {
            id,
            zone_id,
            language: language.to_string(),
            image_small: image.image_small.clone(),
            image_large: image.image_large.clone(),
            extra: image.extra.clone(),
            updated_at: Utc::now(),
        };
        state.zone_images.insert(key, saved.clone());

        Ok(saved)
    }

    async fn delete_zone_image(&self, zone_id: i32, language: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state
            .zone_images
            .remove(&(zone_id, language.to_string()))
            .is_some())
    }

    async fn error_messages(&self) -> Result<Vec<ErrorMessage>> {
        Ok(self.state.lock().await.error_messages.values().cloned().collect())
    }

    async fn error_message(&self, code: i32) -> Result<Option<ErrorMessage>> {
        Ok(self.state.lock().await.error_messages.get(&code).cloned())
    }

    async fn merge_error_message(
        &self,
        code: i32,
        messages: &BTreeMap<String, String>,
    ) -> Result<ErrorMessage> {
        let mut state = self.state.lock().await;
        let entry = state
            .error_messages
            .entry(code)
            .or_insert_with(|| ErrorMessage {
                code,
                messages: Json(BTreeMap::new()),
            });
        entry
            .messages
            .extend(messages.iter().map(|(lang, text)| (lang.clone(), text.clone())));
        Ok(entry.clone())
    }

    async fn remove_error_language(
        &self,
        code: i32,
        language: &str,
    ) -> Result<Option<ErrorMessage>> {
        let mut state = self.state.lock().await;
        Ok(state.error_messages.get_mut(&code).map(|message| {
            message.messages.remove(language);
            message.clone()
        }))
    }

    async fn record_audit(&self, entry: &NewUserAudit) -> Result<UserAudit> {
        let mut state = self.state.lock().await;
        let row = UserAudit {
            id: state.audit.len() as i64 + 1,
            username: entry.username.clone(),
            action_date: Utc::now(),
            module: entry.module.clone(),
            action: entry.action.clone(),
            old_value: entry.old_value.clone(),
            new_value: entry.new_value.clone(),
        };
        state.audit.push(row.clone());
        Ok(row)
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<UserAudit>> {
        let state = self.state.lock().await;
        let rows = state
            .audit
            .iter()
            .rev()
            .filter(|row| query.username.as_deref().map_or(true, |name| row.username == name))
            .filter(|row| query.module.as_deref().map_or(true, |module| row.module == module))
            .cloned();
        Ok(page(rows, query.limit, None))
    }
}
