use crate::counting::registry::Registries;
use crate::counting::signage::{SignNotice, SignagePublisher};
use crate::db::models::settings_models::Settings;
use crate::db::store::CountingStore;
use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use futures::future::join_all;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// Nightly jobs driven by the settings row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceJob {
    /// Empty the present car table; history is kept
    PresentCarReset,
    /// Reload zones and push every zone's free capacity to its sign
    CountingMaintenance,
}

impl MaintenanceJob {
    fn schedule(&self, settings: &Settings) -> (bool, i32) {
        match self {
            MaintenanceJob::PresentCarReset => (
                settings.present_car_reset_enabled,
                settings.present_car_reset_hour,
            ),
            MaintenanceJob::CountingMaintenance => (
                settings.counting_maintenance_enabled,
                settings.counting_maintenance_hour,
            ),
        }
    }
}

#[derive(Debug, Default)]
struct LastRuns {
    present_car_reset: Option<NaiveDate>,
    counting_maintenance: Option<NaiveDate>,
}

impl LastRuns {
    fn slot(&mut self, job: MaintenanceJob) -> &mut Option<NaiveDate> {
        match job {
            MaintenanceJob::PresentCarReset => &mut self.present_car_reset,
            MaintenanceJob::CountingMaintenance => &mut self.counting_maintenance,
        }
    }
}

/// Enabled, in its hour, and not yet run on this date
pub fn is_due(enabled: bool, hour: i32, now: NaiveDateTime, last_run: Option<NaiveDate>) -> bool {
    enabled && now.hour() as i32 == hour && last_run != Some(now.date())
}

/// Runs the present car reset and counting maintenance jobs at their configured hour
pub struct MaintenanceScheduler {
    store: Arc<dyn CountingStore>,
    registries: Arc<Registries>,
    signage: Arc<SignagePublisher>,
    check_interval: Duration,
    last_runs: Mutex<LastRuns>,
}

impl MaintenanceScheduler {
    pub fn new(
        store: Arc<dyn CountingStore>,
        registries: Arc<Registries>,
        signage: Arc<SignagePublisher>,
        check_interval_secs: u64,
    ) -> Self {
        Self {
            store,
            registries,
            signage,
            check_interval: Duration::from_secs(check_interval_secs.max(1)),
            last_runs: Mutex::new(LastRuns::default()),
        }
    }

    /// Start the maintenance loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            "Starting maintenance scheduler, checking every {}s",
            self.check_interval.as_secs()
        );

        tokio::spawn(async move {
            let mut interval = interval(self.check_interval);

            loop {
                interval.tick().await;

                if let Err(e) = self.run_due_jobs(Local::now().naive_local()).await {
                    error!("Error running maintenance jobs: {}", e);
                }
            }
        })
    }

    fn claim(&self, job: MaintenanceJob, settings: &Settings, now: NaiveDateTime) -> bool {
        let (enabled, hour) = job.schedule(settings);
        let mut last_runs = match self.last_runs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let slot = last_runs.slot(job);
        if is_due(enabled, hour, now, *slot) {
            *slot = Some(now.date());
            true
        } else {
            false
        }
    }

    /// Run every job that is due at `now` (local time). Returns the jobs that ran.
    pub async fn run_due_jobs(&self, now: NaiveDateTime) -> Result<Vec<MaintenanceJob>> {
        let settings = self.store.settings().await?;
        let mut ran = Vec::new();

        for job in [
            MaintenanceJob::PresentCarReset,
            MaintenanceJob::CountingMaintenance,
        ] {
            if !self.claim(job, &settings, now) {
                continue;
            }

            let result = match job {
                MaintenanceJob::PresentCarReset => self.reset_present_cars().await.map(|_| ()),
                MaintenanceJob::CountingMaintenance => self.resync_signs().await.map(|_| ()),
            };

            match result {
                Ok(()) => ran.push(job),
                Err(e) => error!("Maintenance job {:?} failed: {}", job, e),
            }
        }

        Ok(ran)
    }

    pub async fn reset_present_cars(&self) -> Result<u64> {
        let removed = self.store.reset_present_cars().await?;
        info!("Present car reset removed {} rows", removed);
        Ok(removed)
    }

    /// Reload the zone registry and republish every active zone's free
    /// capacity. Returns the number of signs that received a value.
    pub async fn resync_signs(&self) -> Result<usize> {
        self.registries.zones.reload(self.store.as_ref()).await?;
        let zones = self.registries.zones.all();

        let results = join_all(
            zones
                .iter()
                .map(|zone| self.signage.notify(zone.zone_id, zone.free_capacity)),
        )
        .await;

        let mut published = 0;
        for (zone, result) in zones.iter().zip(results) {
            match result {
                Ok(SignNotice::Published(_)) => published += 1,
                Ok(SignNotice::NoSign) => {}
                Err(e) => warn!("Sign resync for zone {} failed: {}", zone.zone_id, e),
            }
        }

        info!(
            "Counting maintenance pushed {} of {} zones to their signs",
            published,
            zones.len()
        );

        Ok(published)
    }
}
