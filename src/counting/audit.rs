use crate::config::CaptureConfig;
use crate::error::Error;
use chrono::Utc;
use log::{debug, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::task::JoinHandle;

/// Keeps a copy of raw camera payloads on disk
#[derive(Debug, Clone)]
pub struct PayloadAudit {
    enabled: bool,
    root: PathBuf,
}

impl PayloadAudit {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            enabled: config.save_raw_payload,
            root: config.raw_payload_dir.clone(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Write `payload` in the background. Failures are logged and otherwise ignored.
    pub fn record(&self, source: &str, plate: &str, payload: String) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(source, plate);
        Some(tokio::spawn(async move {
            match write_payload(&path, payload.as_bytes()).await {
                Ok(()) => debug!("Saved raw payload to {}", path.display()),
                Err(e) => warn!("Raw payload not saved: {}", e),
            }
        }))
    }

    /// `<root>/<source>/anpr_<plate>_<timestamp>.xml`
    pub fn path_for(&self, source: &str, plate: &str) -> PathBuf {
        let file_name = format!(
            "anpr_{}_{}.xml",
            sanitize(plate),
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        );
        self.root.join(sanitize(source)).join(file_name)
    }
}

async fn write_payload(path: &Path, payload: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Io(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    tokio::fs::write(path, payload)
        .await
        .map_err(|e| Error::Io(format!("Failed to write {}: {}", path.display(), e)))
}

/// Keep path components to a safe character set
fn sanitize(component: &str) -> String {
    static UNSAFE: OnceLock<Option<Regex>> = OnceLock::new();
    let cleaned = match UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").ok()) {
        Some(pattern) => pattern.replace_all(component, "_").into_owned(),
        None => component
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect(),
    };

    match cleaned.trim_matches('.') {
        "" => "unknown".to_string(),
        trimmed => trimmed.to_string(),
    }
}
