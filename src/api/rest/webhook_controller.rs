use crate::api::rest::AppState;
use crate::counting::capture::{self, UploadedPart};
use crate::counting::reconciler::ReconcileStatus;
use crate::error::Error;
use axum::extract::{ConnectInfo, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, error, warn};
use serde_json::json;
use std::net::SocketAddr;

/// Response code for an accepted capture
pub const CODE_ACCEPTED: u32 = 8;
/// Response code for a payload that could not be read
pub const CODE_REJECTED: u32 = 12;

fn rejected(remote: &str, err: Error) -> Response {
    warn!("Rejected camera upload from {}: {}", remote, err);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": err.to_string(), "code": CODE_REJECTED })),
    )
        .into_response()
}

async fn read_parts(multipart: &mut Multipart) -> Result<Vec<UploadedPart>, Error> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Parse(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Parse(format!("Failed to read multipart part: {}", e)))?;
        parts.push(UploadedPart {
            name,
            file_name,
            data: data.to_vec(),
        });
    }
    Ok(parts)
}

/// Camera ANPR webhook. The XML part is parsed before answering; the capture
/// is then applied in its own task so a dropped connection cannot cut it short.
pub async fn receive_capture(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    mut multipart: Multipart,
) -> Response {
    let remote = remote
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let parts = match read_parts(&mut multipart).await {
        Ok(parts) => parts,
        Err(e) => return rejected(&remote, e),
    };

    let xml = match capture::extract_xml_part(&parts) {
        Ok(xml) => xml,
        Err(e) => return rejected(&remote, e),
    };

    let mut capture = match capture::parse_event(&xml) {
        Ok(capture) => capture,
        Err(e) => return rejected(&remote, e),
    };
    capture.pictures = capture::collect_pictures(&parts);

    debug!(
        "Capture {} {} from camera {} (peer {}, {} parts, {} pictures)",
        capture.plate,
        capture.direction,
        capture.camera_address,
        remote,
        parts.len(),
        capture.pictures.len()
    );

    state
        .audit
        .record(&capture.camera_address, &capture.plate, xml);

    let reconciler = state.reconciler.clone();
    let task = tokio::spawn(async move { reconciler.process(&capture).await });

    match task.await {
        Ok(report) if report.status == ReconcileStatus::Completed => debug!(
            "Capture {} from {} reconciled: {:?}",
            report.plate, report.camera_address, report.capacity
        ),
        Ok(report) => debug!(
            "Capture {} from {} not reconciled: {:?}",
            report.plate, report.camera_address, report.status
        ),
        Err(e) => error!("Reconcile task failed: {}", e),
    }

    (
        StatusCode::OK,
        Json(json!({ "message": "Files uploaded successfully", "code": CODE_ACCEPTED })),
    )
        .into_response()
}
