//! Sighting ingestion endpoint
//!
//! Called by the room scanners. Soft rejections answer 200 with
//! `status: "ignored"`; only unknown hardware and storage failures are errors.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use spv_common::db::SessionStatus;
use tracing::debug;

use super::ApiError;
use crate::ingest::{IngestOutcome, Sighting};
use crate::session::TrackOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BleReport {
    pub esp32_id: String,
    pub beacon_uuid: String,
    pub rssi: i32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BleResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_status: Option<SessionStatus>,
}

impl From<IngestOutcome> for BleResponse {
    fn from(outcome: IngestOutcome) -> Self {
        let (status, message, session) = match &outcome {
            IngestOutcome::Ignored(reason) => ("ignored", Some(reason.to_string()), None),
            IngestOutcome::Tracked(track) => {
                let session = track.session();
                match track {
                    TrackOutcome::Started(_) => ("started", Some("Tracking started".to_string()), Some(session)),
                    TrackOutcome::StillTracking(_) => ("updated", Some("Still tracking".to_string()), Some(session)),
                    TrackOutcome::Confirmed(_) => (
                        "updated",
                        Some(format!("Attendance confirmed: {}", session.status)),
                        Some(session),
                    ),
                    TrackOutcome::Classified(_) => (
                        "success",
                        Some(format!("Attendance marked: {}", session.status)),
                        Some(session),
                    ),
                    TrackOutcome::AlreadyMarked(_) => ("already_marked", None, Some(session)),
                }
            }
        };

        BleResponse {
            status: status.to_string(),
            message,
            attendance_status: session.map(|s| s.status),
        }
    }
}

/// POST /ble-data, POST /api/ble-data
pub async fn ingest_sighting(
    State(state): State<AppState>,
    Json(report): Json<BleReport>,
) -> Result<Json<BleResponse>, ApiError> {
    let engine = &state.engine;
    let sighting = Sighting {
        scanner_id: report.esp32_id,
        beacon_id: report.beacon_uuid,
        rssi: report.rssi,
        observed_at: engine.clock.now(),
    };
    debug!(scanner_id = %sighting.scanner_id, rssi = sighting.rssi, "Sighting received");

    let outcome = engine.ingestor.ingest(sighting).await?;
    Ok(Json(outcome.into()))
}
