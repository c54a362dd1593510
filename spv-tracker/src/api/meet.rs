//! Meeting request endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use spv_common::db::UserRole;
use spv_common::Error;

use super::ApiError;
use crate::coverage::meeting::MeetingRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MeetBody {
    pub staff_id: i64,
    pub requester_role: String,
    pub requester_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeetResponse {
    pub message: String,
    pub covered_by: Option<String>,
}

/// POST /api/meet
pub async fn request_meeting(
    State(state): State<AppState>,
    Json(body): Json<MeetBody>,
) -> Result<Json<MeetResponse>, ApiError> {
    // Unknown roles are refused the same way as non-executive ones
    let requester_role: UserRole =
        serde_json::from_value(serde_json::Value::String(body.requester_role.to_lowercase()))
            .map_err(|_| Error::Forbidden(format!("unknown role '{}'", body.requester_role)))?;

    let request = MeetingRequest {
        staff_id: body.staff_id,
        requester_role,
        requester_name: body.requester_name,
    };
    let outcome = state
        .engine
        .meetings
        .request(&request, state.engine.clock.now())
        .await?;

    Ok(Json(MeetResponse {
        message: "Meeting request sent successfully.".to_string(),
        covered_by: outcome.covered_by.map(|s| s.name),
    }))
}
