//! Leave endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use spv_common::db::{Leave, LeaveStatus, LeaveType};

use super::ApiError;
use crate::coverage::leave::{CoverOpportunity, LeaveSubmission};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitLeaveBody {
    pub staff_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    #[serde(default = "default_leave_type")]
    pub leave_type: LeaveType,
}

fn default_leave_type() -> LeaveType {
    LeaveType::Other
}

#[derive(Debug, Serialize)]
pub struct SubmitLeaveResponse {
    pub message: String,
    pub leave: Leave,
}

#[derive(Debug, Deserialize)]
pub struct DecideLeaveBody {
    pub status: LeaveStatus,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecideLeaveResponse {
    pub leave: Leave,
    pub opportunities: Vec<CoverOpportunity>,
}

/// POST /api/leaves
pub async fn submit_leave(
    State(state): State<AppState>,
    Json(body): Json<SubmitLeaveBody>,
) -> Result<Json<SubmitLeaveResponse>, ApiError> {
    let submission = LeaveSubmission {
        staff_id: body.staff_id,
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason,
        leave_type: body.leave_type,
    };
    let leave = state
        .engine
        .leaves
        .submit(&submission, state.engine.clock.now())
        .await?;

    Ok(Json(SubmitLeaveResponse {
        message: "Leave request submitted successfully".to_string(),
        leave,
    }))
}

/// PUT /api/leaves/:id
pub async fn decide_leave(
    State(state): State<AppState>,
    Path(leave_id): Path<i64>,
    Json(body): Json<DecideLeaveBody>,
) -> Result<Json<DecideLeaveResponse>, ApiError> {
    let decision = state
        .engine
        .leaves
        .decide(
            leave_id,
            body.status,
            body.admin_notes.as_deref(),
            state.engine.clock.now(),
        )
        .await?;

    Ok(Json(DecideLeaveResponse {
        leave: decision.leave,
        opportunities: decision.opportunities,
    }))
}
