//! Read-only dashboard views

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use spv_common::db::SessionStatus;

use super::ApiError;
use crate::db;
use crate::db::alerts::AlertView;
use crate::status::StaffStatus;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_staff: i64,
    pub total_classrooms: i64,
    pub present_today: i64,
    pub late_today: i64,
    pub pending_leaves: i64,
}

/// GET /api/staff-status
pub async fn staff_status(State(state): State<AppState>) -> Result<Json<Vec<StaffStatus>>, ApiError> {
    let board = state.engine.status.snapshot(state.engine.clock.now()).await?;
    Ok(Json(board))
}

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<AlertView>>, ApiError> {
    let limit = query.limit.clamp(1, 1000);
    let alerts = db::alerts::recent_alerts(&state.engine.db, limit).await?;
    Ok(Json(alerts))
}

/// GET /api/dashboard-stats
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let engine = &state.engine;
    let today = engine.clock.now().date();

    Ok(Json(DashboardStats {
        total_staff: db::directory::count_staff(&engine.db).await?,
        total_classrooms: db::directory::count_classrooms(&engine.db).await?,
        present_today: db::attendance::count_with_status(&engine.db, today, SessionStatus::Present).await?,
        late_today: db::attendance::count_with_status(&engine.db, today, SessionStatus::Late).await?,
        pending_leaves: db::leaves::count_pending(&engine.db).await?,
    }))
}
