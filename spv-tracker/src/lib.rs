//! spv-tracker library - staff presence reconciliation
//!
//! Turns beacon sightings from classroom scanners into per-class attendance,
//! watches the timetable for late or missing staff, and finds colleagues to
//! cover classes whose owner is away.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod clock;
pub mod coverage;
pub mod db;
pub mod engine;
pub mod ingest;
pub mod lateness;
pub mod notifier;
pub mod scheduler;
pub mod session;
pub mod sinks;
pub mod status;
pub mod timetable;
pub mod watchdog;

pub use engine::Engine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let api = Router::new()
        .route("/ble-data", post(api::ingest_sighting))
        .route("/api/ble-data", post(api::ingest_sighting))
        .route("/api/meet", post(api::request_meeting))
        .route("/api/leaves", post(api::submit_leave))
        .route("/api/leaves/:id", put(api::decide_leave))
        .route("/api/staff-status", get(api::staff_status))
        .route("/api/alerts", get(api::list_alerts))
        .route("/api/dashboard-stats", get(api::dashboard_stats));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
