//! HTTP API handlers for spv-tracker

pub mod ble;
pub mod error;
pub mod health;
pub mod leaves;
pub mod meet;
pub mod views;

pub use ble::ingest_sighting;
pub use error::ApiError;
pub use health::health_routes;
pub use leaves::{decide_leave, submit_leave};
pub use meet::request_meeting;
pub use views::{dashboard_stats, list_alerts, staff_status};
