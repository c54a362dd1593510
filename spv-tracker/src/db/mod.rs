//! Database access layer for spv-tracker
//!
//! Plain query functions over SQLite. Functions that take part in the
//! session state machine accept any executor so they can run inside a
//! transaction.

pub mod alerts;
pub mod attendance;
pub mod directory;
pub mod leaves;
pub mod notifications;
pub mod timetable;

/// Canonical form of a beacon or scanner hardware identifier
pub fn normalize_hardware_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}
