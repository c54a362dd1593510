//! # SPV Common Library
//!
//! Shared code for the staff presence verification services:
//! - Database initialization and row models
//! - Engine configuration loading (defaults, TOML, environment)
//! - Calendar helpers (day of week, minute-precision clock times)
//! - Notification kinds

pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod time;

pub use config::{ConfirmationMode, CoverSelection, EngineConfig};
pub use error::{Error, Result};
pub use notify::NotificationKind;
pub use time::{ClockTime, DayOfWeek};
