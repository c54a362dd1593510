//! Presence ingestion
//!
//! Entry point for raw scanner reports: admission filter, identity
//! resolution, timetable check, then hand-off to the session tracker.

use chrono::NaiveDateTime;
use spv_common::{ClockTime, DayOfWeek, Error, Result};
use sqlx::{Pool, Sqlite};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::db;
use crate::session::{AttendanceSessionTracker, TrackOutcome};
use crate::timetable::TimetableIndex;

/// One observation reported by room hardware
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub scanner_id: String,
    pub beacon_id: String,
    /// Signal strength in dBm
    pub rssi: i32,
    pub observed_at: NaiveDateTime,
}

/// Why a sighting was dropped without touching any session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BelowThreshold,
    NoScheduledClass,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::BelowThreshold => f.write_str("RSSI below threshold"),
            IgnoreReason::NoScheduledClass => {
                f.write_str("No scheduled class for this staff in this room at this time")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Ignored(IgnoreReason),
    Tracked(TrackOutcome),
}

pub struct PresenceIngestor {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
    tracker: Arc<AttendanceSessionTracker>,
    rssi_threshold: i32,
}

impl PresenceIngestor {
    pub fn new(
        db: Pool<Sqlite>,
        timetable: Arc<dyn TimetableIndex>,
        tracker: Arc<AttendanceSessionTracker>,
        rssi_threshold: i32,
    ) -> Self {
        Self {
            db,
            timetable,
            tracker,
            rssi_threshold,
        }
    }

    pub async fn ingest(&self, sighting: Sighting) -> Result<IngestOutcome> {
        if sighting.rssi < self.rssi_threshold {
            debug!(
                scanner_id = %sighting.scanner_id,
                rssi = sighting.rssi,
                threshold = self.rssi_threshold,
                "Sighting below signal threshold"
            );
            return Ok(IngestOutcome::Ignored(IgnoreReason::BelowThreshold));
        }

        let staff = db::directory::find_staff_by_beacon(&self.db, &sighting.beacon_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Staff with beacon {}", sighting.beacon_id)))?;
        let classroom = db::directory::find_classroom_by_scanner(&self.db, &sighting.scanner_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Classroom with scanner {}", sighting.scanner_id)))?;

        let date = sighting.observed_at.date();
        let day = DayOfWeek::of(date);
        let time = ClockTime::of(sighting.observed_at);
        let slot = self.timetable.find_slot(staff.id, classroom.id, day, time).await?;

        if slot.is_none() {
            // Outside a slot only an existing session may still be updated
            let has_session = db::attendance::session_exists(&self.db, staff.id, classroom.id, date).await?;
            if !has_session {
                debug!(
                    staff_id = staff.id,
                    classroom_id = classroom.id,
                    "No scheduled class at {} {}",
                    day,
                    time
                );
                return Ok(IngestOutcome::Ignored(IgnoreReason::NoScheduledClass));
            }
        }

        let outcome = self
            .tracker
            .record(&staff, &classroom, sighting.observed_at, slot.as_ref())
            .await?;
        Ok(IngestOutcome::Tracked(outcome))
    }
}
