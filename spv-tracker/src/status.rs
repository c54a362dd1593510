//! Live staff status
//!
//! Where each staff member is right now versus where the timetable expects
//! them, derived from today's freshest session.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use spv_common::db::{AttendanceSession, SessionStatus, Staff, TimetableSlot};
use spv_common::{ClockTime, DayOfWeek, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::db;
use crate::timetable::TimetableIndex;

const NOT_DETECTED: &str = "Not detected";
const NO_CLASS: &str = "No Class Assigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiveStatus {
    Absent,
    Tracking,
    Present,
    Late,
    /// Seen today, but not within the stale window
    Left,
}

impl From<SessionStatus> for LiveStatus {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Tracking => LiveStatus::Tracking,
            SessionStatus::Present => LiveStatus::Present,
            SessionStatus::Late => LiveStatus::Late,
        }
    }
}

/// Live status of a session observed at `now`
pub fn live_status(session: Option<&AttendanceSession>, now: NaiveDateTime, stale_after: Duration) -> LiveStatus {
    match session {
        None => LiveStatus::Absent,
        Some(s) if now - s.last_seen > stale_after => LiveStatus::Left,
        Some(s) => s.status.into(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveClass {
    pub subject: Option<String>,
    pub room: String,
    pub start: ClockTime,
    pub end: ClockTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffStatus {
    #[serde(flatten)]
    pub staff: Staff,
    pub current_status: LiveStatus,
    pub last_seen: Option<NaiveDateTime>,
    pub current_location: String,
    pub expected_location: String,
    pub is_correct_location: bool,
    pub active_class: Option<ActiveClass>,
}

pub struct StatusBoard {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
    stale_after: Duration,
}

impl StatusBoard {
    pub fn new(db: Pool<Sqlite>, timetable: Arc<dyn TimetableIndex>, stale_after: Duration) -> Self {
        Self {
            db,
            timetable,
            stale_after,
        }
    }

    pub async fn snapshot(&self, now: NaiveDateTime) -> Result<Vec<StaffStatus>> {
        let staff = db::directory::list_staff(&self.db).await?;
        let today = self.timetable.slots_on_day(DayOfWeek::of(now.date())).await?;
        let time = ClockTime::of(now);

        let mut board = Vec::with_capacity(staff.len());
        for member in staff {
            let slot = today
                .iter()
                .find(|slot| slot.staff_id == member.id && slot.covers(time))
                .cloned();
            board.push(self.status_of(member, slot, now).await?);
        }
        Ok(board)
    }

    async fn status_of(&self, staff: Staff, slot: Option<TimetableSlot>, now: NaiveDateTime) -> Result<StaffStatus> {
        let session = db::attendance::latest_session_for_staff(&self.db, staff.id, now.date()).await?;

        let current_status = live_status(session.as_ref(), now, self.stale_after);
        let fresh = session
            .as_ref()
            .filter(|_| !matches!(current_status, LiveStatus::Absent | LiveStatus::Left));

        let current_location = match fresh {
            Some(s) => db::directory::classroom_name(&self.db, s.classroom_id).await?,
            None => NOT_DETECTED.to_string(),
        };
        let active_class = match &slot {
            Some(slot) => Some(ActiveClass {
                subject: slot.subject.clone(),
                room: db::directory::classroom_name(&self.db, slot.classroom_id).await?,
                start: slot.start,
                end: slot.end,
            }),
            None => None,
        };
        let expected_location = active_class
            .as_ref()
            .map(|c| c.room.clone())
            .unwrap_or_else(|| NO_CLASS.to_string());
        let is_correct_location = match (&slot, fresh) {
            (Some(slot), Some(s)) => slot.classroom_id == s.classroom_id,
            (Some(_), None) => false,
            (None, _) => true,
        };

        Ok(StaffStatus {
            staff,
            current_status,
            last_seen: session.map(|s| s.last_seen),
            current_location,
            expected_location,
            is_correct_location,
            active_class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: SessionStatus, last_seen: &str) -> AttendanceSession {
        let last_seen: NaiveDateTime = last_seen.parse().unwrap();
        AttendanceSession {
            id: 1,
            staff_id: 1,
            classroom_id: 1,
            date: last_seen.date(),
            check_in: last_seen - Duration::minutes(40),
            last_seen,
            status,
        }
    }

    #[test]
    fn test_live_status() {
        let now: NaiveDateTime = "2024-03-04T10:00:00".parse().unwrap();
        let stale = Duration::minutes(5);

        assert_eq!(live_status(None, now, stale), LiveStatus::Absent);
        let fresh = session(SessionStatus::Late, "2024-03-04T09:55:00");
        assert_eq!(live_status(Some(&fresh), now, stale), LiveStatus::Late);
        let old = session(SessionStatus::Present, "2024-03-04T09:54:59");
        assert_eq!(live_status(Some(&old), now, stale), LiveStatus::Left);
    }
}
