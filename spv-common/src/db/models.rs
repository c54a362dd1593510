//! Database models

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::{ClockTime, DayOfWeek};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Staff {
    pub id: i64,
    pub name: String,
    /// Beacon hardware identifier, stored upper-cased
    pub beacon_id: String,
    pub department: Option<String>,
    pub is_department_head: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    /// Identifier of the room's beacon reader, stored upper-cased
    pub scanner_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Staff,
    Principal,
    Secretary,
    Director,
}

impl UserRole {
    /// Roles allowed to pull a staff member into an ad-hoc meeting
    pub fn is_executive(&self) -> bool {
        matches!(self, UserRole::Principal | UserRole::Secretary | UserRole::Director)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Staff => "staff",
            UserRole::Principal => "principal",
            UserRole::Secretary => "secretary",
            UserRole::Director => "director",
        }
    }
}

/// A notification recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub staff_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimetableSlot {
    pub id: i64,
    pub staff_id: i64,
    pub classroom_id: i64,
    pub day_of_week: DayOfWeek,
    #[sqlx(rename = "start_minute")]
    pub start: ClockTime,
    #[sqlx(rename = "end_minute")]
    pub end: ClockTime,
    pub subject: Option<String>,
}

impl TimetableSlot {
    /// Whether `time` falls inside `[start, end]` (both ends inclusive)
    pub fn covers(&self, time: ClockTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Half-open overlap test against `[start, end)`
    pub fn overlaps(&self, start: ClockTime, end: ClockTime) -> bool {
        self.start < end && self.end > start
    }
}

/// Attendance state of a session; absence is represented by no session at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum SessionStatus {
    Tracking,
    Present,
    Late,
}

impl SessionStatus {
    /// Present and Late are final for the day
    pub fn is_final(&self) -> bool {
        match self {
            SessionStatus::Tracking => false,
            SessionStatus::Present | SessionStatus::Late => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Tracking => "Tracking",
            SessionStatus::Present => "Present",
            SessionStatus::Late => "Late",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-(staff, classroom, date) attendance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceSession {
    pub id: i64,
    pub staff_id: i64,
    pub classroom_id: i64,
    pub date: NaiveDate,
    pub check_in: NaiveDateTime,
    pub last_seen: NaiveDateTime,
    pub status: SessionStatus,
}

impl AttendanceSession {
    /// Elapsed time between first and most recent accepted sighting
    pub fn dwell(&self) -> chrono::Duration {
        self.last_seen - self.check_in
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: i64,
    pub staff_id: i64,
    pub classroom_id: i64,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub title: String,
    pub message: String,
    pub kind: crate::NotificationKind,
    pub is_read: bool,
    pub related_data: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LeaveType {
    Sick,
    Casual,
    Vacation,
    Emergency,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Leave {
    pub id: i64,
    pub staff_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub admin_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(start: &str, end: &str) -> TimetableSlot {
        TimetableSlot {
            id: 1,
            staff_id: 1,
            classroom_id: 1,
            day_of_week: DayOfWeek::Monday,
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            subject: None,
        }
    }

    #[test]
    fn test_slot_covers_both_ends() {
        let s = slot("09:00", "10:00");
        assert!(s.covers("09:00".parse().unwrap()));
        assert!(s.covers("10:00".parse().unwrap()));
        assert!(!s.covers("10:01".parse().unwrap()));
        assert!(!s.covers("08:59".parse().unwrap()));
    }

    #[test]
    fn test_slot_overlap_is_half_open() {
        let s = slot("09:00", "10:00");
        let t = |v: &str| v.parse::<ClockTime>().unwrap();
        assert!(s.overlaps(t("09:30"), t("10:30")));
        assert!(s.overlaps(t("08:00"), t("11:00")));
        // Touching intervals do not overlap
        assert!(!s.overlaps(t("10:00"), t("11:00")));
        assert!(!s.overlaps(t("08:00"), t("09:00")));
    }

    #[test]
    fn test_status_finality() {
        assert!(!SessionStatus::Tracking.is_final());
        assert!(SessionStatus::Present.is_final());
        assert!(SessionStatus::Late.is_final());
    }
}
