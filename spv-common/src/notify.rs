//! Notification kinds
//!
//! The closed set of notice types a recipient can receive. Stored in the
//! `notifications.kind` column in snake_case.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum NotificationKind {
    Alert,
    LeaveUpdate,
    LeaveRequest,
    TimetableChange,
    General,
    /// Sent to a staff member confirmed late
    LateArrival,
    /// Sent to department heads about a late colleague
    LateAlert,
    MeetingRequest,
    SubstitutionAlert,
    UpcomingClass,
    UpcomingClassDept,
    AbsenceWarning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "alert",
            NotificationKind::LeaveUpdate => "leave_update",
            NotificationKind::LeaveRequest => "leave_request",
            NotificationKind::TimetableChange => "timetable_change",
            NotificationKind::General => "general",
            NotificationKind::LateArrival => "late_arrival",
            NotificationKind::LateAlert => "late_alert",
            NotificationKind::MeetingRequest => "meeting_request",
            NotificationKind::SubstitutionAlert => "substitution_alert",
            NotificationKind::UpcomingClass => "upcoming_class",
            NotificationKind::UpcomingClassDept => "upcoming_class_dept",
            NotificationKind::AbsenceWarning => "absence_warning",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
