//! Leave requests and the coverage broadcast on approval
//!
//! Approval does not assign anyone. Every free colleague is told about
//! every slot of every day of the leave, and nothing records who took it.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::json;
use spv_common::db::{Leave, LeaveStatus, LeaveType, Staff, TimetableSlot};
use spv_common::time::dates_inclusive;
use spv_common::{DayOfWeek, Error, NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

use super::{CoverageMatcher, Window};
use crate::db;
use crate::notifier::{Message, Notifier};
use crate::timetable::TimetableIndex;

#[derive(Debug, Clone)]
pub struct LeaveSubmission {
    pub staff_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub leave_type: LeaveType,
}

/// One slot left uncovered by an approved leave
#[derive(Debug, Clone, Serialize)]
pub struct CoverOpportunity {
    pub date: NaiveDate,
    pub slot: TimetableSlot,
    pub candidates: Vec<Staff>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveDecision {
    pub leave: Leave,
    pub opportunities: Vec<CoverOpportunity>,
}

pub struct LeaveDesk {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
    matcher: Arc<CoverageMatcher>,
    notifier: Arc<Notifier>,
}

impl LeaveDesk {
    pub fn new(
        db: Pool<Sqlite>,
        timetable: Arc<dyn TimetableIndex>,
        matcher: Arc<CoverageMatcher>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            db,
            timetable,
            matcher,
            notifier,
        }
    }

    /// Store a pending leave and tell the admins
    pub async fn submit(&self, submission: &LeaveSubmission, now: NaiveDateTime) -> Result<Leave> {
        let staff = db::directory::get_staff(&self.db, submission.staff_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Staff {}", submission.staff_id)))?;

        let id = db::leaves::insert_leave(
            &self.db,
            staff.id,
            submission.start_date,
            submission.end_date,
            &submission.reason,
            submission.leave_type,
        )
        .await?;
        let leave = db::leaves::get_leave(&self.db, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("leave {} vanished after insert", id)))?;

        let notice = Message::new(
            NotificationKind::LeaveRequest,
            "New Leave Request",
            format!(
                "{} has submitted a leave request for {}",
                staff.name,
                leave.start_date.format("%Y-%m-%d")
            ),
        )
        .with_related(json!({ "leave_id": leave.id, "staff_id": staff.id }));
        let admins = self.notifier.admins().await?;
        let sent = self.notifier.notify_users(&admins, &notice, now).await?;

        info!(staff_id = staff.id, leave_id = leave.id, "Leave submitted; {} admins notified", sent);
        Ok(leave)
    }

    /// Approve or reject a leave
    ///
    /// Only pending leaves may be decided.
    pub async fn decide(
        &self,
        leave_id: i64,
        status: LeaveStatus,
        admin_notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<LeaveDecision> {
        if status == LeaveStatus::Pending {
            return Err(Error::InvalidInput("decision must be approved or rejected".to_string()));
        }
        let Some(leave) = db::leaves::decide_pending_leave(&self.db, leave_id, status, admin_notes).await? else {
            return Err(match db::leaves::get_leave(&self.db, leave_id).await? {
                None => Error::NotFound(format!("Leave request {}", leave_id)),
                Some(current) => Error::InvalidInput(format!(
                    "leave request {} is already {}",
                    leave_id,
                    current.status.as_str()
                )),
            });
        };

        let label = status.as_str();
        let title = format!("Leave Request {}{}", label[..1].to_uppercase(), &label[1..]);
        let notice = Message::new(
            NotificationKind::LeaveUpdate,
            title,
            format!(
                "Your leave request from {} has been {}",
                leave.start_date.format("%Y-%m-%d"),
                label
            ),
        )
        .with_related(json!({ "leave_id": leave.id }));
        self.notifier.notify_staff(leave.staff_id, &notice, now).await?;

        let opportunities = if status == LeaveStatus::Approved {
            self.broadcast_cover(&leave, now).await?
        } else {
            Vec::new()
        };

        info!(
            leave_id = leave.id,
            staff_id = leave.staff_id,
            "Leave {}; {} slots opened for cover",
            label,
            opportunities.len()
        );
        Ok(LeaveDecision { leave, opportunities })
    }

    async fn broadcast_cover(&self, leave: &Leave, now: NaiveDateTime) -> Result<Vec<CoverOpportunity>> {
        let Some(staff) = db::directory::get_staff(&self.db, leave.staff_id).await? else {
            warn!(leave_id = leave.id, "Leave refers to unknown staff; no cover broadcast");
            return Ok(Vec::new());
        };

        let mut opportunities = Vec::new();
        for date in dates_inclusive(leave.start_date, leave.end_date) {
            let day = DayOfWeek::of(date);
            for slot in self.timetable.slots_for_staff_on_day(staff.id, day).await? {
                let candidates = self.matcher.free_staff(staff.id, Window::from(&slot)).await?;
                self.announce(&staff, &slot, date, &candidates, now).await?;
                opportunities.push(CoverOpportunity {
                    date,
                    slot,
                    candidates,
                });
            }
        }
        Ok(opportunities)
    }

    async fn announce(
        &self,
        absent: &Staff,
        slot: &TimetableSlot,
        date: NaiveDate,
        candidates: &[Staff],
        now: NaiveDateTime,
    ) -> Result<()> {
        let room = db::directory::classroom_name(&self.db, slot.classroom_id).await?;
        let notice = Message::new(
            NotificationKind::SubstitutionAlert,
            "Substitution Opportunity",
            format!(
                "{} is on leave on {}. {} in {} from {} to {} needs cover.",
                absent.name,
                date.format("%Y-%m-%d"),
                slot.subject.as_deref().unwrap_or("Class"),
                room,
                slot.start,
                slot.end
            ),
        )
        .with_related(json!({
            "date": date,
            "slot_id": slot.id,
            "classroom_id": slot.classroom_id,
            "original_staff_id": absent.id,
        }));

        for candidate in candidates {
            self.notifier.notify_staff(candidate.id, &notice, now).await?;
        }
        Ok(())
    }
}
