//! Immediate meeting-pull
//!
//! An executive calls a staff member away right now. If they are teaching,
//! they are excused for the room, one free colleague is assigned to cover,
//! and both are told by notice and email.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::json;
use spv_common::db::{Staff, TimetableSlot, UserRole};
use spv_common::{ClockTime, DayOfWeek, Error, NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};

use super::{CoverageMatcher, SelectionStrategy, Window};
use crate::db;
use crate::notifier::{Message, Notifier};
use crate::session::AttendanceSessionTracker;
use crate::timetable::TimetableIndex;

#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub staff_id: i64,
    pub requester_role: UserRole,
    pub requester_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingOutcome {
    /// Text sent to the requested staff member
    pub message: String,
    /// Slot the staff member was pulled out of, if any
    pub active_slot: Option<TimetableSlot>,
    pub covered_by: Option<Staff>,
}

pub struct MeetingCoordinator {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
    matcher: Arc<CoverageMatcher>,
    strategy: Arc<SelectionStrategy>,
    tracker: Arc<AttendanceSessionTracker>,
    notifier: Arc<Notifier>,
}

impl MeetingCoordinator {
    pub fn new(
        db: Pool<Sqlite>,
        timetable: Arc<dyn TimetableIndex>,
        matcher: Arc<CoverageMatcher>,
        strategy: Arc<SelectionStrategy>,
        tracker: Arc<AttendanceSessionTracker>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            db,
            timetable,
            matcher,
            strategy,
            tracker,
            notifier,
        }
    }

    pub async fn request(&self, request: &MeetingRequest, now: NaiveDateTime) -> Result<MeetingOutcome> {
        if !request.requester_role.is_executive() {
            return Err(Error::Forbidden(
                "only principal, secretary or director may request a meeting".to_string(),
            ));
        }
        let target = db::directory::get_staff(&self.db, request.staff_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Staff {}", request.staff_id)))?;

        let role = request.requester_role.as_str();
        let mut message = format!(
            "{} ({}) requests a meeting with you immediately.",
            role, request.requester_name
        );

        let day = DayOfWeek::of(now.date());
        let active_slot = self
            .timetable
            .active_slot(target.id, day, ClockTime::of(now))
            .await?;

        let mut covered_by = None;
        if let Some(slot) = &active_slot {
            self.tracker.mark_present(target.id, slot.classroom_id, now).await?;

            let room = db::directory::classroom_name(&self.db, slot.classroom_id).await?;
            let candidates = self.matcher.free_staff(target.id, Window::from(slot)).await?;
            covered_by = self.strategy.pick(&candidates, now);

            match &covered_by {
                Some(cover) => {
                    self.assign_cover(cover, &target, slot, &room, request, now).await;
                    message.push_str(&format!(
                        " Your class in {} will be covered by {}.",
                        room, cover.name
                    ));
                }
                None => {
                    warn!(staff_id = target.id, "No free staff to cover {}", room);
                    message.push_str(&format!(
                        " Note: No free staff available to cover your current class in {}.",
                        room
                    ));
                }
            }
        }

        let notice = Message::new(NotificationKind::MeetingRequest, "Urgent Meeting Request", message.clone())
            .with_related(json!({ "requester_role": role }))
            .with_email();
        self.notifier.notify_staff(target.id, &notice, now).await?;

        info!(
            staff_id = target.id,
            covered_by = covered_by.as_ref().map(|s| s.id),
            "Meeting requested by {} ({})",
            role,
            request.requester_name
        );
        Ok(MeetingOutcome {
            message,
            active_slot,
            covered_by,
        })
    }

    /// Tell the chosen colleague; delivery failures do not undo the request
    async fn assign_cover(
        &self,
        cover: &Staff,
        target: &Staff,
        slot: &TimetableSlot,
        room: &str,
        request: &MeetingRequest,
        now: NaiveDateTime,
    ) {
        let body = format!(
            "Please cover {} in {} for {}. Requested by {} ({}).",
            slot.subject.as_deref().unwrap_or("class"),
            room,
            target.name,
            request.requester_role.as_str(),
            request.requester_name
        );
        let notice = Message::new(NotificationKind::MeetingRequest, "Class Substitution Request", body)
            .with_related(json!({
                "classroom_id": slot.classroom_id,
                "original_staff_id": target.id,
                "requester_role": request.requester_role.as_str(),
            }))
            .with_email();

        if let Err(e) = self.notifier.notify_staff(cover.id, &notice, now).await {
            warn!(staff_id = cover.id, "Failed to notify cover: {}", e);
        }
    }
}
