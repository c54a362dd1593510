//! Absence watchdog
//!
//! Two minute-granularity sweeps over the timetable:
//!
//! - [`AbsenceWatchdog::remind_upcoming`] warns staff whose class starts
//!   `reminder_lead` from now.
//! - [`AbsenceWatchdog::check_absences`] raises an alert for every slot that
//!   started `absence_delay` ago without any session in its room.
//!
//! Each sweep matches slots by the exact (day, HH:MM) of its target time, so
//! a slot is considered once per day. A tick that fails or is skipped is not
//! replayed and its minute is not revisited.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::json;
use spv_common::db::TimetableSlot;
use spv_common::{ClockTime, DayOfWeek, NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::db;
use crate::notifier::{Message, Notifier};
use crate::timetable::TimetableIndex;

/// Window in which an earlier reminder suppresses a new one
const REMINDER_DEDUP_WINDOW: i64 = 60;

/// Summary of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Slots matching the target minute
    pub matched: usize,
    /// Slots that produced an alert or reminder
    pub raised: usize,
    /// Slots passed over (already reminded, or staff present)
    pub skipped: usize,
    /// Slots whose processing failed
    pub failed: usize,
}

pub struct AbsenceWatchdog {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
    notifier: Arc<Notifier>,
    reminder_lead: Duration,
    absence_delay: Duration,
}

impl AbsenceWatchdog {
    pub fn new(
        db: Pool<Sqlite>,
        timetable: Arc<dyn TimetableIndex>,
        notifier: Arc<Notifier>,
        reminder_lead: Duration,
        absence_delay: Duration,
    ) -> Self {
        Self {
            db,
            timetable,
            notifier,
            reminder_lead,
            absence_delay,
        }
    }

    /// Pre-arrival reminder sweep
    pub async fn remind_upcoming(&self, now: NaiveDateTime) -> Result<SweepReport> {
        let target = now + self.reminder_lead;
        let slots = self.slots_starting(target).await?;

        let mut report = SweepReport {
            matched: slots.len(),
            ..Default::default()
        };
        for slot in &slots {
            match self.remind(slot, now).await {
                Ok(true) => report.raised += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(slot_id = slot.id, staff_id = slot.staff_id, "Reminder failed: {}", e);
                }
            }
        }

        if report.matched > 0 {
            info!(
                "Reminder sweep for {}: {} matched, {} sent, {} skipped, {} failed",
                target, report.matched, report.raised, report.skipped, report.failed
            );
        }
        Ok(report)
    }

    /// Post-start absence sweep
    pub async fn check_absences(&self, now: NaiveDateTime) -> Result<SweepReport> {
        let target = now - self.absence_delay;
        let slots = self.slots_starting(target).await?;

        let mut report = SweepReport {
            matched: slots.len(),
            ..Default::default()
        };
        for slot in &slots {
            match self.check_slot(slot, target, now).await {
                Ok(true) => report.raised += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(slot_id = slot.id, staff_id = slot.staff_id, "Absence check failed: {}", e);
                }
            }
        }

        if report.matched > 0 {
            info!(
                "Absence sweep for {}: {} matched, {} absent, {} present, {} failed",
                target, report.matched, report.raised, report.skipped, report.failed
            );
        }
        Ok(report)
    }

    async fn slots_starting(&self, target: NaiveDateTime) -> Result<Vec<TimetableSlot>> {
        let day = DayOfWeek::of(target.date());
        self.timetable.slots_starting_at(day, ClockTime::of(target)).await
    }

    /// Returns whether a reminder was sent
    async fn remind(&self, slot: &TimetableSlot, now: NaiveDateTime) -> Result<bool> {
        let Some(staff) = db::directory::get_staff(&self.db, slot.staff_id).await? else {
            warn!(slot_id = slot.id, staff_id = slot.staff_id, "Slot refers to unknown staff");
            return Ok(false);
        };
        // Staff without a login still have their department heads reminded
        let user = db::directory::user_for_staff(&self.db, staff.id).await?;
        if let Some(user) = &user {
            let since = now - Duration::seconds(REMINDER_DEDUP_WINDOW);
            if db::notifications::sent_since(&self.db, user.id, NotificationKind::UpcomingClass, since).await? {
                return Ok(false);
            }
        }

        let room = db::directory::classroom_name(&self.db, slot.classroom_id).await?;
        let subject = slot.subject.as_deref().unwrap_or("class");
        let related = json!({
            "slot_id": slot.id,
            "classroom_id": slot.classroom_id,
            "start": slot.start,
        });

        let to_staff = Message::new(
            NotificationKind::UpcomingClass,
            "Upcoming Class",
            format!("Your {} in {} starts at {}", subject, room, slot.start),
        )
        .with_related(related.clone());
        if let Some(user) = &user {
            self.notifier.notify_user(user, &to_staff, now).await?;
        }

        let to_heads = Message::new(
            NotificationKind::UpcomingClassDept,
            "Upcoming Class in Department",
            format!("{} has {} in {} at {}", staff.name, subject, room, slot.start),
        )
        .with_related(related);
        let heads = self.notifier.notify_department_heads(&staff, &to_heads, now).await?;

        Ok(user.is_some() || heads > 0)
    }

    /// Returns whether the staff member was found absent
    async fn check_slot(
        &self,
        slot: &TimetableSlot,
        slot_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<bool> {
        let date = slot_start.date();
        if db::attendance::session_exists(&self.db, slot.staff_id, slot.classroom_id, date).await? {
            return Ok(false);
        }
        let Some(staff) = db::directory::get_staff(&self.db, slot.staff_id).await? else {
            warn!(slot_id = slot.id, staff_id = slot.staff_id, "Slot refers to unknown staff");
            return Ok(false);
        };

        let room = db::directory::classroom_name(&self.db, slot.classroom_id).await?;
        let minutes = self.absence_delay.num_minutes();
        let alert = format!(
            "{} not detected in {} {} minutes after the {} start",
            staff.name, room, minutes, slot.start
        );
        db::alerts::append_alert(&self.db, staff.id, slot.classroom_id, &alert, now).await?;
        warn!(staff_id = staff.id, classroom_id = slot.classroom_id, "{}", alert);

        let message = Message::new(NotificationKind::AbsenceWarning, "Absence Warning", alert).with_related(
            json!({
                "staff_id": staff.id,
                "slot_id": slot.id,
                "classroom_id": slot.classroom_id,
            }),
        );

        let mut recipients = self.notifier.admins().await?;
        recipients.extend(self.notifier.department_heads_of(&staff).await?);
        if let Some(user) = db::directory::user_for_staff(&self.db, staff.id).await? {
            recipients.push(user);
        }
        self.notifier.notify_users(&recipients, &message, now).await?;

        Ok(true)
    }
}
