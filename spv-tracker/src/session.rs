//! Attendance session tracker
//!
//! Reconciles accepted sightings into the per-(staff, classroom, date)
//! session record.
//!
//! ```text
//!             first sighting              dwell >= threshold
//!  (no row) ─────────────────► Tracking ─────────────────────► Present | Late
//!                                 │  ▲                              │
//!                                 └──┘ dwell < threshold            └──┐ later sightings
//!                                      (last_seen moves)               ▼ only move last_seen
//! ```
//!
//! All writes for one key are serialised by an in-process keyed lock, and
//! each transition is a single conditional statement, so duplicate reports
//! racing each other create at most one row and promote at most once.

use chrono::{Duration, NaiveDateTime};
use serde_json::json;
use spv_common::db::{AttendanceSession, Classroom, SessionStatus, Staff, TimetableSlot};
use spv_common::{ClockTime, ConfirmationMode, Error, NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::db;
use crate::lateness::{classify, minutes_late, Punctuality};
use crate::notifier::{Message, Notifier};

/// Identity of one attendance session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub staff_id: i64,
    pub classroom_id: i64,
    pub date: chrono::NaiveDate,
}

/// Per-key async mutexes, created on demand
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Idle entries are pruned once the map grows past this size
    const PRUNE_AT: usize = 1024;

    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= Self::PRUNE_AT {
                // Only the map holds an idle entry's Arc
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of feeding one accepted sighting to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    /// First sighting of the day created a Tracking session
    Started(AttendanceSession),
    /// Dwell not reached yet
    StillTracking(AttendanceSession),
    /// Dwell reached; the session was promoted by this sighting
    Confirmed(AttendanceSession),
    /// Immediate mode classified the first sighting directly
    Classified(AttendanceSession),
    /// Session already final; only `last_seen` moved
    AlreadyMarked(AttendanceSession),
}

impl TrackOutcome {
    pub fn session(&self) -> &AttendanceSession {
        match self {
            TrackOutcome::Started(s)
            | TrackOutcome::StillTracking(s)
            | TrackOutcome::Confirmed(s)
            | TrackOutcome::Classified(s)
            | TrackOutcome::AlreadyMarked(s) => s,
        }
    }
}

/// Tracker tunables
#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub grace_minutes: i64,
    pub dwell: Duration,
    pub mode: ConfirmationMode,
}

impl From<&spv_common::EngineConfig> for TrackerSettings {
    fn from(config: &spv_common::EngineConfig) -> Self {
        Self {
            grace_minutes: config.grace_minutes,
            dwell: Duration::minutes(config.dwell_minutes),
            mode: config.confirmation_mode,
        }
    }
}

pub struct AttendanceSessionTracker {
    db: Pool<Sqlite>,
    notifier: Arc<Notifier>,
    settings: TrackerSettings,
    locks: KeyedLocks<SessionKey>,
}

impl AttendanceSessionTracker {
    pub fn new(db: Pool<Sqlite>, notifier: Arc<Notifier>, settings: TrackerSettings) -> Self {
        Self {
            db,
            notifier,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    pub fn settings(&self) -> TrackerSettings {
        self.settings
    }

    /// Apply one accepted sighting
    ///
    /// `slot` is the live timetable slot at `observed_at`, or `None` when the
    /// sighting arrived outside any slot for an already existing session.
    pub async fn record(
        &self,
        staff: &Staff,
        classroom: &Classroom,
        observed_at: NaiveDateTime,
        slot: Option<&TimetableSlot>,
    ) -> Result<TrackOutcome> {
        let key = SessionKey {
            staff_id: staff.id,
            classroom_id: classroom.id,
            date: observed_at.date(),
        };
        let _guard = self.locks.lock(key).await;

        let existing = db::attendance::get_session(&self.db, key.staff_id, key.classroom_id, key.date).await?;
        match existing {
            None => self.start(staff, classroom, key, observed_at, slot).await,
            Some(session) => self.advance(staff, classroom, session, observed_at, slot).await,
        }
    }

    async fn start(
        &self,
        staff: &Staff,
        classroom: &Classroom,
        key: SessionKey,
        observed_at: NaiveDateTime,
        slot: Option<&TimetableSlot>,
    ) -> Result<TrackOutcome> {
        let initial = match self.settings.mode {
            ConfirmationMode::Dwell => SessionStatus::Tracking,
            ConfirmationMode::Immediate => {
                SessionStatus::from(self.verdict(slot, key, observed_at))
            }
        };

        let created = db::attendance::create_session_if_absent(
            &self.db,
            key.staff_id,
            key.classroom_id,
            key.date,
            observed_at,
            initial,
        )
        .await?;

        let session = self.reload(key).await?;
        if !created {
            // Another writer (another process) created it first
            return self.advance(staff, classroom, session, observed_at, slot).await;
        }

        match initial {
            SessionStatus::Tracking => {
                info!(staff_id = staff.id, classroom_id = classroom.id, "Tracking started at {}", observed_at);
                Ok(TrackOutcome::Started(session))
            }
            status => {
                info!(staff_id = staff.id, classroom_id = classroom.id, "Marked {} on first sighting", status);
                if status == SessionStatus::Late {
                    self.raise_late(staff, classroom, &session, slot, observed_at).await?;
                }
                Ok(TrackOutcome::Classified(session))
            }
        }
    }

    async fn advance(
        &self,
        staff: &Staff,
        classroom: &Classroom,
        session: AttendanceSession,
        observed_at: NaiveDateTime,
        slot: Option<&TimetableSlot>,
    ) -> Result<TrackOutcome> {
        let key = SessionKey {
            staff_id: session.staff_id,
            classroom_id: session.classroom_id,
            date: session.date,
        };
        db::attendance::touch_session(&self.db, session.id, observed_at).await?;
        let session = self.reload(key).await?;

        if session.status.is_final() {
            debug!(staff_id = staff.id, "Session already {}; last seen {}", session.status, session.last_seen);
            return Ok(TrackOutcome::AlreadyMarked(session));
        }

        let dwelling = self.settings.mode == ConfirmationMode::Dwell;
        if dwelling && session.dwell() < self.settings.dwell {
            debug!(
                staff_id = staff.id,
                dwell_secs = session.dwell().num_seconds(),
                "Still tracking"
            );
            return Ok(TrackOutcome::StillTracking(session));
        }
        self.confirm(staff, classroom, session, slot, observed_at).await
    }

    /// Promote a Tracking session whose dwell reached the threshold
    async fn confirm(
        &self,
        staff: &Staff,
        classroom: &Classroom,
        session: AttendanceSession,
        slot: Option<&TimetableSlot>,
        observed_at: NaiveDateTime,
    ) -> Result<TrackOutcome> {
        let key = SessionKey {
            staff_id: session.staff_id,
            classroom_id: session.classroom_id,
            date: session.date,
        };
        let status = SessionStatus::from(self.verdict(slot, key, session.check_in));

        if !db::attendance::promote_session(&self.db, session.id, status).await? {
            // Lost the promotion to a concurrent writer
            return Ok(TrackOutcome::AlreadyMarked(self.reload(key).await?));
        }
        let session = self.reload(key).await?;
        info!(
            staff_id = staff.id,
            classroom_id = classroom.id,
            dwell_mins = session.dwell().num_minutes(),
            "Attendance confirmed as {}",
            status
        );

        if status == SessionStatus::Late {
            self.raise_late(staff, classroom, &session, slot, observed_at).await?;
        }
        Ok(TrackOutcome::Confirmed(session))
    }

    /// Lateness is judged from arrival against the live slot's start
    fn verdict(&self, slot: Option<&TimetableSlot>, key: SessionKey, arrived_at: NaiveDateTime) -> Punctuality {
        let scheduled_start = slot.map(|s| s.start.on(key.date));
        classify(scheduled_start, arrived_at, self.settings.grace_minutes)
    }

    /// Alert plus notices for a Late verdict
    async fn raise_late(
        &self,
        staff: &Staff,
        classroom: &Classroom,
        session: &AttendanceSession,
        slot: Option<&TimetableSlot>,
        at: NaiveDateTime,
    ) -> Result<()> {
        let late_by = slot
            .map(|s| minutes_late(s.start.on(session.date), session.check_in))
            .unwrap_or(0);
        let alert = format!(
            "{} marked Late at {} ({} minutes late)",
            staff.name,
            ClockTime::of(session.check_in),
            late_by
        );
        db::alerts::append_alert(&self.db, staff.id, classroom.id, &alert, at).await?;
        info!(staff_id = staff.id, classroom_id = classroom.id, "{}", alert);

        let related = json!({
            "staff_id": staff.id,
            "classroom_id": classroom.id,
            "minutes_late": late_by,
        });
        let subject = slot
            .and_then(|s| s.subject.clone())
            .unwrap_or_else(|| "class".to_string());

        let to_staff = Message::new(
            NotificationKind::LateArrival,
            "Late Arrival Alert",
            format!("You were marked late for your {} at {}", subject, classroom.name),
        )
        .with_related(related.clone());
        let to_heads = Message::new(
            NotificationKind::LateAlert,
            "Staff Late Arrival",
            format!(
                "{} arrived {} minutes late for {} in {}",
                staff.name, late_by, subject, classroom.name
            ),
        )
        .with_related(related);

        // Delivery is fire-and-forget; the verdict is already committed
        if let Err(e) = self.notifier.notify_staff(staff.id, &to_staff, at).await {
            warn!(staff_id = staff.id, "Failed to notify late staff member: {}", e);
        }
        if let Err(e) = self.notifier.notify_department_heads(staff, &to_heads, at).await {
            warn!(staff_id = staff.id, "Failed to notify department heads: {}", e);
        }
        Ok(())
    }

    /// Excuse a staff member pulled into a meeting: their session for the
    /// room becomes Present unless it already has a final status
    pub async fn mark_present(
        &self,
        staff_id: i64,
        classroom_id: i64,
        at: NaiveDateTime,
    ) -> Result<AttendanceSession> {
        let key = SessionKey {
            staff_id,
            classroom_id,
            date: at.date(),
        };
        let _guard = self.locks.lock(key).await;

        let created = db::attendance::create_session_if_absent(
            &self.db,
            staff_id,
            classroom_id,
            key.date,
            at,
            SessionStatus::Present,
        )
        .await?;
        if !created {
            let session = self.reload(key).await?;
            db::attendance::touch_session(&self.db, session.id, at).await?;
            if db::attendance::promote_session(&self.db, session.id, SessionStatus::Present).await? {
                info!(staff_id, classroom_id, "Tracking session marked Present for meeting");
            }
        }
        self.reload(key).await
    }

    async fn reload(&self, key: SessionKey) -> Result<AttendanceSession> {
        db::attendance::get_session(&self.db, key.staff_id, key.classroom_id, key.date)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!(
                    "attendance session for staff {} in classroom {} on {} vanished",
                    key.staff_id, key.classroom_id, key.date
                ))
            })
    }
}
