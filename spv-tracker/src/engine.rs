//! Component wiring
//!
//! Builds every engine component over one pool and configuration and
//! registers the watchdog sweeps with a scheduler.

use chrono::Duration;
use spv_common::EngineConfig;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::coverage::leave::LeaveDesk;
use crate::coverage::meeting::MeetingCoordinator;
use crate::coverage::{CoverageMatcher, SelectionStrategy};
use crate::ingest::PresenceIngestor;
use crate::notifier::Notifier;
use crate::scheduler::Scheduler;
use crate::session::{AttendanceSessionTracker, TrackerSettings};
use crate::sinks::{EmailSink, SqliteNotificationSink};
use crate::status::StatusBoard;
use crate::timetable::{SqliteTimetable, TimetableIndex};
use crate::watchdog::AbsenceWatchdog;

pub const REMINDER_SWEEP: &str = "upcoming-class-reminder";
pub const ABSENCE_SWEEP: &str = "absence-check";

pub struct Engine {
    pub db: Pool<Sqlite>,
    pub config: EngineConfig,
    pub clock: Arc<dyn Clock>,
    pub tracker: Arc<AttendanceSessionTracker>,
    pub ingestor: PresenceIngestor,
    pub watchdog: Arc<AbsenceWatchdog>,
    pub matcher: Arc<CoverageMatcher>,
    pub meetings: MeetingCoordinator,
    pub leaves: LeaveDesk,
    pub status: StatusBoard,
}

impl Engine {
    pub fn new(
        db: Pool<Sqlite>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        email: Arc<dyn EmailSink>,
    ) -> Self {
        let timetable: Arc<dyn TimetableIndex> = Arc::new(SqliteTimetable::new(db.clone()));
        let sink = Arc::new(SqliteNotificationSink::new(db.clone()));
        let notifier = Arc::new(Notifier::new(db.clone(), sink, email));

        let tracker = Arc::new(AttendanceSessionTracker::new(
            db.clone(),
            notifier.clone(),
            TrackerSettings::from(&config),
        ));
        let ingestor = PresenceIngestor::new(
            db.clone(),
            timetable.clone(),
            tracker.clone(),
            config.rssi_threshold,
        );
        let watchdog = Arc::new(AbsenceWatchdog::new(
            db.clone(),
            timetable.clone(),
            notifier.clone(),
            Duration::minutes(config.reminder_lead_minutes),
            Duration::minutes(config.absence_delay_minutes),
        ));

        let matcher = Arc::new(CoverageMatcher::new(db.clone(), timetable.clone()));
        let strategy = Arc::new(SelectionStrategy::from_config(
            config.cover_selection,
            config.cover_seed,
        ));
        let meetings = MeetingCoordinator::new(
            db.clone(),
            timetable.clone(),
            matcher.clone(),
            strategy,
            tracker.clone(),
            notifier.clone(),
        );
        let leaves = LeaveDesk::new(db.clone(), timetable.clone(), matcher.clone(), notifier);
        let status = StatusBoard::new(
            db.clone(),
            timetable,
            Duration::minutes(config.stale_signal_minutes),
        );

        Self {
            db,
            config,
            clock,
            tracker,
            ingestor,
            watchdog,
            matcher,
            meetings,
            leaves,
            status,
        }
    }

    /// Register both watchdog sweeps; abort the handles to stop them
    pub fn start_sweeps<S: Scheduler>(&self, scheduler: &S) -> Vec<JoinHandle<()>> {
        let period = self.config.sweep_interval();

        let (watchdog, clock) = (self.watchdog.clone(), self.clock.clone());
        let reminders = scheduler.every(REMINDER_SWEEP, period, move || {
            let (watchdog, clock) = (watchdog.clone(), clock.clone());
            async move { watchdog.remind_upcoming(clock.now()).await.map(|_| ()) }
        });

        let (watchdog, clock) = (self.watchdog.clone(), self.clock.clone());
        let absences = scheduler.every(ABSENCE_SWEEP, period, move || {
            let (watchdog, clock) = (watchdog.clone(), clock.clone());
            async move { watchdog.check_absences(clock.now()).await.map(|_| ()) }
        });

        vec![reminders, absences]
    }
}
