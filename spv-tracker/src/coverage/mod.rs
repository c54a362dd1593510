//! Coverage matching
//!
//! Finds staff free to cover a class while its owner is unavailable. The
//! matcher only computes candidates; [`meeting`] and [`leave`] decide who is
//! told what.

pub mod leave;
pub mod meeting;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use spv_common::db::{Staff, TimetableSlot};
use spv_common::{ClockTime, CoverSelection, DayOfWeek, Result};
use sqlx::{Pool, Sqlite};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::db;
use crate::timetable::TimetableIndex;

/// Span of one weekday during which cover is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub day: DayOfWeek,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl From<&TimetableSlot> for Window {
    fn from(slot: &TimetableSlot) -> Self {
        Self {
            day: slot.day_of_week,
            start: slot.start,
            end: slot.end,
        }
    }
}

/// Staff with no slot overlapping `window`, excluding `unavailable`
///
/// Overlap is half-open, so a slot ending exactly when the window starts
/// does not make its owner busy. `day_slots` must hold every slot of
/// `window.day`.
pub fn free_candidates(
    all_staff: &[Staff],
    day_slots: &[TimetableSlot],
    unavailable: i64,
    window: Window,
) -> Vec<Staff> {
    let busy: HashSet<i64> = day_slots
        .iter()
        .filter(|slot| slot.day_of_week == window.day && slot.overlaps(window.start, window.end))
        .map(|slot| slot.staff_id)
        .collect();

    all_staff
        .iter()
        .filter(|s| s.id != unavailable && !busy.contains(&s.id))
        .cloned()
        .collect()
}

pub struct CoverageMatcher {
    db: Pool<Sqlite>,
    timetable: Arc<dyn TimetableIndex>,
}

impl CoverageMatcher {
    pub fn new(db: Pool<Sqlite>, timetable: Arc<dyn TimetableIndex>) -> Self {
        Self { db, timetable }
    }

    /// Candidates able to cover `window` for `staff_id`
    ///
    /// The day's slots are read in one statement before the busy set is
    /// computed.
    pub async fn free_staff(&self, staff_id: i64, window: Window) -> Result<Vec<Staff>> {
        let day_slots = self.timetable.slots_on_day(window.day).await?;
        let all_staff = db::directory::list_staff(&self.db).await?;
        let free = free_candidates(&all_staff, &day_slots, staff_id, window);
        debug!(
            staff_id,
            day = %window.day,
            "{} of {} staff free {}-{}",
            free.len(),
            all_staff.len(),
            window.start,
            window.end
        );
        Ok(free)
    }
}

/// How one cover is chosen among the free candidates
#[derive(Debug)]
pub enum SelectionStrategy {
    /// Lowest staff id
    First,
    Random(Mutex<StdRng>),
    /// Longest since last assignment, never-assigned first
    LeastRecentlyAssigned(Mutex<HashMap<i64, NaiveDateTime>>),
}

impl SelectionStrategy {
    pub fn from_config(selection: CoverSelection, seed: Option<u64>) -> Self {
        match selection {
            CoverSelection::First => SelectionStrategy::First,
            CoverSelection::Random => SelectionStrategy::random(seed),
            CoverSelection::LeastRecent => SelectionStrategy::LeastRecentlyAssigned(Mutex::new(HashMap::new())),
        }
    }

    pub fn random(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SelectionStrategy::Random(Mutex::new(rng))
    }

    /// Choose one candidate and record the assignment at `at`
    pub fn pick(&self, candidates: &[Staff], at: NaiveDateTime) -> Option<Staff> {
        if candidates.is_empty() {
            return None;
        }
        match self {
            SelectionStrategy::First => candidates.iter().min_by_key(|s| s.id).cloned(),
            SelectionStrategy::Random(rng) => {
                let index = rng
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .gen_range(0..candidates.len());
                Some(candidates[index].clone())
            }
            SelectionStrategy::LeastRecentlyAssigned(history) => {
                let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
                // None orders before Some, so never-assigned staff come first
                let chosen = candidates
                    .iter()
                    .min_by_key(|s| (history.get(&s.id).copied(), s.id))
                    .cloned()?;
                history.insert(chosen.id, at);
                Some(chosen)
            }
        }
    }
}
