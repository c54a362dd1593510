//! Lateness classification
//!
//! Lateness is judged by arrival (the session's check-in), not by when the
//! session was confirmed.

use chrono::{Duration, NaiveDateTime};
use spv_common::db::SessionStatus;

/// Verdict of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuality {
    Present,
    Late,
}

impl From<Punctuality> for SessionStatus {
    fn from(p: Punctuality) -> Self {
        match p {
            Punctuality::Present => SessionStatus::Present,
            Punctuality::Late => SessionStatus::Late,
        }
    }
}

/// Classify an arrival against the scheduled start
///
/// Without a scheduled start there is nothing to be late for, so the
/// arrival counts as present. Arriving early is always present. Arriving
/// exactly `grace_minutes` after the start is still present.
pub fn classify(
    scheduled_start: Option<NaiveDateTime>,
    arrived_at: NaiveDateTime,
    grace_minutes: i64,
) -> Punctuality {
    let Some(start) = scheduled_start else {
        return Punctuality::Present;
    };

    if arrived_at - start > Duration::minutes(grace_minutes) {
        Punctuality::Late
    } else {
        Punctuality::Present
    }
}

/// Minutes after the scheduled start, rounded to the nearest minute (never negative)
pub fn minutes_late(scheduled_start: NaiveDateTime, arrived_at: NaiveDateTime) -> i64 {
    let seconds = (arrived_at - scheduled_start).num_seconds().max(0);
    (seconds + 30) / 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_exactly_grace_is_present() {
        assert_eq!(classify(Some(at(9, 0, 0)), at(9, 15, 0), 15), Punctuality::Present);
    }

    #[test]
    fn test_one_minute_past_grace_is_late() {
        assert_eq!(classify(Some(at(9, 0, 0)), at(9, 16, 0), 15), Punctuality::Late);
    }

    #[test]
    fn test_early_arrival_is_present() {
        assert_eq!(classify(Some(at(9, 0, 0)), at(8, 40, 0), 15), Punctuality::Present);
        assert_eq!(classify(Some(at(9, 0, 0)), at(8, 40, 0), 0), Punctuality::Present);
    }

    #[test]
    fn test_missing_start_is_present() {
        assert_eq!(classify(None, at(23, 0, 0), 0), Punctuality::Present);
    }

    #[test]
    fn test_zero_grace() {
        assert_eq!(classify(Some(at(9, 0, 0)), at(9, 0, 0), 0), Punctuality::Present);
        assert_eq!(classify(Some(at(9, 0, 0)), at(9, 0, 1), 0), Punctuality::Late);
    }

    #[test]
    fn test_minutes_late_rounding() {
        assert_eq!(minutes_late(at(9, 0, 0), at(9, 20, 0)), 20);
        assert_eq!(minutes_late(at(9, 0, 0), at(9, 20, 29)), 20);
        assert_eq!(minutes_late(at(9, 0, 0), at(9, 20, 30)), 21);
        assert_eq!(minutes_late(at(9, 0, 0), at(8, 50, 0)), 0);
    }

    #[test]
    fn test_verdict_maps_to_final_status() {
        assert_eq!(SessionStatus::from(Punctuality::Late), SessionStatus::Late);
        assert!(SessionStatus::from(Punctuality::Present).is_final());
    }
}
