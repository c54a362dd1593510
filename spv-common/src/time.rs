//! Calendar and clock-time utilities
//!
//! Timetables are weekly and minute-precision. A [`ClockTime`] is a time of
//! day stored as minutes since midnight, rendered as `HH:MM`. All wall-clock
//! values in the engine are naive local times of the school.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Day of the week a timetable slot repeats on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Day of week a calendar date falls on
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        DayOfWeek::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted) || d.as_str()[..3].eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("unknown day of week: {}", s)))
    }
}

/// Minute-precision time of day (minutes since midnight, 0..1440)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct ClockTime(i64);

impl ClockTime {
    pub const MINUTES_PER_DAY: i64 = 24 * 60;

    /// Build from hour and minute, rejecting out-of-range values
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidInput(format!(
                "clock time out of range: {}:{}",
                hour, minute
            )));
        }
        Ok(Self((hour * 60 + minute) as i64))
    }

    /// Time of day of a timestamp, truncated to the minute
    pub fn of(at: NaiveDateTime) -> Self {
        Self::from(at.time())
    }

    pub fn minutes(&self) -> i64 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        (self.0 / 60) as u32
    }

    pub fn minute(&self) -> u32 {
        (self.0 % 60) as u32
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    /// This time of day on a specific date
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as i64)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    /// Parse `HH:MM` (a single-digit hour is accepted)
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("expected HH:MM, got {:?}", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every date from `start` to `end`, both inclusive
pub fn dates_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let days = (end - start).num_days();
    (0..=days.max(-1)).map(move |offset| start + Duration::days(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_of_week_from_date() {
        // 2024-01-01 was a Monday
        assert_eq!(DayOfWeek::of(date(2024, 1, 1)), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::of(date(2024, 1, 7)), DayOfWeek::Sunday);
    }

    #[test]
    fn test_day_of_week_parse() {
        assert_eq!("monday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
        assert_eq!("Sat".parse::<DayOfWeek>().unwrap(), DayOfWeek::Saturday);
        assert!("Funday".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn test_clock_time_parse_and_display() {
        let t: ClockTime = "9:05".parse().unwrap();
        assert_eq!(t.minutes(), 545);
        assert_eq!(t.to_string(), "09:05");
        assert_eq!("23:59".parse::<ClockTime>().unwrap().minutes(), 1439);
    }

    #[test]
    fn test_clock_time_rejects_garbage() {
        for bad in ["24:00", "12:60", "1200", "12:5", "", "ab:cd", "123:00"] {
            assert!(bad.parse::<ClockTime>().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_clock_time_of_truncates_seconds() {
        let at = date(2024, 1, 1).and_hms_opt(9, 5, 59).unwrap();
        assert_eq!(ClockTime::of(at).to_string(), "09:05");
    }

    #[test]
    fn test_clock_time_serde_uses_hh_mm() {
        let t = ClockTime::new(14, 30).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"14:30\"");
        let back: ClockTime = serde_json::from_str("\"14:30\"").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_dates_inclusive() {
        let days: Vec<_> = dates_inclusive(date(2024, 1, 30), date(2024, 2, 2)).collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[3], date(2024, 2, 2));
        assert_eq!(dates_inclusive(date(2024, 1, 2), date(2024, 1, 1)).count(), 0);
    }
}
