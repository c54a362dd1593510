//! Timetable queries

use spv_common::db::TimetableSlot;
use spv_common::{ClockTime, DayOfWeek, Error, Result};
use sqlx::{Pool, Sqlite};

const SLOT_COLUMNS: &str =
    "id, staff_id, classroom_id, day_of_week, start_minute, end_minute, subject";

/// Slot of `staff_id` in `classroom_id` on `day` whose `[start, end]` contains `time`
pub async fn find_slot(
    db: &Pool<Sqlite>,
    staff_id: i64,
    classroom_id: i64,
    day: DayOfWeek,
    time: ClockTime,
) -> Result<Option<TimetableSlot>> {
    let slot = sqlx::query_as::<_, TimetableSlot>(&format!(
        r#"
        SELECT {} FROM timetable
        WHERE staff_id = ? AND classroom_id = ? AND day_of_week = ?
          AND start_minute <= ? AND end_minute >= ?
        ORDER BY start_minute
        LIMIT 1
        "#,
        SLOT_COLUMNS
    ))
    .bind(staff_id)
    .bind(classroom_id)
    .bind(day)
    .bind(time)
    .bind(time)
    .fetch_optional(db)
    .await?;

    Ok(slot)
}

/// Slot of `staff_id` in any room on `day` whose `[start, end]` contains `time`
pub async fn active_slot_for_staff(
    db: &Pool<Sqlite>,
    staff_id: i64,
    day: DayOfWeek,
    time: ClockTime,
) -> Result<Option<TimetableSlot>> {
    let slot = sqlx::query_as::<_, TimetableSlot>(&format!(
        r#"
        SELECT {} FROM timetable
        WHERE staff_id = ? AND day_of_week = ? AND start_minute <= ? AND end_minute >= ?
        ORDER BY start_minute
        LIMIT 1
        "#,
        SLOT_COLUMNS
    ))
    .bind(staff_id)
    .bind(day)
    .bind(time)
    .bind(time)
    .fetch_optional(db)
    .await?;

    Ok(slot)
}

pub async fn slots_for_staff_on_day(
    db: &Pool<Sqlite>,
    staff_id: i64,
    day: DayOfWeek,
) -> Result<Vec<TimetableSlot>> {
    let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
        "SELECT {} FROM timetable WHERE staff_id = ? AND day_of_week = ? ORDER BY start_minute",
        SLOT_COLUMNS
    ))
    .bind(staff_id)
    .bind(day)
    .fetch_all(db)
    .await?;

    Ok(slots)
}

/// Slots on `day` starting exactly at `time`
pub async fn slots_starting_at(
    db: &Pool<Sqlite>,
    day: DayOfWeek,
    time: ClockTime,
) -> Result<Vec<TimetableSlot>> {
    let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
        "SELECT {} FROM timetable WHERE day_of_week = ? AND start_minute = ? ORDER BY id",
        SLOT_COLUMNS
    ))
    .bind(day)
    .bind(time)
    .fetch_all(db)
    .await?;

    Ok(slots)
}

/// Every slot on `day`, read in one statement
pub async fn slots_on_day(db: &Pool<Sqlite>, day: DayOfWeek) -> Result<Vec<TimetableSlot>> {
    let slots = sqlx::query_as::<_, TimetableSlot>(&format!(
        "SELECT {} FROM timetable WHERE day_of_week = ? ORDER BY staff_id, start_minute",
        SLOT_COLUMNS
    ))
    .bind(day)
    .fetch_all(db)
    .await?;

    Ok(slots)
}

/// Fields for a new timetable slot
#[derive(Debug, Clone)]
pub struct NewSlot<'a> {
    pub staff_id: i64,
    pub classroom_id: i64,
    pub day_of_week: DayOfWeek,
    pub start: ClockTime,
    pub end: ClockTime,
    pub subject: Option<&'a str>,
}

pub async fn insert_slot(db: &Pool<Sqlite>, slot: NewSlot<'_>) -> Result<i64> {
    if slot.start >= slot.end {
        return Err(Error::InvalidInput(format!(
            "slot must start before it ends ({} >= {})",
            slot.start, slot.end
        )));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO timetable (staff_id, classroom_id, day_of_week, start_minute, end_minute, subject)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(slot.staff_id)
    .bind(slot.classroom_id)
    .bind(slot.day_of_week)
    .bind(slot.start)
    .bind(slot.end)
    .bind(slot.subject)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}
