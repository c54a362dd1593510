//! Attendance session store
//!
//! One row per (staff, classroom, date). Creation and promotion are single
//! conditional statements so concurrent writers cannot both win:
//! - creation relies on the `UNIQUE (staff_id, classroom_id, date)` key
//! - promotion only matches rows still in `Tracking`

use chrono::{NaiveDate, NaiveDateTime};
use spv_common::db::{AttendanceSession, SessionStatus};
use spv_common::Result;
use sqlx::{Executor, Pool, Sqlite};

const SESSION_COLUMNS: &str =
    "id, staff_id, classroom_id, date, check_in, last_seen, status";

pub async fn get_session<'e, E>(
    db: E,
    staff_id: i64,
    classroom_id: i64,
    date: NaiveDate,
) -> Result<Option<AttendanceSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let session = sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance WHERE staff_id = ? AND classroom_id = ? AND date = ?",
        SESSION_COLUMNS
    ))
    .bind(staff_id)
    .bind(classroom_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    Ok(session)
}

/// Insert a session unless one already exists for the key
///
/// Returns `true` when this call created the row.
pub async fn create_session_if_absent<'e, E>(
    db: E,
    staff_id: i64,
    classroom_id: i64,
    date: NaiveDate,
    at: NaiveDateTime,
    status: SessionStatus,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (staff_id, classroom_id, date, check_in, last_seen, status)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (staff_id, classroom_id, date) DO NOTHING
        "#,
    )
    .bind(staff_id)
    .bind(classroom_id)
    .bind(date)
    .bind(at)
    .bind(at)
    .bind(status)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move `last_seen` forward to `at`; an out-of-order older sighting leaves it unchanged
pub async fn touch_session<'e, E>(db: E, session_id: i64, at: NaiveDateTime) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE attendance SET last_seen = ? WHERE id = ? AND last_seen < ?")
        .bind(at)
        .bind(session_id)
        .bind(at)
        .execute(db)
        .await?;

    Ok(())
}

/// Promote a `Tracking` session to a final status
///
/// Returns `true` only for the caller whose update changed the row.
pub async fn promote_session<'e, E>(db: E, session_id: i64, status: SessionStatus) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE attendance SET status = ? WHERE id = ? AND status = ?")
        .bind(status)
        .bind(session_id)
        .bind(SessionStatus::Tracking)
        .execute(db)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn session_exists(
    db: &Pool<Sqlite>,
    staff_id: i64,
    classroom_id: i64,
    date: NaiveDate,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance WHERE staff_id = ? AND classroom_id = ? AND date = ?",
    )
    .bind(staff_id)
    .bind(classroom_id)
    .bind(date)
    .fetch_one(db)
    .await?;

    Ok(count > 0)
}

/// Most recently seen session of a staff member on `date`, in any room
pub async fn latest_session_for_staff(
    db: &Pool<Sqlite>,
    staff_id: i64,
    date: NaiveDate,
) -> Result<Option<AttendanceSession>> {
    let session = sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {} FROM attendance WHERE staff_id = ? AND date = ? ORDER BY last_seen DESC LIMIT 1",
        SESSION_COLUMNS
    ))
    .bind(staff_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    Ok(session)
}

pub async fn count_with_status(
    db: &Pool<Sqlite>,
    date: NaiveDate,
    status: SessionStatus,
) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE date = ? AND status = ?")
            .bind(date)
            .bind(status)
            .fetch_one(db)
            .await?;

    Ok(count)
}
