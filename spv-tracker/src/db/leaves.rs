//! Leave requests

use chrono::NaiveDate;
use spv_common::db::{Leave, LeaveStatus, LeaveType};
use spv_common::{Error, Result};
use sqlx::{Pool, Sqlite};

const LEAVE_COLUMNS: &str =
    "id, staff_id, start_date, end_date, reason, leave_type, status, admin_notes";

pub async fn insert_leave(
    db: &Pool<Sqlite>,
    staff_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: &str,
    leave_type: LeaveType,
) -> Result<i64> {
    if start_date > end_date {
        return Err(Error::InvalidInput(format!(
            "leave starts after it ends ({} > {})",
            start_date, end_date
        )));
    }
    if reason.trim().is_empty() {
        return Err(Error::InvalidInput("leave reason must not be empty".to_string()));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leaves (staff_id, start_date, end_date, reason, leave_type, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(staff_id)
    .bind(start_date)
    .bind(end_date)
    .bind(reason.trim())
    .bind(leave_type)
    .bind(LeaveStatus::Pending)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_leave(db: &Pool<Sqlite>, leave_id: i64) -> Result<Option<Leave>> {
    let leave = sqlx::query_as::<_, Leave>(&format!("SELECT {} FROM leaves WHERE id = ?", LEAVE_COLUMNS))
        .bind(leave_id)
        .fetch_optional(db)
        .await?;

    Ok(leave)
}

/// Record a decision on a pending leave
///
/// Returns `None` when the leave does not exist or was already decided;
/// of two racing decisions only one matches the `pending` row.
pub async fn decide_pending_leave(
    db: &Pool<Sqlite>,
    leave_id: i64,
    status: LeaveStatus,
    admin_notes: Option<&str>,
) -> Result<Option<Leave>> {
    let result = sqlx::query("UPDATE leaves SET status = ?, admin_notes = ? WHERE id = ? AND status = ?")
        .bind(status)
        .bind(admin_notes)
        .bind(leave_id)
        .bind(LeaveStatus::Pending)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_leave(db, leave_id).await
}

pub async fn count_pending(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leaves WHERE status = ?")
        .bind(LeaveStatus::Pending)
        .fetch_one(db)
        .await?;

    Ok(count)
}
