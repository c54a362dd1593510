//! Alert audit trail (append-only)

use chrono::NaiveDateTime;
use serde::Serialize;
use spv_common::Result;
use sqlx::{Executor, Pool, Sqlite};

pub async fn append_alert<'e, E>(
    db: E,
    staff_id: i64,
    classroom_id: i64,
    message: &str,
    at: NaiveDateTime,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO alerts (staff_id, classroom_id, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(staff_id)
    .bind(classroom_id)
    .bind(message)
    .bind(at)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Alert joined with staff and room names for display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AlertView {
    pub id: i64,
    pub staff_id: i64,
    pub classroom_id: i64,
    pub staff_name: String,
    pub room_name: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

/// Newest alerts first
pub async fn recent_alerts(db: &Pool<Sqlite>, limit: i64) -> Result<Vec<AlertView>> {
    let alerts = sqlx::query_as::<_, AlertView>(
        r#"
        SELECT a.id, a.staff_id, a.classroom_id, s.name AS staff_name, c.name AS room_name,
               a.message, a.created_at
        FROM alerts a
        JOIN staff s ON s.id = a.staff_id
        JOIN classrooms c ON c.id = a.classroom_id
        ORDER BY a.created_at DESC, a.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(alerts)
}

pub async fn alerts_for_staff(db: &Pool<Sqlite>, staff_id: i64) -> Result<Vec<AlertView>> {
    let alerts = sqlx::query_as::<_, AlertView>(
        r#"
        SELECT a.id, a.staff_id, a.classroom_id, s.name AS staff_name, c.name AS room_name,
               a.message, a.created_at
        FROM alerts a
        JOIN staff s ON s.id = a.staff_id
        JOIN classrooms c ON c.id = a.classroom_id
        WHERE a.staff_id = ?
        ORDER BY a.created_at, a.id
        "#,
    )
    .bind(staff_id)
    .fetch_all(db)
    .await?;

    Ok(alerts)
}
