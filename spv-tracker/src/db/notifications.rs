//! Persisted notifications (the in-app inbox of each user)

use chrono::NaiveDateTime;
use spv_common::db::Notification;
use spv_common::{NotificationKind, Result};
use sqlx::{Pool, Sqlite};

pub async fn insert_notification(
    db: &Pool<Sqlite>,
    recipient_id: i64,
    title: &str,
    message: &str,
    kind: NotificationKind,
    related_data: Option<&serde_json::Value>,
    at: NaiveDateTime,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, title, message, kind, related_data, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipient_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(related_data.map(|v| v.to_string()))
    .bind(at)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Whether `recipient_id` received a notice of `kind` at or after `since`
pub async fn sent_since(
    db: &Pool<Sqlite>,
    recipient_id: i64,
    kind: NotificationKind,
    since: NaiveDateTime,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND kind = ? AND created_at >= ?",
    )
    .bind(recipient_id)
    .bind(kind)
    .bind(since)
    .fetch_one(db)
    .await?;

    Ok(count > 0)
}

/// Inbox of a user, oldest first
pub async fn notifications_for(db: &Pool<Sqlite>, recipient_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, recipient_id, title, message, kind, is_read, related_data, created_at
        FROM notifications
        WHERE recipient_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(recipient_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}
