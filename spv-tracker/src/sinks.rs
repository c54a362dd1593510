//! Outbound delivery collaborators
//!
//! The engine only decides *that* someone is notified; these traits hand the
//! decision to whatever delivers it. The shipped implementations persist
//! in-app notifications and log outgoing email.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use spv_common::{NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::sync::Mutex;
use tracing::info;

use crate::db;

/// One notice addressed to one user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub recipient_id: i64,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_data: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notice: Notice) -> Result<()>;
}

#[async_trait]
pub trait EmailSink: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}

/// Stores notices in the `notifications` table
#[derive(Clone)]
pub struct SqliteNotificationSink {
    db: Pool<Sqlite>,
}

impl SqliteNotificationSink {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationSink for SqliteNotificationSink {
    async fn notify(&self, notice: Notice) -> Result<()> {
        db::notifications::insert_notification(
            &self.db,
            notice.recipient_id,
            &notice.title,
            &notice.message,
            notice.kind,
            notice.related_data.as_ref(),
            notice.created_at,
        )
        .await?;
        Ok(())
    }
}

/// Writes outgoing email to the log instead of a mail server
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSink;

#[async_trait]
impl EmailSink for LogEmailSink {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        info!(to = %address, subject = %subject, "Email queued: {}", body);
        Ok(())
    }
}

/// Keeps every sent email in memory
#[derive(Debug, Default)]
pub struct RecordingEmailSink {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEmailSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// (address, subject, body) of every email so far
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl EmailSink for RecordingEmailSink {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((address.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}
