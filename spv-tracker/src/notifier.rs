//! Recipient resolution and fan-out
//!
//! Turns "tell this staff member / their department heads / the admins"
//! into one [`Notice`] per distinct user.

use chrono::NaiveDateTime;
use spv_common::db::{Staff, User};
use spv_common::{NotificationKind, Result};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::directory;
use crate::sinks::{EmailSink, Notice, NotificationSink};

/// Content of a notice, independent of its recipient
#[derive(Debug, Clone)]
pub struct Message {
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub related_data: Option<serde_json::Value>,
    /// Also deliver by email
    pub email: bool,
}

impl Message {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind,
            related_data: None,
            email: false,
        }
    }

    pub fn with_related(mut self, related: serde_json::Value) -> Self {
        self.related_data = Some(related);
        self
    }

    pub fn with_email(mut self) -> Self {
        self.email = true;
        self
    }
}

pub struct Notifier {
    db: Pool<Sqlite>,
    sink: Arc<dyn NotificationSink>,
    email: Arc<dyn EmailSink>,
}

impl Notifier {
    pub fn new(db: Pool<Sqlite>, sink: Arc<dyn NotificationSink>, email: Arc<dyn EmailSink>) -> Self {
        Self { db, sink, email }
    }

    /// Deliver to one user. Email failures are logged, never returned.
    pub async fn notify_user(&self, user: &User, message: &Message, at: NaiveDateTime) -> Result<()> {
        self.sink
            .notify(Notice {
                recipient_id: user.id,
                title: message.title.clone(),
                message: message.body.clone(),
                kind: message.kind,
                related_data: message.related_data.clone(),
                created_at: at,
            })
            .await?;

        if message.email {
            if let Err(e) = self.email.send(&user.email, &message.title, &message.body).await {
                warn!(user_id = user.id, "Failed to send email: {}", e);
            }
        }
        Ok(())
    }

    /// Deliver to each distinct user once; returns how many were notified
    pub async fn notify_users(&self, users: &[User], message: &Message, at: NaiveDateTime) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut delivered = 0;
        for user in users {
            if seen.insert(user.id) {
                self.notify_user(user, message, at).await?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Deliver to the user account of a staff member, if there is one
    pub async fn notify_staff(&self, staff_id: i64, message: &Message, at: NaiveDateTime) -> Result<Option<User>> {
        match directory::user_for_staff(&self.db, staff_id).await? {
            Some(user) => {
                self.notify_user(&user, message, at).await?;
                Ok(Some(user))
            }
            None => {
                debug!(staff_id, kind = %message.kind, "No user account for staff; notice dropped");
                Ok(None)
            }
        }
    }

    /// Users heading the department of `staff`, excluding `staff` themself
    pub async fn department_heads_of(&self, staff: &Staff) -> Result<Vec<User>> {
        let Some(department) = staff.department.as_deref() else {
            return Ok(Vec::new());
        };
        let heads = directory::department_head_users(&self.db, department).await?;
        Ok(heads
            .into_iter()
            .filter(|u| u.staff_id != Some(staff.id))
            .collect())
    }

    pub async fn notify_department_heads(
        &self,
        staff: &Staff,
        message: &Message,
        at: NaiveDateTime,
    ) -> Result<usize> {
        let heads = self.department_heads_of(staff).await?;
        self.notify_users(&heads, message, at).await
    }

    pub async fn admins(&self) -> Result<Vec<User>> {
        directory::admin_users(&self.db).await
    }
}
