use chrono::{DateTime, Utc};
use kernel::model::{
    id::{EventId, NotificationId},
    notification::{Notification, NotificationKind},
};
use shared::error::{AppError, AppResult};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRow {
    pub notification_id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub event_id: Uuid,
    pub title: String,
    pub when_label: String,
    pub url: String,
    pub reason: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(value: NotificationRow) -> AppResult<Self> {
        let kind: NotificationKind = value.kind.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("unknown notification kind: {}", value.kind))
        })?;
        Ok(Notification {
            id: NotificationId::from(value.notification_id),
            user_id: value.user_id.parse()?,
            kind,
            event_id: EventId::from(value.event_id),
            title: value.title,
            when_label: value.when_label,
            url: value.url,
            reason: value.reason,
            is_read: value.is_read,
            created_at: value.created_at,
        })
    }
}
