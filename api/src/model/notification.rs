use chrono::{DateTime, Utc};
use kernel::model::{
    id::{EventId, NotificationId},
    notification::{Notification, NotificationKind},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsResponse {
    pub items: Vec<NotificationResponse>,
}

impl From<Vec<Notification>> for NotificationsResponse {
    fn from(value: Vec<Notification>) -> Self {
        Self {
            items: value.into_iter().map(NotificationResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub event_id: EventId,
    pub title: String,
    pub when_label: String,
    pub url: String,
    pub reason: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(value: Notification) -> Self {
        let Notification {
            id,
            user_id: _,
            kind,
            event_id,
            title,
            when_label,
            url,
            reason,
            is_read,
            created_at,
        } = value;
        Self {
            id,
            kind,
            event_id,
            title,
            when_label,
            url,
            reason,
            read: is_read,
            created_at,
        }
    }
}
