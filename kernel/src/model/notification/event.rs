use crate::model::{
    id::{EventId, NotificationId, UserId},
    notification::NotificationKind,
};
use derive_new::new;

#[derive(new, Debug, Clone)]
pub struct CreateNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub event_id: EventId,
    pub title: String,
    pub when_label: String,
    pub url: String,
    pub reason: Option<String>,
}

#[derive(new, Debug)]
pub struct MarkRead {
    pub user_id: UserId,
    pub notification_id: NotificationId,
}
