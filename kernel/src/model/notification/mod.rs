use crate::model::id::{EventId, NotificationId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod event;

/// ユーザーに紐づくアプリ内通知。既読フラグ以外は作成後に変化しない。
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub event_id: EventId,
    pub title: String,
    pub when_label: String,
    pub url: String,
    pub reason: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationKind {
    /// キャンセル待ちから参加へ繰り上がった
    Promoted,
    /// 管理者によって外された
    AdminCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_round_trips_through_kebab_case() {
        assert_eq!(NotificationKind::Promoted.to_string(), "promoted");
        assert_eq!(NotificationKind::AdminCancelled.to_string(), "admin-cancelled");
        assert_eq!(
            NotificationKind::from_str("admin-cancelled").unwrap(),
            NotificationKind::AdminCancelled
        );
    }
}
