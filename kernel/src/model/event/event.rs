use crate::model::id::{EventId, UserId};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use derive_new::new;

#[derive(new, Debug)]
pub struct CreateEvent {
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub timezone: Tz,
    pub time_label: Option<String>,
    pub location: Option<String>,
    pub capacity: i32,
    pub created_by: UserId,
}

#[derive(new, Debug)]
pub struct DeleteEvent {
    pub event_id: EventId,
    pub requested_user: UserId,
}

/// 管理者による強制キャンセル。
/// `promote` を false にするとキャンセル待ちからの除外として扱い、
/// 繰り上げを発生させない。
#[derive(new, Debug)]
pub struct ForceCancel {
    pub event_id: EventId,
    pub acting_user: UserId,
    pub target_user: UserId,
    pub promote: bool,
}
