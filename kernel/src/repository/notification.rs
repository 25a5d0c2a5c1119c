use crate::model::{
    id::{NotificationId, UserId},
    notification::{
        event::{CreateNotification, MarkRead},
        Notification,
    },
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    // 通知を 1 件保存する
    async fn add(&self, event: CreateNotification) -> AppResult<NotificationId>;
    // ユーザー自身の通知一覧（未読優先・新しい順）
    async fn find_by_user_id(&self, user_id: &UserId) -> AppResult<Vec<Notification>>;
    // 既読にする（冪等）
    async fn mark_read(&self, event: MarkRead) -> AppResult<()>;
}
