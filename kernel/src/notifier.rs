use crate::model::id::UserId;
use async_trait::async_trait;
use derive_new::new;
use shared::error::AppResult;

/// 繰り上げ通知のペイロード
#[derive(new, Debug, Clone)]
pub struct PromotionNotice {
    pub user_id: UserId,
    pub title: String,
    pub when_label: String,
    pub event_url: String,
}

/// 外部メッセージングサービスへのベストエフォート送信。
///
/// 呼び出し側はロスター更新のトランザクションが確定した後に
/// fire-and-forget で呼ぶこと。失敗はログに残すだけで、
/// ロスター操作の成否には影響させない。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_promoted(&self, notice: &PromotionNotice) -> AppResult<()>;
}
