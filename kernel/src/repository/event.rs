use crate::model::{
    event::{
        event::{CreateEvent, DeleteEvent, ForceCancel},
        Event, JoinedEvent, RosterChange,
    },
    id::{EventId, UserId},
    roster::NormalizationReport,
};
use async_trait::async_trait;
use serde::Serialize;
use shared::error::AppResult;

/// normalize の対象イベントごとの結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNormalization {
    pub event_id: EventId,
    #[serde(flatten)]
    pub report: NormalizationReport,
    /// 実際に書き戻しが発生したか
    pub repaired: bool,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    // イベントを作成する（管理者操作）
    async fn create(&self, event: CreateEvent) -> AppResult<EventId>;
    // イベントを削除する（管理者操作）
    async fn delete(&self, event: DeleteEvent) -> AppResult<()>;
    // イベントを 1 件取得する
    async fn find_by_id(&self, event_id: EventId) -> AppResult<Option<Event>>;
    // 指定した年月のイベント一覧を開始日時順に取得する
    async fn find_in_month(&self, year: i32, month: u32) -> AppResult<Vec<Event>>;
    // 参加申込。定員に空きがなければキャンセル待ちへ入れる
    async fn join(&self, event_id: EventId, user_id: UserId) -> AppResult<JoinedEvent>;
    // 自己キャンセル。参加枠が空いたらキャンセル待ち先頭を繰り上げる
    async fn cancel(&self, event_id: EventId, user_id: UserId) -> AppResult<RosterChange>;
    // 管理者による強制キャンセル
    async fn force_cancel(&self, event: ForceCancel) -> AppResult<RosterChange>;
    // 壊れたリストの修復（1 イベント）
    async fn normalize(&self, event_id: EventId) -> AppResult<EventNormalization>;
    // 全イベントに対する修復スイープ
    async fn normalize_all(&self) -> AppResult<Vec<EventNormalization>>;
}
