use crate::model::{auth::AccessToken, id::UserId};
use async_trait::async_trait;
use shared::error::AppResult;

/// Redis に置くセッションの出し入れ
#[async_trait]
pub trait SessionRepository: Send + Sync {
    // セッションを作成しアクセストークンを発行する
    async fn create(&self, user_id: UserId) -> AppResult<AccessToken>;
    // アクセストークンからユーザー ID を引く
    async fn resolve(&self, token: &AccessToken) -> AppResult<Option<UserId>>;
    // ログアウト
    async fn revoke(&self, token: &AccessToken) -> AppResult<()>;
}

/// 管理者権限の判定。実装は静的な許可リストでもロール列でも構わない。
/// 起動時に注入し、リクエストごとに環境変数を読むような実装にはしない。
pub trait AuthorizationProvider: Send + Sync {
    fn is_admin(&self, user_id: &UserId) -> bool;
}

/// ID プロバイダーが発行した id_token の検証。
/// OAuth のコード交換自体はフロントエンド側の責務で、ここでは扱わない。
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> AppResult<UserId>;
}
