use crate::redis::RedisClient;
use async_trait::async_trait;
use derive_new::new;
use kernel::model::{auth::AccessToken, id::UserId};
use kernel::repository::auth::SessionRepository;
use shared::error::AppResult;
use std::sync::Arc;

#[derive(new)]
pub struct SessionRepositoryImpl {
    kv: Arc<RedisClient>,
    ttl: u64,
}

fn session_key(token: &AccessToken) -> String {
    format!("session:{}", token.as_str())
}

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn create(&self, user_id: UserId) -> AppResult<AccessToken> {
        let token = AccessToken(uuid::Uuid::new_v4().simple().to_string());
        self.kv
            .set_ex(&session_key(&token), user_id.as_str(), self.ttl)
            .await?;
        Ok(token)
    }

    async fn resolve(&self, token: &AccessToken) -> AppResult<Option<UserId>> {
        let Some(raw) = self.kv.get(&session_key(token)).await? else {
            return Ok(None);
        };
        // 保存時に検証済みなので失敗しないはずだが、
        // 壊れた値はセッション無効として扱う
        Ok(raw.parse().ok())
    }

    async fn revoke(&self, token: &AccessToken) -> AppResult<()> {
        self.kv.delete(&session_key(token)).await
    }
}
