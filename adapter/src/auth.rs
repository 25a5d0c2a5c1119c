use async_trait::async_trait;
use kernel::model::id::UserId;
use kernel::repository::auth::{AuthorizationProvider, IdTokenVerifier};
use serde::Deserialize;
use shared::{
    config::{AdminConfig, LineConfig},
    error::{AppError, AppResult},
};
use std::collections::HashSet;
use std::time::Duration;

/// 設定で与えた許可リストによる管理者判定。
/// 起動時に一度だけ構築し、以後は読み取り専用。
pub struct StaticAdminList {
    admins: HashSet<String>,
}

impl StaticAdminList {
    pub fn new(config: &AdminConfig) -> Self {
        let admins = config.user_ids.iter().cloned().collect();
        Self { admins }
    }
}

impl AuthorizationProvider for StaticAdminList {
    fn is_admin(&self, user_id: &UserId) -> bool {
        self.admins.contains(user_id.as_str())
    }
}

const VERIFY_URL: &str = "https://api.line.me/oauth2/v2.1/verify";

/// LINE Login の id_token を検証してユーザー ID に変換する。
/// OAuth のコード交換はフロントエンド側で済んでいる前提。
pub struct LineTokenVerifier {
    http: reqwest::Client,
    config: LineConfig,
}

#[derive(Deserialize)]
struct VerifyResponse {
    sub: String,
}

impl LineTokenVerifier {
    pub fn new(config: LineConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }
}

#[async_trait]
impl IdTokenVerifier for LineTokenVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<UserId> {
        let res = self
            .http
            .post(VERIFY_URL)
            .form(&[
                ("id_token", id_token),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("LINE verify error: {e}")))?;

        if !res.status().is_success() {
            return Err(AppError::UnauthorizedError);
        }

        let body: VerifyResponse = res
            .json()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("LINE verify error: {e}")))?;
        format!("line:{}", body.sub).parse()
    }
}
