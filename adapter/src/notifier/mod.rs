use async_trait::async_trait;
use kernel::notifier::{Notifier, PromotionNotice};
use serde_json::json;
use shared::{config::LineConfig, error::AppResult};
use std::time::Duration;

const PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

/// LINE Messaging API への push 送信。
/// 失敗しても呼び出し元のロスター操作は巻き戻さない前提のベストエフォート。
pub struct LineNotifier {
    http: reqwest::Client,
    config: LineConfig,
}

impl LineNotifier {
    pub fn new(config: LineConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    async fn push(&self, to: &str, messages: serde_json::Value) -> AppResult<bool> {
        let res = self
            .http
            .post(PUSH_URL)
            .bearer_auth(&self.config.channel_access_token)
            .json(&json!({ "to": to, "messages": messages }))
            .send()
            .await
            .map_err(|e| {
                shared::error::AppError::ExternalServiceError(format!("LINE push error: {e}"))
            })?;
        Ok(res.status().is_success())
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn notify_promoted(&self, notice: &PromotionNotice) -> AppResult<()> {
        if self.config.channel_access_token.is_empty() {
            tracing::warn!("LINE_CHANNEL_ACCESS_TOKEN が未設定のため push をスキップします");
            return Ok(());
        }
        // 宛先は "line:" を外した生の LINE ユーザー ID
        let Some(to) = notice.user_id.line_user_id() else {
            tracing::warn!(user_id = %notice.user_id, "LINE 以外のユーザーには push できません");
            return Ok(());
        };

        let ok = self.push(to, promotion_flex(notice)).await?;
        if !ok {
            // Flex が弾かれた場合はプレーンテキストで再送する
            tracing::warn!(user_id = %notice.user_id, "Flex の push に失敗したためテキストで再送します");
            let fallback = json!([{
                "type": "text",
                "text": format!(
                    "キャンセル待ち繰り上げ\n「{}」\n{}\n{}",
                    notice.title, notice.when_label, notice.event_url
                ),
            }]);
            if !self.push(to, fallback).await? {
                return Err(shared::error::AppError::ExternalServiceError(
                    "LINE push failed".into(),
                ));
            }
        }
        Ok(())
    }
}

fn promotion_flex(notice: &PromotionNotice) -> serde_json::Value {
    json!([{
        "type": "flex",
        "altText": format!("キャンセル待ち繰り上げ: {}", notice.title),
        "contents": {
            "type": "bubble",
            "size": "mega",
            "body": {
                "type": "box",
                "layout": "vertical",
                "spacing": "md",
                "contents": [
                    { "type": "text", "text": "キャンセル待ち繰り上げ", "weight": "bold", "size": "xl" },
                    {
                        "type": "box",
                        "layout": "baseline",
                        "spacing": "sm",
                        "contents": [
                            { "type": "text", "text": "開催日時", "size": "sm", "color": "#9CA3AF", "flex": 2 },
                            { "type": "text", "text": notice.when_label, "size": "sm", "color": "#111827", "wrap": true, "flex": 5 },
                        ],
                    },
                    {
                        "type": "text",
                        "text": "キャンセルが出たため、キャンセル待ちを参加に繰り上げました。ご参加フォームからイベント内容をご確認ください。",
                        "size": "sm",
                        "color": "#374151",
                        "wrap": true,
                    },
                ],
            },
            "footer": {
                "type": "box",
                "layout": "vertical",
                "spacing": "sm",
                "contents": [{
                    "type": "button",
                    "style": "link",
                    "height": "sm",
                    "action": { "type": "uri", "label": "イベント内容の確認", "uri": notice.event_url },
                }],
            },
        },
    }])
}
