use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kernel::model::{
    event::Event,
    id::{EventId, UserId},
    roster::{self, NormalizationReport},
};
use shared::error::{AppError, AppResult};
use uuid::Uuid;

/// events テーブルの 1 行。リストは生の文字列のまま持ち、
/// ドメイン型への変換時に必ず正規化を通す。
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub event_id: Uuid,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub timezone: String,
    pub time_label: Option<String>,
    pub location: Option<String>,
    pub capacity: i32,
    pub participants: Vec<String>,
    pub waitlist: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl EventRow {
    /// ドメインの Event へ変換する。
    /// リストはここで修復され、レポートに修復量が残る。
    pub fn into_event(self) -> AppResult<(Event, NormalizationReport)> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            AppError::ConversionEntityError(format!("unknown timezone: {}", self.timezone))
        })?;
        // 過去データには作成者欄にダミー値のまま残っている行がある。
        // リストと同じく読み取りは失敗させず、読める形へ倒す
        let created_by: UserId = self
            .created_by
            .parse()
            .or_else(|_| "system:unknown".parse())?;
        let (roster, report) = roster::normalize(&self.participants, &self.waitlist);
        let event = Event {
            id: EventId::from(self.event_id),
            title: self.title,
            scheduled_at: self.scheduled_at,
            timezone,
            time_label: self.time_label,
            location: self.location,
            capacity: self.capacity,
            roster,
            created_by,
            created_at: self.created_at,
        };
        Ok((event, report))
    }
}
