use crate::model::{
    id::{EventId, UserId},
    roster::Roster,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub mod event;

/// 練習会イベント。参加者・キャンセル待ちの 2 リストを内包する。
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    /// 表示に使うタイムゾーン（開催地基準）
    pub timezone: Tz,
    /// 「19:00〜21:30」のような自由記述の時間表記（任意）
    pub time_label: Option<String>,
    pub location: Option<String>,
    pub capacity: i32,
    pub roster: Roster,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// 通知や一覧に使う開催日時の表示文字列。
    /// 開始時刻をイベントのタイムゾーンで整形し、時間表記があれば続ける。
    pub fn when_label(&self) -> String {
        let local = self.scheduled_at.with_timezone(&self.timezone);
        let base = local.format("%Y/%m/%d %H:%M").to_string();
        match &self.time_label {
            Some(label) if !label.is_empty() => format!("{base} {label}"),
            _ => base,
        }
    }
}

/// join でユーザーが入った先と、その時点のリスト
#[derive(Debug, Clone)]
pub struct JoinedEvent {
    pub event: Event,
    pub placement: crate::model::roster::Placement,
    pub already_joined: bool,
}

/// cancel / 強制キャンセル後のロスター変化。
/// 繰り上げ通知に必要な表示情報も一緒に返す。
#[derive(Debug, Clone)]
pub struct RosterChange {
    pub event_id: EventId,
    pub title: String,
    pub when_label: String,
    pub was_participant: bool,
    pub promoted: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_at(time_label: Option<&str>) -> Event {
        Event {
            id: EventId::new(),
            title: "火曜練習会".into(),
            scheduled_at: Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
            timezone: chrono_tz::Asia::Tokyo,
            time_label: time_label.map(Into::into),
            location: None,
            capacity: 10,
            roster: Roster::default(),
            created_by: "line:Uadmin".parse().unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn when_label_renders_in_event_timezone() {
        // UTC 10:00 は東京の 19:00
        assert_eq!(event_at(None).when_label(), "2025/04/01 19:00");
    }

    #[test]
    fn when_label_appends_free_text_time() {
        assert_eq!(
            event_at(Some("18:50〜21:30")).when_label(),
            "2025/04/01 19:00 18:50〜21:30"
        );
    }
}
