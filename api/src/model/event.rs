use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use garde::Validate;
use kernel::model::{
    event::{event::CreateEvent, Event, JoinedEvent, RosterChange},
    id::{EventId, UserId},
    roster::Placement,
};
use kernel::repository::event::EventNormalization;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(skip)]
    pub scheduled_at: DateTime<Utc>,
    /// IANA タイムゾーン名。未指定なら Asia/Tokyo
    #[garde(skip)]
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[garde(skip)]
    pub time_label: Option<String>,
    #[garde(skip)]
    pub location: Option<String>,
    #[garde(range(min = 0))]
    pub capacity: i32,
}

fn default_timezone() -> String {
    "Asia/Tokyo".into()
}

impl CreateEventRequest {
    pub fn into_command(self, created_by: UserId) -> AppResult<CreateEvent> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            AppError::UnprocessableEntity(format!("unknown timezone: {}", self.timezone))
        })?;
        Ok(CreateEvent::new(
            self.title,
            self.scheduled_at,
            timezone,
            self.time_label,
            self.location,
            self.capacity,
            created_by,
        ))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: EventId,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub timezone: String,
    pub when_label: String,
    pub time_label: Option<String>,
    pub location: Option<String>,
    pub capacity: i32,
    pub participants: Vec<String>,
    pub waitlist: Vec<String>,
    /// リクエストしたユーザー自身が参加確定しているか
    pub joined: bool,
    /// リクエストしたユーザー自身がキャンセル待ちか
    pub waitlisted: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: Event, viewer: &UserId) -> Self {
        let placement = event.roster.placement_of(viewer);
        let when_label = event.when_label();
        Self {
            id: event.id,
            title: event.title,
            scheduled_at: event.scheduled_at,
            timezone: event.timezone.name().to_string(),
            when_label,
            time_label: event.time_label,
            location: event.location,
            capacity: event.capacity,
            participants: event
                .roster
                .participants
                .iter()
                .map(|u| u.to_string())
                .collect(),
            waitlist: event.roster.waitlist.iter().map(|u| u.to_string()).collect(),
            joined: placement == Some(Placement::Participant),
            waitlisted: placement == Some(Placement::Waitlisted),
            created_by: event.created_by,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEventsResponse {
    pub year: i32,
    pub month: u32,
    pub items: Vec<EventResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// "participant" か "waitlist"
    pub placement: PlacementName,
    pub already_joined: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementName {
    Participant,
    Waitlist,
}

impl From<&JoinedEvent> for JoinResponse {
    fn from(value: &JoinedEvent) -> Self {
        Self {
            placement: match value.placement {
                Placement::Participant => PlacementName::Participant,
                Placement::Waitlisted => PlacementName::Waitlist,
            },
            already_joined: value.already_joined,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub was_participant: bool,
    pub promoted_user: Option<String>,
}

impl From<&RosterChange> for CancelResponse {
    fn from(value: &RosterChange) -> Self {
        Self {
            was_participant: value.was_participant,
            promoted_user: value.promoted.as_ref().map(|u| u.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForceCancelRequest {
    #[garde(length(min = 1))]
    pub user_id: String,
    /// false にするとキャンセル待ちからの除外として扱い、繰り上げない
    #[garde(skip)]
    #[serde(default = "default_true")]
    pub promote: bool,
    #[garde(skip)]
    #[serde(default = "default_true")]
    pub notify: bool,
    #[garde(skip)]
    pub reason: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeSweepResponse {
    /// 書き戻しが発生したイベント数
    pub touched: usize,
    pub report: Vec<EventNormalization>,
}

impl From<Vec<EventNormalization>> for NormalizeSweepResponse {
    fn from(report: Vec<EventNormalization>) -> Self {
        let touched = report.iter().filter(|r| r.repaired).count();
        Self { touched, report }
    }
}
