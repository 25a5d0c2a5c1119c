use crate::{
    extractor::AuthorizedUser,
    model::event::{CreateEventRequest, EventResponse, MonthlyEventsResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{event::event::DeleteEvent, id::EventId};
use registry::AppRegistry;
use serde_json::json;
use shared::error::{AppError, AppResult};

fn ensure_admin(registry: &AppRegistry, user: &AuthorizedUser) -> AppResult<()> {
    if registry.authorization_provider().is_admin(&user.user_id) {
        Ok(())
    } else {
        Err(AppError::ForbiddenOperation)
    }
}

pub async fn register_event(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    ensure_admin(&registry, &user)?;
    req.validate(&())?;

    let event_id = registry
        .event_repository()
        .create(req.into_command(user.id())?)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": event_id }))))
}

pub async fn delete_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    ensure_admin(&registry, &user)?;

    registry
        .event_repository()
        .delete(DeleteEvent::new(event_id, user.id()))
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_event(
    user: AuthorizedUser,
    Path(event_id): Path<EventId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<EventResponse>> {
    registry
        .event_repository()
        .find_by_id(event_id)
        .await
        .and_then(|event| match event {
            Some(event) => Ok(Json(EventResponse::new(event, &user.user_id))),
            None => Err(AppError::EntityNotFound(format!(
                "イベント（{event_id}）が見つかりませんでした。"
            ))),
        })
}

pub async fn show_monthly_events(
    user: AuthorizedUser,
    Path((year, month)): Path<(i32, u32)>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<MonthlyEventsResponse>> {
    let events = registry.event_repository().find_in_month(year, month).await?;
    Ok(Json(MonthlyEventsResponse {
        year,
        month,
        items: events
            .into_iter()
            .map(|event| EventResponse::new(event, &user.user_id))
            .collect(),
    }))
}
