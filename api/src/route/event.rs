use axum::{
    routing::{delete, get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    event::{delete_event, register_event, show_event, show_monthly_events},
    roster::{cancel_event, join_event, kick_user, normalize_all_events, normalize_event},
};

pub fn build_event_routers() -> Router<AppRegistry> {
    let events_routers = Router::new()
        .route("/", post(register_event))
        .route("/normalize", post(normalize_all_events))
        .route("/:event_id", get(show_event))
        .route("/:event_id", delete(delete_event))
        .route("/:year/:month", get(show_monthly_events))
        .route("/:event_id/join", post(join_event))
        .route("/:event_id/cancel", post(cancel_event))
        .route("/:event_id/kick", post(kick_user))
        .route("/:event_id/normalize", post(normalize_event));

    Router::new().nest("/events", events_routers)
}
