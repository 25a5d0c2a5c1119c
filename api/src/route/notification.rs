use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::notification::{mark_notification_read, show_my_notifications};

pub fn build_notification_routers() -> Router<AppRegistry> {
    let routers = Router::new()
        .route("/", get(show_my_notifications))
        .route("/:notification_id/read", post(mark_notification_read));

    Router::new().nest("/me/notifications", routers)
}
