use axum::{
    routing::{delete, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::auth::{login, logout};

pub fn build_auth_routers() -> Router<AppRegistry> {
    let routers = Router::new()
        .route("/sessions", post(login))
        .route("/sessions", delete(logout));

    Router::new().nest("/auth", routers)
}
