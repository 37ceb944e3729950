use crate::api::handlers::system;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::server_info))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
}
