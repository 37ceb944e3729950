//! API layer - routes, handlers, and middleware

pub mod content_negotiation;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod resource_formatter;
pub mod routes;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .merge(routes::system::system_routes())
        .nest("/fhir", routes::fhir::fhir_routes())
        .nest("/api/terminology", routes::terminology::terminology_routes())
        .with_state(state)
        // Applied in reverse order
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(DefaultBodyLimit::max(max_body_size))
}
