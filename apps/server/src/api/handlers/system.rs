//! Unauthenticated operational endpoints: liveness, server info and metrics

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Value as JsonValue};

pub const SERVICE_NAME: &str = "ayush-terminology";

pub async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

pub async fn server_info(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "server": "AYUSH Terminology Server",
        "version": env!("CARGO_PKG_VERSION"),
        "fhirVersion": "4.0.1",
        "namasteSystem": state.systems.namaste,
        "icd11Sync": state.icd11.is_enabled(),
        "status": "running"
    }))
}

/// Prometheus text exposition of the default registry
pub async fn metrics() -> Response {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}
