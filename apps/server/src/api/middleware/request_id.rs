//! Request id middleware: root span, request context and id response headers

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::request_context::{ApiSurface, RequestContext};

/// Root span for each HTTP request.
///
/// A fresh server id is always assigned and returned as `X-Request-Id`. The
/// trace id goes out as `X-Trace-Id`; a client id that differs from the server
/// id is echoed back as `X-Correlation-Id`.
#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        otel.kind = "server",
        http.response.status_code = tracing::field::Empty,
        api.surface = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let span = Span::current();
    let start = Instant::now();

    let context = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        correlation_id: req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        surface: ApiSurface::from_path(req.uri().path()),
    };
    span.record("request_id", context.request_id.as_str());
    span.record("api.surface", context.surface.as_str());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!(%method, %path, "Incoming request");

    req.extensions_mut().insert(context.clone());
    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    span.record("http.response.status_code", status);
    tracing::info!(
        %method,
        %path,
        status,
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    let trace_id = span.context().span().span_context().trace_id().to_string();
    let correlation = context
        .correlation_id
        .as_deref()
        .filter(|id| *id != context.request_id);

    let headers = response.headers_mut();
    for (name, value) in [
        ("x-request-id", Some(context.request_id.as_str())),
        ("x-trace-id", Some(trace_id.as_str())),
        ("x-correlation-id", correlation),
    ] {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }

    response
}
