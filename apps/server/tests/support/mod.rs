pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use ayush_terminology::{api::create_router, AppState, Config};
use serde_json::Value;
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Empty catalogs and registry
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let mut config = Config::default();
        config.terminology.load_on_startup = false;
        config.icd11.enabled = false;
        config.logging.audit_enabled = false;
        configure(&mut config);

        let state = AppState::new(config).context("initialize AppState")?;
        let router = create_router(state.clone());
        Ok(Self { router, state })
    }

    /// Fixture catalogs loaded and mappings generated from their cross-references
    pub async fn seeded() -> anyhow::Result<Self> {
        let app = Self::new().await?;
        seed_catalogs(&app.state).await?;
        app.state.generator.generate().await;
        Ok(app)
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request_with_extra_headers(method, path_and_query, body, &[])
            .await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/fhir+json")
            .header("content-type", "application/fhir+json")
            .body(match body {
                Some(bytes) => Body::from(bytes),
                None => Body::empty(),
            })
            .context("build request")?;

        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }

    pub async fn get_json(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let (status, headers, body) = self.request(Method::GET, path_and_query, None).await?;
        Ok((status, headers, parse_json(&body)?))
    }

    pub async fn post_json(
        &self,
        path_and_query: &str,
        payload: &Value,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
        let (status, headers, body) = self
            .request(Method::POST, path_and_query, Some(to_json_body(payload)?))
            .await?;
        Ok((status, headers, parse_json(&body)?))
    }
}

pub fn to_json_body(value: &Value) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

pub fn parse_json(body: &Bytes) -> anyhow::Result<Value> {
    serde_json::from_slice(body).with_context(|| {
        format!("response body is JSON: {}", String::from_utf8_lossy(body))
    })
}
