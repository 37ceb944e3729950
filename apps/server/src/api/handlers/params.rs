//! Shared query parameters and request-context plumbing for handlers

use crate::{request_context::RequestContext, state::AppState};
use axum::Extension;
use serde::Deserialize;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_limit() -> usize {
    DEFAULT_AUTOCOMPLETE_LIMIT
}

/// `?term=&page=&size=` for paged catalog search
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    pub term: String,
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub size: usize,
}

/// `?term=&limit=` for prefix autocomplete
#[derive(Debug, Deserialize, Validate)]
pub struct AutocompleteQuery {
    pub term: String,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: usize,
}

/// Record an API_ACCESS audit event tagged with the request id
pub fn audit_access(
    state: &AppState,
    endpoint: &str,
    method: &str,
    ctx: &Option<Extension<RequestContext>>,
) {
    state.audit.api_access(
        endpoint,
        method,
        ctx.as_ref().map(|Extension(c)| c.request_id.as_str()),
    );
}
