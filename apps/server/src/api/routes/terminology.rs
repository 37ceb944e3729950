//! REST routes, nested under `/api/terminology`

use crate::api::handlers::terminology as t;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn terminology_routes() -> Router<AppState> {
    Router::new()
        .route("/namaste/search", get(t::search_namaste))
        .route("/namaste/code/:code", get(t::get_namaste_code))
        .route("/namaste/autocomplete", get(t::autocomplete_namaste))
        .route("/namaste/system/:system", get(t::namaste_by_system))
        .route("/namaste/categories/:system", get(t::namaste_categories))
        .route("/icd11/search", get(t::search_icd11))
        .route("/icd11/code/:code", get(t::get_icd11_code))
        .route("/icd11/autocomplete", get(t::autocomplete_icd11))
        .route("/icd11/type/:type", get(t::icd11_by_type))
        .route("/translate/:direction/:code", get(t::translate))
        .route("/mapping", post(t::create_mapping))
        .route("/mapping/:id", delete(t::delete_mapping))
        .route("/mapping/:system/:code", get(t::mappings_for_code))
        .route("/stats", get(t::stats))
        .route("/admin/generate-mappings", post(t::generate_mappings))
        .route("/admin/reload-namaste", post(t::reload_namaste))
        .route("/admin/sync-icd11", post(t::sync_icd11))
}
