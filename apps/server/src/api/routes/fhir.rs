//! FHIR terminology routes, nested under `/fhir`
//!
//! Paths are case-sensitive and percent-decoded by axum's `Path` extractor.

use crate::api::handlers::fhir;
use crate::api::routes::problem_list::problem_list_routes;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn fhir_routes() -> Router<AppState> {
    Router::new()
        .route("/metadata", get(fhir::capability_statement))
        .route("/CodeSystem/namaste-codes", get(fhir::code_system))
        .route("/ConceptMap/namaste-to-icd11", get(fhir::concept_map))
        .route(
            "/ConceptMap/namaste-to-icd11/$translate",
            get(fhir::translate_get).post(fhir::translate_post),
        )
        .route("/ValueSet/namaste", get(fhir::value_set))
        .route("/Condition", post(fhir::create_condition))
        .route("/Bundle", post(fhir::upload_bundle))
        .nest("/ProblemList", problem_list_routes())
}
