//! Problem-list routes, nested under `/fhir/ProblemList`

use crate::api::handlers::problem_list;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn problem_list_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/Condition",
            post(problem_list::create_condition).get(problem_list::patient_problem_list),
        )
        .route("/Bundle", post(problem_list::process_bundle))
        .route(
            "/ValueSet/dual-coding-autocomplete",
            get(problem_list::dual_coding_autocomplete),
        )
        .route("/coding-suggestions", get(problem_list::coding_suggestions))
        .route("/validate-coding", post(problem_list::validate_coding))
}
