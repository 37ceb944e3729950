//! Problem-list handlers under `/fhir/ProblemList`

use crate::{
    api::{
        content_negotiation::ContentNegotiation,
        extractors::{FhirBody, ValidatedJson, ValidatedQuery},
        handlers::{fhir::condition_location, params::audit_access, params::AutocompleteQuery},
        resource_formatter::FhirResponse,
    },
    request_context::RequestContext,
    services::{problem_list::CodingSuggestions, ConditionOptions, DualCodingValidation},
    state::AppState,
    Result,
};
use axum::{
    extract::{Query, State},
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DualCodedConditionRequest {
    #[validate(length(min = 1))]
    pub namaste_code: String,
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(regex(path = *CLINICAL_STATUS))]
    pub clinical_status: Option<String>,
    #[validate(regex(path = *VERIFICATION_STATUS))]
    pub verification_status: Option<String>,
    #[validate(regex(path = *ONSET_DATE))]
    pub onset_date: Option<String>,
    pub notes: Option<String>,
}

lazy_static::lazy_static! {
    static ref CLINICAL_STATUS: regex::Regex =
        regex::Regex::new("^(active|inactive|resolved)$").expect("static regex");
    static ref VERIFICATION_STATUS: regex::Regex = regex::Regex::new(
        "^(provisional|differential|confirmed|refuted|entered-in-error|unknown)$"
    )
    .expect("static regex");
    static ref ONSET_DATE: regex::Regex =
        regex::Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex");
}

impl DualCodedConditionRequest {
    fn options(&self) -> ConditionOptions {
        ConditionOptions {
            clinical_status: self.clinical_status.clone(),
            verification_status: self.verification_status.clone(),
            onset_date: self.onset_date.clone(),
            note: self.notes.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PatientQuery {
    pub patient: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodingRequest {
    #[validate(length(min = 1))]
    pub namaste_code: String,
    #[validate(length(min = 1))]
    pub icd11_code: String,
    #[serde(default)]
    pub system: String,
}

pub async fn create_condition(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    ValidatedJson(request): ValidatedJson<DualCodedConditionRequest>,
) -> Result<Response> {
    audit_access(&state, "/fhir/ProblemList/Condition", "POST", &ctx);
    let condition = state
        .problem_list
        .create_dual_coded_condition(&request.namaste_code, &request.patient_id, &request.options())
        .await?;
    let location = condition_location(&condition);
    FhirResponse::created(condition, location).render(&negotiation)
}

pub async fn process_bundle(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    FhirBody(bundle): FhirBody,
) -> Result<Response> {
    audit_access(&state, "/fhir/ProblemList/Bundle", "POST", &ctx);
    let processed = state.problem_list.process_bundle(&bundle).await?;
    FhirResponse::ok(processed).render(&negotiation)
}

pub async fn dual_coding_autocomplete(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    ValidatedQuery(q): ValidatedQuery<AutocompleteQuery>,
) -> Result<Response> {
    audit_access(
        &state,
        "/fhir/ProblemList/ValueSet/dual-coding-autocomplete",
        "GET",
        &ctx,
    );
    let value_set = state
        .problem_list
        .dual_coding_autocomplete(&q.term, q.limit)
        .await?;
    FhirResponse::ok(value_set).render(&negotiation)
}

pub async fn patient_problem_list(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    Query(q): Query<PatientQuery>,
) -> Result<Response> {
    audit_access(&state, "/fhir/ProblemList/Condition", "GET", &ctx);
    FhirResponse::ok(state.problem_list.patient_problem_list(&q.patient)).render(&negotiation)
}

pub async fn coding_suggestions(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedQuery(q): ValidatedQuery<AutocompleteQuery>,
) -> Result<Json<CodingSuggestions>> {
    audit_access(&state, "/fhir/ProblemList/coding-suggestions", "GET", &ctx);
    Ok(Json(
        state.problem_list.coding_suggestions(&q.term, q.limit).await?,
    ))
}

pub async fn validate_coding(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedJson(request): ValidatedJson<ValidateCodingRequest>,
) -> Result<Json<DualCodingValidation>> {
    audit_access(&state, "/fhir/ProblemList/validate-coding", "POST", &ctx);
    let validation = state
        .problem_list
        .validate_dual_coding(&request.namaste_code, &request.icd11_code, &request.system)
        .await?;
    Ok(Json(validation))
}
