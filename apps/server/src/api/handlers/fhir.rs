//! FHIR terminology handlers mounted under `/fhir`
//!
//! Every response goes through [`FhirResponse::render`] so `_format`,
//! `_pretty` and the cache headers are applied uniformly.

use crate::{
    api::{
        content_negotiation::ContentNegotiation,
        extractors::{FhirBody, OptionalFhirBody, ValidatedJson},
        handlers::params::audit_access,
        resource_formatter::{FhirResponse, CACHE_HALF_HOUR, CACHE_NO_CACHE, CACHE_ONE_HOUR},
    },
    models::{Parameters, TraditionalSystem},
    request_context::RequestContext,
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Query, State},
    response::Response,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConditionRequest {
    #[validate(length(min = 1))]
    pub namaste_code: String,
    #[validate(length(min = 1))]
    pub patient_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ValueSetQuery {
    pub filter: Option<String>,
    pub system: Option<String>,
}

pub async fn capability_statement(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
) -> Result<Response> {
    audit_access(&state, "/fhir/metadata", "GET", &ctx);
    FhirResponse::ok(state.fhir.capability_statement())
        .cache_control(CACHE_NO_CACHE)
        .render(&negotiation)
}

pub async fn code_system(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
) -> Result<Response> {
    audit_access(&state, "/fhir/CodeSystem/namaste-codes", "GET", &ctx);
    FhirResponse::ok(state.fhir.code_system().await?)
        .cache_control(CACHE_ONE_HOUR)
        .render(&negotiation)
}

pub async fn concept_map(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
) -> Result<Response> {
    audit_access(&state, "/fhir/ConceptMap/namaste-to-icd11", "GET", &ctx);
    FhirResponse::ok(state.fhir.concept_map().await?)
        .cache_control(CACHE_HALF_HOUR)
        .render(&negotiation)
}

pub async fn value_set(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    Query(q): Query<ValueSetQuery>,
) -> Result<Response> {
    audit_access(&state, "/fhir/ValueSet/namaste", "GET", &ctx);
    let system = match q.system.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(TraditionalSystem::parse(raw).ok_or_else(|| {
            Error::Validation(format!("Unknown traditional medicine system: {}", raw))
        })?),
        None => None,
    };
    FhirResponse::ok(state.fhir.value_set(q.filter.as_deref(), system))
        .cache_control(CACHE_HALF_HOUR)
        .render(&negotiation)
}

pub async fn translate_get(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response> {
    audit_access(&state, "/fhir/ConceptMap/namaste-to-icd11/$translate", "GET", &ctx);
    let params = Parameters::from_query(&pairs);
    let result = state.translation.translate_operation(&params).await?;
    FhirResponse::ok(result.to_json()).render(&negotiation)
}

/// `$translate` via POST: a `Parameters` body when present, else the query string
pub async fn translate_post(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    Query(pairs): Query<Vec<(String, String)>>,
    OptionalFhirBody(body): OptionalFhirBody,
) -> Result<Response> {
    audit_access(&state, "/fhir/ConceptMap/namaste-to-icd11/$translate", "POST", &ctx);
    let params = match body {
        Some(body) => Parameters::from_json(&body).ok_or_else(|| {
            Error::InvalidResource("Expected a Parameters resource".to_string())
        })?,
        None => Parameters::from_query(&pairs),
    };
    let result = state.translation.translate_operation(&params).await?;
    FhirResponse::ok(result.to_json()).render(&negotiation)
}

pub async fn create_condition(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    ValidatedJson(request): ValidatedJson<CreateConditionRequest>,
) -> Result<Response> {
    audit_access(&state, "/fhir/Condition", "POST", &ctx);
    let condition = state
        .fhir
        .condition_with_dual_coding(&request.namaste_code, &request.patient_id)
        .await?;
    let location = condition_location(&condition);
    FhirResponse::created(condition, location).render(&negotiation)
}

/// Accepts a Bundle and answers with an informational OperationOutcome
pub async fn upload_bundle(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    negotiation: ContentNegotiation,
    FhirBody(bundle): FhirBody,
) -> Result<Response> {
    audit_access(&state, "/fhir/Bundle", "POST", &ctx);
    if bundle.get("resourceType").and_then(|v| v.as_str()) != Some("Bundle") {
        return Err(Error::InvalidResource(
            "Failed to process bundle: expected a Bundle resource".to_string(),
        ));
    }
    let entries = bundle
        .get("entry")
        .and_then(|v| v.as_array())
        .map(Vec::len)
        .unwrap_or(0);
    FhirResponse::ok(bundle_outcome(entries)).render(&negotiation)
}

pub(crate) fn condition_location(condition: &JsonValue) -> String {
    format!(
        "/fhir/Condition/{}",
        condition.get("id").and_then(|v| v.as_str()).unwrap_or_default()
    )
}

fn bundle_outcome(entries: usize) -> JsonValue {
    json!({
        "resourceType": "OperationOutcome",
        "id": "bundle-processing-result",
        "issue": [{
            "severity": "information",
            "code": "informational",
            "diagnostics": format!("Bundle processed successfully with {} entries", entries)
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_reports_entry_count() {
        let outcome = bundle_outcome(3);
        assert_eq!(outcome["id"], "bundle-processing-result");
        assert_eq!(outcome["issue"][0]["severity"], "information");
        assert_eq!(
            outcome["issue"][0]["diagnostics"],
            "Bundle processed successfully with 3 entries"
        );
    }

    #[test]
    fn location_uses_condition_id() {
        let condition = json!({ "resourceType": "Condition", "id": "condition-abc" });
        assert_eq!(condition_location(&condition), "/fhir/Condition/condition-abc");
    }

    #[test]
    fn condition_request_rejects_blank_fields() {
        let request = CreateConditionRequest {
            namaste_code: String::new(),
            patient_id: "p1".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
