//! REST handlers for `/api/terminology`
//!
//! Plain JSON over the catalogs, the translation directions and the mapping
//! registry, plus the administrative triggers.

use crate::{
    api::{
        extractors::{ValidatedJson, ValidatedQuery},
        handlers::params::{audit_access, AutocompleteQuery, SearchQuery},
    },
    background,
    models::{
        Catalog, ClassificationTag, ConceptMapping, Equivalence, Icd11Module, NewMapping, Page,
        TerminologyCode, TraditionalSystem,
    },
    request_context::RequestContext,
    services::{TerminologyStats, TranslationDirection},
    state::AppState,
    Error, Result,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMappingRequest {
    #[validate(length(min = 1))]
    pub source_code: String,
    #[validate(length(min = 1))]
    pub source_system: String,
    #[validate(length(min = 1))]
    pub target_code: String,
    #[validate(length(min = 1))]
    pub target_system: String,
    #[validate(length(min = 1))]
    pub equivalence: String,
    pub comment: Option<String>,
    pub confidence_score: Option<f64>,
}

impl CreateMappingRequest {
    fn into_new_mapping(self) -> Result<NewMapping> {
        let equivalence = Equivalence::parse(&self.equivalence).ok_or_else(|| {
            Error::Validation(format!("Unknown equivalence: {}", self.equivalence))
        })?;
        Ok(NewMapping::new(
            self.source_code.trim(),
            self.source_system.trim(),
            self.target_code.trim(),
            self.target_system.trim(),
            equivalence,
        )
        .with_comment(self.comment)
        .with_confidence(self.confidence_score))
    }
}

fn parse_system(raw: &str) -> Result<TraditionalSystem> {
    TraditionalSystem::parse(raw)
        .ok_or_else(|| Error::Validation(format!("Unknown traditional medicine system: {}", raw)))
}

fn parse_module(raw: &str) -> Result<Icd11Module> {
    Icd11Module::parse(raw).ok_or_else(|| Error::Validation(format!("Unknown ICD-11 code type: {}", raw)))
}

// NAMASTE

pub async fn search_namaste(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedQuery(q): ValidatedQuery<SearchQuery>,
) -> Result<Json<Page<TerminologyCode>>> {
    audit_access(&state, "/api/terminology/namaste/search", "GET", &ctx);
    let page = state
        .terminology
        .search(Catalog::Namaste, &q.term, q.page, q.size)
        .await?;
    Ok(Json(page))
}

pub async fn get_namaste_code(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(code): Path<String>,
) -> Result<Json<TerminologyCode>> {
    audit_access(&state, &format!("/api/terminology/namaste/code/{}", code), "GET", &ctx);
    Ok(Json(state.terminology.get(Catalog::Namaste, &code).await?))
}

pub async fn autocomplete_namaste(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedQuery(q): ValidatedQuery<AutocompleteQuery>,
) -> Result<Json<Vec<TerminologyCode>>> {
    audit_access(&state, "/api/terminology/namaste/autocomplete", "GET", &ctx);
    let results = state
        .terminology
        .autocomplete(Catalog::Namaste, &q.term, q.limit)
        .await?;
    Ok(Json(results))
}

pub async fn namaste_by_system(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(system): Path<String>,
) -> Result<Json<Vec<TerminologyCode>>> {
    audit_access(&state, &format!("/api/terminology/namaste/system/{}", system), "GET", &ctx);
    let system = parse_system(&system)?;
    Ok(Json(state.terminology.by_system(system).await?))
}

pub async fn namaste_categories(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(system): Path<String>,
) -> Result<Json<Vec<String>>> {
    audit_access(
        &state,
        &format!("/api/terminology/namaste/categories/{}", system),
        "GET",
        &ctx,
    );
    let tag = ClassificationTag::from(parse_system(&system)?);
    Ok(Json(state.terminology.categories(tag).await?))
}

// ICD-11

pub async fn search_icd11(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedQuery(q): ValidatedQuery<SearchQuery>,
) -> Result<Json<Page<TerminologyCode>>> {
    audit_access(&state, "/api/terminology/icd11/search", "GET", &ctx);
    let page = state
        .terminology
        .search(Catalog::Icd11, &q.term, q.page, q.size)
        .await?;
    Ok(Json(page))
}

pub async fn get_icd11_code(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(code): Path<String>,
) -> Result<Json<TerminologyCode>> {
    audit_access(&state, &format!("/api/terminology/icd11/code/{}", code), "GET", &ctx);
    Ok(Json(state.terminology.get(Catalog::Icd11, &code).await?))
}

pub async fn autocomplete_icd11(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedQuery(q): ValidatedQuery<AutocompleteQuery>,
) -> Result<Json<Vec<TerminologyCode>>> {
    audit_access(&state, "/api/terminology/icd11/autocomplete", "GET", &ctx);
    let results = state
        .terminology
        .autocomplete(Catalog::Icd11, &q.term, q.limit)
        .await?;
    Ok(Json(results))
}

pub async fn icd11_by_type(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(code_type): Path<String>,
) -> Result<Json<Vec<TerminologyCode>>> {
    audit_access(&state, &format!("/api/terminology/icd11/type/{}", code_type), "GET", &ctx);
    let module = parse_module(&code_type)?;
    Ok(Json(state.terminology.by_module(module).await?))
}

// Translation

pub async fn translate(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path((direction, code)): Path<(String, String)>,
) -> Result<Json<Vec<ConceptMapping>>> {
    audit_access(
        &state,
        &format!("/api/terminology/translate/{}/{}", direction, code),
        "GET",
        &ctx,
    );
    let direction = TranslationDirection::from_path(&direction)
        .ok_or_else(|| Error::NotFound(format!("Unknown translation direction: {}", direction)))?;
    Ok(Json(
        state.translation.translate_direction(direction, &code).await?,
    ))
}

// Mappings

pub async fn create_mapping(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    ValidatedJson(request): ValidatedJson<CreateMappingRequest>,
) -> Result<Json<ConceptMapping>> {
    audit_access(&state, "/api/terminology/mapping", "POST", &ctx);
    let mapping = state.mappings.create(request.into_new_mapping()?).await?;
    Ok(Json(mapping))
}

pub async fn mappings_for_code(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path((system, code)): Path<(String, String)>,
) -> Result<Json<Vec<ConceptMapping>>> {
    audit_access(
        &state,
        &format!("/api/terminology/mapping/{}/{}", system, code),
        "GET",
        &ctx,
    );
    Ok(Json(state.mappings.find_for_code(&code, &system).await?))
}

pub async fn delete_mapping(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    audit_access(&state, &format!("/api/terminology/mapping/{}", id), "DELETE", &ctx);
    state.mappings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
) -> Result<Json<TerminologyStats>> {
    audit_access(&state, "/api/terminology/stats", "GET", &ctx);
    let mapping_count = state.mappings.count().await?;
    Ok(Json(state.terminology.stats(mapping_count).await?))
}

// Administration

pub async fn generate_mappings(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
) -> &'static str {
    audit_access(&state, "/api/terminology/admin/generate-mappings", "POST", &ctx);
    let report = state.generator.generate().await;
    tracing::info!(
        status = report.status.as_str(),
        processed = report.processed,
        created = report.created,
        "Mapping generation finished"
    );
    "Automatic mapping generation initiated"
}

pub async fn reload_namaste(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
) -> Result<&'static str> {
    audit_access(&state, "/api/terminology/admin/reload-namaste", "POST", &ctx);
    state
        .loader
        .load_namaste(&state.config.terminology.namaste_csv_path)
        .await?;
    Ok("NAMASTE data reload completed")
}

pub async fn sync_icd11(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
) -> &'static str {
    audit_access(&state, "/api/terminology/admin/sync-icd11", "POST", &ctx);
    background::spawn_icd11_sync(&state);
    "ICD-11 data synchronization initiated"
}
