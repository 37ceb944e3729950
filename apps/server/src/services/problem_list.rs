//! Problem-list workflows: dual-coded Condition creation, bundle re-coding,
//! coding suggestions and dual-coding validation.

use crate::{
    config::CodeSystems,
    db::TerminologyStore,
    models::{Catalog, ConceptMapping, TerminologyCode},
    services::{
        audit::AuditLogger,
        fhir::{ConditionOptions, FhirService},
        translation::TranslationService,
        validation::{DualCodingValidation, DualCodingValidator},
    },
    Error, Result,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamasteSuggestion {
    pub code: String,
    pub display: String,
    pub definition: Option<String>,
    pub system: Option<String>,
    pub category: Option<String>,
    pub who_terminology_code: Option<String>,
    pub icd11_tm2_code: Option<String>,
    pub icd11_biomedicine_code: Option<String>,
}

impl From<&TerminologyCode> for NamasteSuggestion {
    fn from(code: &TerminologyCode) -> Self {
        let details = code.namaste_details();
        Self {
            code: code.code.clone(),
            display: code.display.clone(),
            definition: code.definition.clone(),
            system: details.map(|d| d.system.as_str().to_string()),
            category: code.category.clone(),
            who_terminology_code: details.and_then(|d| d.who_terminology_code.clone()),
            icd11_tm2_code: details.and_then(|d| d.icd11_tm2_code.clone()),
            icd11_biomedicine_code: details.and_then(|d| d.icd11_biomedicine_code.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Icd11Suggestion {
    pub code: String,
    pub title: String,
    pub definition: Option<String>,
    pub code_type: Option<String>,
    pub parent: Option<String>,
    pub chapter: Option<String>,
}

impl From<&TerminologyCode> for Icd11Suggestion {
    fn from(code: &TerminologyCode) -> Self {
        Self {
            code: code.code.clone(),
            title: code.display.clone(),
            definition: code.definition.clone(),
            code_type: code.icd11_details().map(|d| d.module.as_str().to_string()),
            parent: code.parent.clone(),
            chapter: code.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSuggestion {
    pub namaste: NamasteSuggestion,
    pub tm2_mappings: Vec<ConceptMapping>,
    pub biomedicine_mappings: Vec<ConceptMapping>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodingSuggestions {
    pub namaste: Vec<NamasteSuggestion>,
    pub icd11: Vec<Icd11Suggestion>,
    pub mappings: Vec<MappingSuggestion>,
}

#[derive(Clone)]
pub struct ProblemListService {
    terminology: Arc<dyn TerminologyStore>,
    translation: TranslationService,
    fhir: FhirService,
    validator: DualCodingValidator,
    systems: CodeSystems,
    audit: AuditLogger,
}

impl ProblemListService {
    pub fn new(
        terminology: Arc<dyn TerminologyStore>,
        translation: TranslationService,
        fhir: FhirService,
        validator: DualCodingValidator,
        systems: CodeSystems,
        audit: AuditLogger,
    ) -> Self {
        Self {
            terminology,
            translation,
            fhir,
            validator,
            systems,
            audit,
        }
    }

    /// A Condition whose code carries the NAMASTE coding plus every mapped ICD-11 coding
    #[tracing::instrument(skip(self, options))]
    pub async fn create_dual_coded_condition(
        &self,
        namaste_code: &str,
        patient_id: &str,
        options: &ConditionOptions,
    ) -> Result<JsonValue> {
        tracing::info!("Creating dual-coded condition");
        let condition = self.fhir.condition(namaste_code, patient_id, options).await?;
        self.audit.fhir_bundle(patient_id, 1);
        Ok(condition)
    }

    pub async fn dual_coding_autocomplete(&self, term: &str, limit: usize) -> Result<JsonValue> {
        self.fhir.dual_coding_autocomplete(term, limit).await
    }

    /// Re-code Conditions that carry at most one coding; other entries pass through
    pub async fn process_bundle(&self, bundle: &JsonValue) -> Result<JsonValue> {
        if bundle.get("resourceType").and_then(|v| v.as_str()) != Some("Bundle") {
            return Err(Error::InvalidResource(
                "Expected a Bundle resource".to_string(),
            ));
        }

        let entries = bundle
            .get("entry")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        tracing::info!(entries = entries.len(), "Processing dual-coded bundle");

        let mut processed = Vec::with_capacity(entries.len());
        for entry in entries {
            let is_condition = entry
                .get("resource")
                .and_then(|r| r.get("resourceType"))
                .and_then(|v| v.as_str())
                == Some("Condition");
            if !is_condition {
                processed.push(entry);
                continue;
            }
            let condition = entry.get("resource").cloned().unwrap_or(JsonValue::Null);
            processed.push(json!({ "resource": self.recode_condition(condition).await? }));
        }

        let id = bundle.get("id").and_then(|v| v.as_str()).unwrap_or("");
        self.audit.fhir_bundle("bundle", processed.len());

        Ok(json!({
            "resourceType": "Bundle",
            "id": format!("processed-{}", id),
            "type": "collection",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "entry": processed
        }))
    }

    async fn recode_condition(&self, mut condition: JsonValue) -> Result<JsonValue> {
        let codings = condition
            .pointer("/code/coding")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if codings.len() > 1 {
            return Ok(condition);
        }

        let namaste_code = codings.iter().find_map(|c| {
            (c.get("system").and_then(|v| v.as_str()) == Some(self.systems.namaste.as_str()))
                .then(|| c.get("code").and_then(|v| v.as_str()))
                .flatten()
                .map(str::to_string)
        });

        if let Some(code) = namaste_code {
            let dual = self.fhir.dual_coding(&code).await?;
            condition["code"] = json!({ "coding": dual });
        }
        Ok(condition)
    }

    /// Always an empty collection; Conditions are not persisted
    pub fn patient_problem_list(&self, patient_id: &str) -> JsonValue {
        tracing::info!(patient_id, "Retrieving problem list");
        json!({
            "resourceType": "Bundle",
            "id": format!("problem-list-{}", patient_id),
            "type": "collection",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "total": 0
        })
    }

    /// Prefix matches from both catalogs plus the mappings of each NAMASTE match
    pub async fn coding_suggestions(&self, term: &str, limit: usize) -> Result<CodingSuggestions> {
        let namaste = self
            .terminology
            .find_by_prefix(Catalog::Namaste, term, limit)
            .await?;
        let icd11 = self
            .terminology
            .find_by_prefix(Catalog::Icd11, term, limit)
            .await?;

        let mut mappings = Vec::new();
        for code in &namaste {
            let tm2_mappings = self.translation.namaste_to_tm2(&code.code).await?;
            let biomedicine_mappings = self.translation.namaste_to_biomedicine(&code.code).await?;
            if tm2_mappings.is_empty() && biomedicine_mappings.is_empty() {
                continue;
            }
            mappings.push(MappingSuggestion {
                namaste: code.into(),
                tm2_mappings,
                biomedicine_mappings,
            });
        }

        Ok(CodingSuggestions {
            namaste: namaste.iter().map(NamasteSuggestion::from).collect(),
            icd11: icd11.iter().map(Icd11Suggestion::from).collect(),
            mappings,
        })
    }

    pub async fn validate_dual_coding(
        &self,
        namaste_code: &str,
        icd11_code: &str,
        system_hint: &str,
    ) -> Result<DualCodingValidation> {
        self.validator
            .validate(namaste_code, icd11_code, system_hint)
            .await
    }
}
