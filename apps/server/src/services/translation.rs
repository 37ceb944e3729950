//! Directional translation over the mapping registry, including `$translate`.
//!
//! Translation never fails for lack of mappings: an empty result is a normal
//! outcome. Results keep registry insertion order.
//!
//! Supported directions are NAMASTE → TM2, TM2 → NAMASTE and
//! NAMASTE → Biomedicine. There is deliberately no Biomedicine → NAMASTE
//! direction; Biomedicine mappings are produced as `relatedto` links and are
//! not exposed for reverse lookup.

use crate::{
    config::CodeSystems,
    db::TerminologyStore,
    models::{Catalog, ConceptMapping, Parameter, ParameterValue, Parameters},
    services::{audit::AuditLogger, mapping::MappingService},
    Error, Result,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationDirection {
    NamasteToTm2,
    Tm2ToNamaste,
    NamasteToBiomedicine,
}

impl TranslationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationDirection::NamasteToTm2 => "NAMASTE_TO_TM2",
            TranslationDirection::Tm2ToNamaste => "TM2_TO_NAMASTE",
            TranslationDirection::NamasteToBiomedicine => "NAMASTE_TO_BIOMEDICINE",
        }
    }

    /// Parse the URL form used by the REST routes, e.g. `namaste-to-tm2`
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "namaste-to-tm2" => Some(TranslationDirection::NamasteToTm2),
            "tm2-to-namaste" => Some(TranslationDirection::Tm2ToNamaste),
            "namaste-to-biomedicine" => Some(TranslationDirection::NamasteToBiomedicine),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct TranslationService {
    mappings: MappingService,
    terminology: Arc<dyn TerminologyStore>,
    systems: CodeSystems,
    audit: AuditLogger,
}

impl TranslationService {
    pub fn new(
        mappings: MappingService,
        terminology: Arc<dyn TerminologyStore>,
        systems: CodeSystems,
        audit: AuditLogger,
    ) -> Self {
        Self {
            mappings,
            terminology,
            systems,
            audit,
        }
    }

    /// Mappings with source (code, source_system) whose target system is `target_system`
    pub async fn translate(
        &self,
        code: &str,
        source_system: &str,
        target_system: &str,
    ) -> Result<Vec<ConceptMapping>> {
        let mut found = self.mappings.find_by_source(code, source_system).await?;
        found.retain(|m| m.target_system == target_system);
        Ok(found)
    }

    /// Mappings with target (code, target_system) whose source system is `source_system`
    pub async fn translate_reverse(
        &self,
        code: &str,
        target_system: &str,
        source_system: &str,
    ) -> Result<Vec<ConceptMapping>> {
        let mut found = self.mappings.find_by_target(code, target_system).await?;
        found.retain(|m| m.source_system == source_system);
        Ok(found)
    }

    pub async fn namaste_to_tm2(&self, code: &str) -> Result<Vec<ConceptMapping>> {
        self.translate_direction(TranslationDirection::NamasteToTm2, code)
            .await
    }

    pub async fn tm2_to_namaste(&self, code: &str) -> Result<Vec<ConceptMapping>> {
        self.translate_direction(TranslationDirection::Tm2ToNamaste, code)
            .await
    }

    pub async fn namaste_to_biomedicine(&self, code: &str) -> Result<Vec<ConceptMapping>> {
        self.translate_direction(TranslationDirection::NamasteToBiomedicine, code)
            .await
    }

    pub async fn translate_direction(
        &self,
        direction: TranslationDirection,
        code: &str,
    ) -> Result<Vec<ConceptMapping>> {
        let s = &self.systems;
        let found = match direction {
            TranslationDirection::NamasteToTm2 => self.translate(code, &s.namaste, &s.tm2).await?,
            TranslationDirection::Tm2ToNamaste => {
                self.translate_reverse(code, &s.tm2, &s.namaste).await?
            }
            TranslationDirection::NamasteToBiomedicine => {
                self.translate(code, &s.namaste, &s.biomedicine).await?
            }
        };

        self.audit.translation(direction.as_str(), code, found.len());
        let outcome = if found.is_empty() { "empty" } else { "hit" };
        crate::metrics::TRANSLATIONS_TOTAL
            .with_label_values(&[direction.as_str(), outcome])
            .inc();
        Ok(found)
    }

    /// FHIR `ConceptMap/$translate`.
    ///
    /// `system` defaults to NAMASTE and `targetsystem` to TM2. A TM2 source
    /// system (or `reverse=true` with a TM2 code) translates back to NAMASTE.
    pub async fn translate_operation(&self, params: &Parameters) -> Result<Parameters> {
        let (system, code) = resolve_system_and_code(params, &self.systems.namaste)?;
        let reverse_requested = params.get_bool("reverse").unwrap_or(false);
        let target_system = params.get_str("targetsystem");

        let reverse = system == self.systems.tm2;
        let matches: Vec<TranslationMatch> = if reverse {
            let source_system = target_system.unwrap_or(&self.systems.namaste);
            let found = if source_system == self.systems.namaste {
                self.tm2_to_namaste(&code).await?
            } else {
                self.translate_reverse(&code, &system, source_system).await?
            };
            self.to_matches(found, true).await?
        } else if reverse_requested {
            // Reverse lookup is only offered from TM2
            Vec::new()
        } else {
            let target = target_system.unwrap_or(&self.systems.tm2);
            let found = if system == self.systems.namaste && target == self.systems.tm2 {
                self.namaste_to_tm2(&code).await?
            } else if system == self.systems.namaste && target == self.systems.biomedicine {
                self.namaste_to_biomedicine(&code).await?
            } else {
                self.translate(&code, &system, target).await?
            };
            self.to_matches(found, false).await?
        };

        Ok(build_translate_parameters(&code, matches))
    }

    async fn to_matches(
        &self,
        found: Vec<ConceptMapping>,
        reverse: bool,
    ) -> Result<Vec<TranslationMatch>> {
        let mut out = Vec::with_capacity(found.len());
        for m in found {
            let (system, code) = if reverse {
                (m.source_system, m.source_code)
            } else {
                (m.target_system, m.target_code)
            };
            let catalog = if system == self.systems.namaste {
                Catalog::Namaste
            } else {
                Catalog::Icd11
            };
            let display = self
                .terminology
                .find_by_code(catalog, &code)
                .await?
                .map(|c| c.display);
            out.push(TranslationMatch {
                system,
                code,
                display,
                equivalence: m.equivalence.fhir_code(),
                comment: m.comment,
            });
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
struct TranslationMatch {
    system: String,
    code: String,
    display: Option<String>,
    equivalence: &'static str,
    comment: Option<String>,
}

/// `code` + `system`, or a `coding`; `system` falls back to `default_system`
fn resolve_system_and_code(params: &Parameters, default_system: &str) -> Result<(String, String)> {
    if let Some(code) = params.get_str("code").filter(|c| !c.trim().is_empty()) {
        let system = params.get_str("system").unwrap_or(default_system);
        return Ok((system.to_string(), code.to_string()));
    }

    if let Some(coding) = params.get_value("coding").and_then(|v| v.as_object()) {
        if let Some(code) = coding.get("code").and_then(|v| v.as_str()) {
            let system = coding
                .get("system")
                .and_then(|v| v.as_str())
                .unwrap_or(default_system);
            return Ok((system.to_string(), code.to_string()));
        }
    }

    Err(Error::Validation(
        "Missing parameter: code (or coding)".to_string(),
    ))
}

fn value_part(name: &str, key: &str, value: JsonValue) -> Parameter {
    Parameter {
        name: name.to_string(),
        value: ParameterValue::Value(HashMap::from([(key.to_string(), value)])),
    }
}

fn build_translate_parameters(code: &str, matches: Vec<TranslationMatch>) -> Parameters {
    let mut out = Parameters::new();
    let result = matches
        .iter()
        .any(|m| m.equivalence != "unmatched" && m.equivalence != "disjoint");
    out.add_value_boolean("result", result);
    if matches.is_empty() {
        out.add_value_string("message", format!("No mappings found for code {}", code));
    }

    for m in matches {
        let mut parts = vec![value_part(
            "equivalence",
            "valueCode",
            JsonValue::String(m.equivalence.to_string()),
        )];

        let mut coding = Map::new();
        coding.insert("system".to_string(), JsonValue::String(m.system));
        coding.insert("code".to_string(), JsonValue::String(m.code));
        if let Some(d) = m.display {
            coding.insert("display".to_string(), JsonValue::String(d));
        }
        parts.push(value_part("concept", "valueCoding", JsonValue::Object(coding)));

        if let Some(comment) = m.comment {
            parts.push(value_part("comment", "valueString", JsonValue::String(comment)));
        }
        out.add_parts("match", parts);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryMappingStore, InMemoryTerminologyStore};
    use crate::models::{Equivalence, Icd11Module, NewMapping, TerminologyCode, TraditionalSystem};
    use serde_json::json;

    struct Fixture {
        svc: TranslationService,
        mappings: MappingService,
        systems: CodeSystems,
    }

    async fn fixture() -> Fixture {
        let systems = CodeSystems::default();
        let terminology = Arc::new(InMemoryTerminologyStore::new());
        terminology
            .save(TerminologyCode::namaste("AY001", "Vataja Jwara", TraditionalSystem::Ayurveda))
            .await
            .unwrap();
        terminology
            .save(TerminologyCode::icd11("TM2-A1", "Vata pattern", Icd11Module::Tm2))
            .await
            .unwrap();
        let mappings = MappingService::new(
            Arc::new(InMemoryMappingStore::new()),
            AuditLogger::new(false),
        );
        let svc = TranslationService::new(
            mappings.clone(),
            terminology,
            systems.clone(),
            AuditLogger::new(false),
        );
        Fixture {
            svc,
            mappings,
            systems,
        }
    }

    #[tokio::test]
    async fn translate_filters_by_target_system_in_insertion_order() {
        let f = fixture().await;
        let s = &f.systems;
        for (target, system) in [("TM2-B", &s.tm2), ("1A00", &s.biomedicine), ("TM2-A1", &s.tm2)] {
            f.mappings
                .create(NewMapping::new("AY001", &s.namaste, target, system, Equivalence::Equivalent))
                .await
                .unwrap();
        }

        let tm2 = f.svc.namaste_to_tm2("AY001").await.unwrap();
        let codes: Vec<_> = tm2.iter().map(|m| m.target_code.as_str()).collect();
        assert_eq!(codes, vec!["TM2-B", "TM2-A1"]);

        let bio = f.svc.namaste_to_biomedicine("AY001").await.unwrap();
        assert_eq!(bio.len(), 1);
    }

    #[tokio::test]
    async fn no_mapping_is_an_empty_result() {
        let f = fixture().await;
        assert!(f.svc.namaste_to_tm2("AY404").await.unwrap().is_empty());
        assert!(f.svc.tm2_to_namaste("TM2-ZZ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reverse_translation_from_tm2() {
        let f = fixture().await;
        let s = &f.systems;
        f.mappings
            .create(NewMapping::new("AY001", &s.namaste, "TM2-A1", &s.tm2, Equivalence::Equivalent))
            .await
            .unwrap();

        let back = f.svc.tm2_to_namaste("TM2-A1").await.unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].source_code, "AY001");
    }

    #[tokio::test]
    async fn translate_operation_builds_match_parts() {
        let f = fixture().await;
        let s = &f.systems;
        f.mappings
            .create(
                NewMapping::new("AY001", &s.namaste, "TM2-A1", &s.tm2, Equivalence::Equivalent)
                    .with_comment(Some("curated".to_string())),
            )
            .await
            .unwrap();

        let params = Parameters::from_query(&[("code".to_string(), "AY001".to_string())]);
        let out = f.svc.translate_operation(&params).await.unwrap().to_json();

        assert_eq!(out["parameter"][0]["valueBoolean"], json!(true));
        let parts = &out["parameter"][1]["part"];
        assert_eq!(parts[0]["valueCode"], json!("equivalent"));
        assert_eq!(parts[1]["valueCoding"]["code"], json!("TM2-A1"));
        assert_eq!(parts[1]["valueCoding"]["display"], json!("Vata pattern"));
        assert_eq!(parts[2]["valueString"], json!("curated"));
    }

    #[tokio::test]
    async fn translate_operation_from_tm2_goes_back_to_namaste() {
        let f = fixture().await;
        let s = &f.systems;
        f.mappings
            .create(NewMapping::new("AY001", &s.namaste, "TM2-A1", &s.tm2, Equivalence::Wider))
            .await
            .unwrap();

        let params = Parameters::from_query(&[
            ("code".to_string(), "TM2-A1".to_string()),
            ("system".to_string(), s.tm2.clone()),
        ]);
        let out = f.svc.translate_operation(&params).await.unwrap().to_json();
        let concept = &out["parameter"][1]["part"][1]["valueCoding"];
        assert_eq!(concept["system"], json!(s.namaste));
        assert_eq!(concept["code"], json!("AY001"));
    }

    #[tokio::test]
    async fn disjoint_only_matches_report_false() {
        let f = fixture().await;
        let s = &f.systems;
        f.mappings
            .create(NewMapping::new("AY001", &s.namaste, "TM2-A1", &s.tm2, Equivalence::Disjoint))
            .await
            .unwrap();

        let params = Parameters::from_query(&[("code".to_string(), "AY001".to_string())]);
        let out = f.svc.translate_operation(&params).await.unwrap().to_json();
        assert_eq!(out["parameter"][0]["valueBoolean"], json!(false));
        assert_eq!(out["parameter"][1]["name"], json!("match"));
    }

    #[tokio::test]
    async fn missing_code_is_a_validation_error() {
        let f = fixture().await;
        assert!(matches!(
            f.svc.translate_operation(&Parameters::new()).await,
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn direction_paths() {
        assert_eq!(
            TranslationDirection::from_path("tm2-to-namaste"),
            Some(TranslationDirection::Tm2ToNamaste)
        );
        assert_eq!(TranslationDirection::from_path("biomedicine-to-namaste"), None);
    }
}
