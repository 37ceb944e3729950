//! FHIR R4 resource synthesis from catalog and registry state.
//!
//! Builds the NAMASTE `CodeSystem`, the NAMASTE → ICD-11 `ConceptMap`, the
//! intensional NAMASTE `ValueSet`, the dual-coding autocomplete expansion,
//! dual-coded `Condition` resources, collection `Bundle`s and the server
//! `CapabilityStatement`. Resources are plain `serde_json` values; wire
//! formatting happens in the API layer.

use crate::{
    config::CodeSystems,
    db::TerminologyStore,
    models::{Catalog, ConceptMapping, Icd11Module, TerminologyCode, TraditionalSystem},
    services::{audit::AuditLogger, mapping::MappingService, translation::TranslationService},
    Result,
};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;

pub const CODE_SYSTEM_ID: &str = "namaste-codes";
pub const CONCEPT_MAP_ID: &str = "namaste-to-icd11";
pub const VALUE_SET_ID: &str = "namaste-valueset";
pub const AUTOCOMPLETE_VALUE_SET_ID: &str = "dual-coding-autocomplete";
pub const AUTOCOMPLETE_VALUE_SET_URL: &str =
    "http://terminology.ayush.gov.in/ValueSet/dual-coding-autocomplete";
pub const CAPABILITY_STATEMENT_ID: &str = "namaste-icd11-terminology-capability";

pub const PUBLISHER: &str = "Ministry of AYUSH, Government of India";
pub const CONDITION_CLINICAL_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-clinical";
pub const CONDITION_VER_STATUS_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/condition-ver-status";
pub const DESIGNATION_USAGE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/designation-usage";
pub const HEALTH_ID_SYSTEM: &str = "https://healthid.ndhm.gov.in";

pub const DEFAULT_CLINICAL_STATUS: &str = "active";
pub const DEFAULT_VERIFICATION_STATUS: &str = "confirmed";

/// Caller-supplied Condition details; unset fields take the defaults
#[derive(Debug, Clone, Default)]
pub struct ConditionOptions {
    pub clinical_status: Option<String>,
    pub verification_status: Option<String>,
    /// `YYYY-MM-DD`; anything else is logged and left out
    pub onset_date: Option<String>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct FhirService {
    terminology: Arc<dyn TerminologyStore>,
    mappings: MappingService,
    translation: TranslationService,
    systems: CodeSystems,
    base_url: String,
    audit: AuditLogger,
}

fn now_instant() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn coding(system: &str, code: &str, display: Option<&str>) -> JsonValue {
    let mut obj = Map::new();
    obj.insert("system".to_string(), json!(system));
    obj.insert("code".to_string(), json!(code));
    if let Some(d) = display {
        obj.insert("display".to_string(), json!(d));
    }
    JsonValue::Object(obj)
}

fn string_property(code: &str, value: &str) -> JsonValue {
    json!({ "code": code, "valueString": value })
}

impl FhirService {
    pub fn new(
        terminology: Arc<dyn TerminologyStore>,
        mappings: MappingService,
        translation: TranslationService,
        systems: CodeSystems,
        base_url: impl Into<String>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            terminology,
            mappings,
            translation,
            systems,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            audit,
        }
    }

    pub fn systems(&self) -> &CodeSystems {
        &self.systems
    }

    /// The complete NAMASTE CodeSystem, one concept per code
    pub async fn code_system(&self) -> Result<JsonValue> {
        let codes = self.terminology.all(Catalog::Namaste).await?;
        let concepts: Vec<JsonValue> = codes.iter().map(namaste_concept).collect();

        self.audit
            .fhir_resource("CodeSystem", "NAMASTE", concepts.len());
        tracing::info!(concepts = concepts.len(), "Generated NAMASTE CodeSystem");

        Ok(json!({
            "resourceType": "CodeSystem",
            "id": CODE_SYSTEM_ID,
            "url": self.systems.namaste,
            "version": self.systems.namaste_version,
            "name": "NAMASTE",
            "title": "National AYUSH Morbidity & Standardized Terminologies Electronic",
            "status": "active",
            "date": now_instant(),
            "publisher": PUBLISHER,
            "description": "Standardized terminology codes for Ayurveda, Siddha, and Unani disorders",
            "content": "complete",
            "count": concepts.len(),
            "property": [
                { "code": "system", "description": "Traditional medicine system", "type": "string" },
                { "code": "category", "description": "Disorder category", "type": "string" },
                { "code": "who-terminology", "description": "WHO Standardised International Terminology code", "type": "string" }
            ],
            "concept": concepts
        }))
    }

    /// NAMASTE → ICD-11 ConceptMap with a TM2 group followed by a Biomedicine group
    pub async fn concept_map(&self) -> Result<JsonValue> {
        let mappings = self.mappings.all().await?;

        let mut tm2 = GroupBuilder::default();
        let mut biomedicine = GroupBuilder::default();
        for m in mappings.iter().filter(|m| m.source_system == self.systems.namaste) {
            if m.target_system == self.systems.tm2 {
                tm2.add(m);
            } else if m.target_system == self.systems.biomedicine {
                biomedicine.add(m);
            }
        }

        let (tm2_count, bio_count) = (tm2.target_count, biomedicine.target_count);
        self.audit
            .fhir_resource("ConceptMap", "NAMASTE_TO_ICD11", tm2_count + bio_count);
        tracing::info!(
            tm2 = tm2_count,
            biomedicine = bio_count,
            "Generated NAMASTE to ICD-11 ConceptMap"
        );

        Ok(json!({
            "resourceType": "ConceptMap",
            "id": CONCEPT_MAP_ID,
            "url": format!("{}/ConceptMap/{}", self.base_url, CONCEPT_MAP_ID),
            "version": "1.0",
            "name": "NAMASTEToICD11",
            "title": "NAMASTE to ICD-11 Concept Mapping",
            "status": "active",
            "date": now_instant(),
            "publisher": PUBLISHER,
            "description": "Mapping between NAMASTE codes and ICD-11 TM2/Biomedicine codes",
            "sourceUri": self.systems.namaste,
            "targetUri": self.systems.biomedicine,
            "group": [
                tm2.build(&self.systems.namaste, &self.systems.tm2),
                biomedicine.build(&self.systems.namaste, &self.systems.biomedicine)
            ]
        }))
    }

    /// Intensional NAMASTE ValueSet; each supplied criterion adds one filter
    pub fn value_set(&self, filter: Option<&str>, system: Option<TraditionalSystem>) -> JsonValue {
        let mut filters = Vec::new();
        if let Some(f) = filter.filter(|f| !f.trim().is_empty()) {
            filters.push(json!({
                "property": "display",
                "op": "regex",
                "value": format!(".*{}.*", f)
            }));
        }
        if let Some(s) = system {
            filters.push(json!({
                "property": "system",
                "op": "=",
                "value": s.as_str()
            }));
        }

        let mut include = Map::new();
        include.insert("system".to_string(), json!(self.systems.namaste));
        if !filters.is_empty() {
            include.insert("filter".to_string(), JsonValue::Array(filters));
        }

        json!({
            "resourceType": "ValueSet",
            "id": VALUE_SET_ID,
            "url": format!("{}/ValueSet/namaste", self.base_url),
            "version": "1.0",
            "name": "NAMASTEValueSet",
            "title": "NAMASTE Value Set",
            "status": "active",
            "date": now_instant(),
            "compose": { "include": [JsonValue::Object(include)] }
        })
    }

    /// Extensional expansion: up to `limit` NAMASTE matches then up to `limit` ICD-11 matches
    pub async fn dual_coding_autocomplete(&self, term: &str, limit: usize) -> Result<JsonValue> {
        let namaste = self
            .terminology
            .find_by_prefix(Catalog::Namaste, term, limit)
            .await?;
        let icd11 = self
            .terminology
            .find_by_prefix(Catalog::Icd11, term, limit)
            .await?;

        let mut contains = Vec::with_capacity(namaste.len() + icd11.len());
        for code in &namaste {
            contains.push(expansion_entry(
                &self.systems.namaste,
                code,
                format!("NAMASTE: {}", code.display),
            ));
        }
        for code in &icd11 {
            let module = code
                .icd11_details()
                .map(|d| d.module)
                .unwrap_or(Icd11Module::Biomedicine);
            let system = match module {
                Icd11Module::Tm2 => &self.systems.tm2,
                Icd11Module::Biomedicine => &self.systems.biomedicine,
            };
            contains.push(expansion_entry(
                system,
                code,
                format!("ICD-11 {}: {}", module.as_str(), code.display),
            ));
        }

        tracing::debug!(term, results = contains.len(), "Generated dual coding autocomplete");

        Ok(json!({
            "resourceType": "ValueSet",
            "id": AUTOCOMPLETE_VALUE_SET_ID,
            "url": AUTOCOMPLETE_VALUE_SET_URL,
            "version": "1.0",
            "name": "DualCodingAutoComplete",
            "title": "Dual Coding AutoComplete ValueSet",
            "status": "active",
            "date": now_instant(),
            "expansion": {
                "timestamp": now_instant(),
                "total": contains.len(),
                "contains": contains
            }
        }))
    }

    /// NAMASTE coding followed by resolvable TM2 then Biomedicine codings.
    ///
    /// Empty when the NAMASTE code is unknown. Mapped ICD-11 codes missing from
    /// the catalog are skipped.
    pub async fn dual_coding(&self, namaste_code: &str) -> Result<Vec<JsonValue>> {
        let Some(namaste) = self
            .terminology
            .find_by_code(Catalog::Namaste, namaste_code)
            .await?
        else {
            return Ok(Vec::new());
        };

        let mut codings = vec![coding(
            &self.systems.namaste,
            &namaste.code,
            Some(&namaste.display),
        )];

        let tm2 = self.translation.namaste_to_tm2(namaste_code).await?;
        self.push_resolved(&mut codings, &tm2, &self.systems.tm2)
            .await?;
        let bio = self.translation.namaste_to_biomedicine(namaste_code).await?;
        self.push_resolved(&mut codings, &bio, &self.systems.biomedicine)
            .await?;

        Ok(codings)
    }

    async fn push_resolved(
        &self,
        codings: &mut Vec<JsonValue>,
        mappings: &[ConceptMapping],
        system: &str,
    ) -> Result<()> {
        for m in mappings {
            match self
                .terminology
                .find_by_code(Catalog::Icd11, &m.target_code)
                .await?
            {
                Some(target) => codings.push(coding(system, &target.code, Some(&target.display))),
                None => tracing::debug!(
                    target_code = %m.target_code,
                    "Skipping mapping to unknown ICD-11 code"
                ),
            }
        }
        Ok(())
    }

    /// Condition with default statuses (`active` / `confirmed`)
    pub async fn condition_with_dual_coding(
        &self,
        namaste_code: &str,
        patient_id: &str,
    ) -> Result<JsonValue> {
        self.condition(namaste_code, patient_id, &ConditionOptions::default())
            .await
    }

    pub async fn condition(
        &self,
        namaste_code: &str,
        patient_id: &str,
        options: &ConditionOptions,
    ) -> Result<JsonValue> {
        let codings = self.dual_coding(namaste_code).await?;
        let clinical = options
            .clinical_status
            .as_deref()
            .unwrap_or(DEFAULT_CLINICAL_STATUS);
        let verification = options
            .verification_status
            .as_deref()
            .unwrap_or(DEFAULT_VERIFICATION_STATUS);

        let mut condition = json!({
            "resourceType": "Condition",
            "id": format!("condition-{}", uuid::Uuid::new_v4().simple()),
            "clinicalStatus": { "coding": [coding(CONDITION_CLINICAL_SYSTEM, clinical, None)] },
            "verificationStatus": { "coding": [coding(CONDITION_VER_STATUS_SYSTEM, verification, None)] },
            "code": { "coding": codings },
            "subject": { "reference": format!("Patient/{}", patient_id) }
        });

        if let Some(onset) = options.onset_date.as_deref() {
            match NaiveDate::parse_from_str(onset, "%Y-%m-%d") {
                Ok(date) => {
                    condition["onsetDateTime"] = json!(date.format("%Y-%m-%d").to_string());
                }
                Err(_) => tracing::warn!(onset, "Invalid onset date format, ignoring"),
            }
        }
        if let Some(note) = options.note.as_deref().filter(|n| !n.trim().is_empty()) {
            condition["note"] = json!([{ "text": note }]);
        }
        condition["recordedDate"] = json!(now_instant());

        Ok(condition)
    }

    /// Collection bundle: a Patient PUT entry followed by one Condition POST entry each
    pub fn collection_bundle(&self, conditions: Vec<JsonValue>, patient_id: &str) -> JsonValue {
        let condition_count = conditions.len();
        let mut entries = Vec::with_capacity(condition_count + 1);
        entries.push(json!({
            "resource": {
                "resourceType": "Patient",
                "id": patient_id,
                "identifier": [{ "system": HEALTH_ID_SYSTEM, "value": patient_id }]
            },
            "request": { "method": "PUT", "url": format!("Patient/{}", patient_id) }
        }));
        for condition in conditions {
            entries.push(json!({
                "resource": condition,
                "request": { "method": "POST", "url": "Condition" }
            }));
        }

        self.audit.fhir_bundle(patient_id, condition_count);

        json!({
            "resourceType": "Bundle",
            "id": format!("namaste-encounter-{}", Utc::now().timestamp_millis()),
            "type": "collection",
            "timestamp": now_instant(),
            "entry": entries
        })
    }

    /// Static description of the terminology endpoints
    pub fn capability_statement(&self) -> JsonValue {
        json!({
            "resourceType": "CapabilityStatement",
            "id": CAPABILITY_STATEMENT_ID,
            "url": format!("{}/metadata", self.base_url),
            "version": "1.0.0",
            "name": "NAMASTEIcd11TerminologyCapability",
            "title": "NAMASTE-ICD11 FHIR Terminology Service Capability Statement",
            "status": "active",
            "date": now_instant(),
            "publisher": PUBLISHER,
            "description": "FHIR Terminology Service supporting NAMASTE and ICD-11 integration",
            "kind": "instance",
            "software": {
                "name": "ayush-terminology",
                "version": env!("CARGO_PKG_VERSION")
            },
            "fhirVersion": "4.0.1",
            "format": ["json", "xml"],
            "rest": [{
                "mode": "server",
                "documentation": "NAMASTE-ICD11 FHIR Terminology Server",
                "resource": [
                    {
                        "type": "CodeSystem",
                        "interaction": [{ "code": "read" }, { "code": "search-type" }]
                    },
                    {
                        "type": "ConceptMap",
                        "interaction": [{ "code": "read" }],
                        "operation": [{
                            "name": "translate",
                            "definition": "http://hl7.org/fhir/OperationDefinition/ConceptMap-translate"
                        }]
                    },
                    {
                        "type": "ValueSet",
                        "interaction": [{ "code": "read" }]
                    }
                ]
            }]
        })
    }
}

fn namaste_concept(code: &TerminologyCode) -> JsonValue {
    let mut concept = Map::new();
    concept.insert("code".to_string(), json!(code.code));
    concept.insert("display".to_string(), json!(code.display));
    if let Some(def) = &code.definition {
        concept.insert("definition".to_string(), json!(def));
    }

    let mut properties = Vec::new();
    if let Some(details) = code.namaste_details() {
        properties.push(string_property("system", details.system.as_str()));
    }
    if let Some(category) = &code.category {
        properties.push(string_property("category", category));
    }
    if let Some(who) = code
        .namaste_details()
        .and_then(|d| d.who_terminology_code.as_deref())
    {
        properties.push(string_property("who-terminology", who));
    }
    if !properties.is_empty() {
        concept.insert("property".to_string(), JsonValue::Array(properties));
    }
    JsonValue::Object(concept)
}

fn expansion_entry(system: &str, code: &TerminologyCode, designation: String) -> JsonValue {
    json!({
        "system": system,
        "code": code.code,
        "display": code.display,
        "designation": [{
            "use": { "system": DESIGNATION_USAGE_SYSTEM, "code": "preferred" },
            "value": designation
        }]
    })
}

/// Source elements of one ConceptMap group, indexed by code in first-seen order
#[derive(Default)]
struct GroupBuilder {
    elements: Vec<(String, Vec<JsonValue>)>,
    index: HashMap<String, usize>,
    target_count: usize,
}

impl GroupBuilder {
    fn add(&mut self, mapping: &ConceptMapping) {
        let slot = match self.index.get(&mapping.source_code) {
            Some(&i) => i,
            None => {
                self.elements
                    .push((mapping.source_code.clone(), Vec::new()));
                let i = self.elements.len() - 1;
                self.index.insert(mapping.source_code.clone(), i);
                i
            }
        };

        let mut target = Map::new();
        target.insert("code".to_string(), json!(mapping.target_code));
        target.insert(
            "equivalence".to_string(),
            json!(mapping.equivalence.fhir_code()),
        );
        if let Some(comment) = &mapping.comment {
            target.insert("comment".to_string(), json!(comment));
        }
        self.elements[slot].1.push(JsonValue::Object(target));
        self.target_count += 1;
    }

    fn build(self, source: &str, target: &str) -> JsonValue {
        let mut group = Map::new();
        group.insert("source".to_string(), json!(source));
        group.insert("target".to_string(), json!(target));
        if !self.elements.is_empty() {
            let elements = self
                .elements
                .into_iter()
                .map(|(code, targets)| json!({ "code": code, "target": targets }))
                .collect();
            group.insert("element".to_string(), JsonValue::Array(elements));
        }
        JsonValue::Object(group)
    }
}
