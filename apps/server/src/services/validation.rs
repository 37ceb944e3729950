use crate::{
    config::CodeSystems,
    db::TerminologyStore,
    models::{Catalog, ConceptMapping},
    services::mapping::MappingService,
    Result,
};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a dual-coding check. Problems are collected, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DualCodingValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<ConceptMapping>,
}

/// Checks that a NAMASTE code and an ICD-11 code are linked by a mapping.
///
/// Validity is existential: any mapping between the pair counts, whatever its
/// equivalence, so a `DISJOINT` mapping still validates.
#[derive(Clone)]
pub struct DualCodingValidator {
    terminology: Arc<dyn TerminologyStore>,
    mappings: MappingService,
    systems: CodeSystems,
}

impl DualCodingValidator {
    pub fn new(
        terminology: Arc<dyn TerminologyStore>,
        mappings: MappingService,
        systems: CodeSystems,
    ) -> Self {
        Self {
            terminology,
            mappings,
            systems,
        }
    }

    /// `system_hint` is `"TM2"` for the TM2 module; any other value means Biomedicine
    pub async fn validate(
        &self,
        namaste_code: &str,
        icd11_code: &str,
        system_hint: &str,
    ) -> Result<DualCodingValidation> {
        tracing::debug!(namaste_code, icd11_code, system_hint, "Validating dual coding");
        let mut errors = Vec::new();

        let namaste = self
            .terminology
            .find_by_code(Catalog::Namaste, namaste_code)
            .await?;
        if namaste.is_none() {
            errors.push(format!("NAMASTE code not found: {}", namaste_code));
        }

        let icd11 = self
            .terminology
            .find_by_code(Catalog::Icd11, icd11_code)
            .await?;
        if icd11.is_none() {
            errors.push(format!("ICD-11 code not found: {}", icd11_code));
        }

        let mut mapping = None;
        if namaste.is_some() && icd11.is_some() {
            let target_system = self.systems.resolve_hint(system_hint);
            mapping = self
                .mappings
                .find_for_code(namaste_code, &self.systems.namaste)
                .await?
                .into_iter()
                .find(|m| m.target_code == icd11_code && m.target_system == target_system);

            if mapping.is_none() {
                errors.push(format!(
                    "No mapping found between NAMASTE code {} and ICD-11 code {}",
                    namaste_code, icd11_code
                ));
            }
        }

        Ok(DualCodingValidation {
            valid: mapping.is_some(),
            errors,
            mapping,
        })
    }
}
