//! Audit trail.
//!
//! Every terminology access and mutation is recorded as a structured `tracing`
//! event on the `audit` target. The event carries an `operation` field plus
//! operation-specific fields, so any subscriber (JSON file, OTLP) can route or
//! filter audit records independently of application logs.
//!
//! Emission is best-effort and never fails the calling operation.

use std::fmt;

pub const AUDIT_TARGET: &str = "audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    CodeLookup,
    Search,
    Translation,
    DataLoad,
    DataSync,
    MappingCreation,
    MappingDeletion,
    AutomaticMapping,
    CodeUpdate,
    FhirResource,
    FhirBundle,
    ApiAccess,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::CodeLookup => "CODE_LOOKUP",
            AuditOperation::Search => "SEARCH",
            AuditOperation::Translation => "TRANSLATION",
            AuditOperation::DataLoad => "DATA_LOAD",
            AuditOperation::DataSync => "DATA_SYNC",
            AuditOperation::MappingCreation => "MAPPING_CREATION",
            AuditOperation::MappingDeletion => "MAPPING_DELETION",
            AuditOperation::AutomaticMapping => "AUTOMATIC_MAPPING",
            AuditOperation::CodeUpdate => "CODE_UPDATE",
            AuditOperation::FhirResource => "FHIR_RESOURCE",
            AuditOperation::FhirBundle => "FHIR_BUNDLE",
            AuditOperation::ApiAccess => "API_ACCESS",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuditLogger {
    enabled: bool,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AuditLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn code_lookup(&self, system: &str, code: &str) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::CodeLookup, system, code);
        }
    }

    pub fn search(&self, system: &str, term: &str, result_count: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::Search, system, term, result_count);
        }
    }

    /// `direction` is one of NAMASTE_TO_TM2, TM2_TO_NAMASTE, NAMASTE_TO_BIOMEDICINE
    pub fn translation(&self, direction: &str, code: &str, result_count: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::Translation, direction, code, result_count);
        }
    }

    pub fn data_load(&self, source: &str, record_count: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::DataLoad, source, record_count);
        }
    }

    pub fn data_sync(&self, system: &str, status: &str) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::DataSync, system, status);
        }
    }

    pub fn mapping_creation(&self, source_code: &str, target_code: &str, equivalence: &str) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::MappingCreation, source_code, target_code, equivalence);
        }
    }

    pub fn mapping_deletion(&self, mapping_id: i64) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::MappingDeletion, mapping_id);
        }
    }

    pub fn automatic_mapping(&self, status: &str, processed: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::AutomaticMapping, status, processed);
        }
    }

    pub fn code_update(&self, system: &str, code: &str, action: &str) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::CodeUpdate, system, code, action);
        }
    }

    pub fn fhir_resource(&self, resource_type: &str, system: &str, count: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::FhirResource, resource_type, system, count);
        }
    }

    pub fn fhir_bundle(&self, patient_id: &str, condition_count: usize) {
        if self.enabled {
            tracing::info!(target: AUDIT_TARGET, operation = %AuditOperation::FhirBundle, patient_id, condition_count);
        }
    }

    pub fn api_access(&self, endpoint: &str, method: &str, request_id: Option<&str>) {
        if self.enabled {
            tracing::info!(
                target: AUDIT_TARGET,
                operation = %AuditOperation::ApiAccess,
                endpoint,
                method,
                request_id = request_id.unwrap_or("-")
            );
        }
    }
}
