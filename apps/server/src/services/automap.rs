//! Automatic mapping generation from NAMASTE cross-reference fields.
//!
//! For every NAMASTE code, a TM2 cross-reference yields an `EQUIVALENT`
//! mapping and a Biomedicine cross-reference a `RELATEDTO` mapping. A mapping
//! is only created when none exists for (source code, source system, target
//! system), so repeated runs over an unchanged catalog create nothing.
//!
//! Runs are serialised by a single-flight lock. A run that fails part-way
//! keeps the mappings it already created and reports `processed = 0`.

use crate::{
    config::CodeSystems,
    db::TerminologyStore,
    models::{Catalog, Equivalence, NewMapping},
    services::{audit::AuditLogger, mapping::MappingService},
    Result,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Fixed equivalence for TM2 cross-references
pub const TM2_EQUIVALENCE: Equivalence = Equivalence::Equivalent;
/// Fixed equivalence for Biomedicine cross-references
pub const BIOMEDICINE_EQUIVALENCE: Equivalence = Equivalence::RelatedTo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Success,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Success => "SUCCESS",
            GenerationStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub status: GenerationStatus,
    /// NAMASTE codes scanned; zero on failure
    pub processed: usize,
    pub created: usize,
}

impl GenerationReport {
    fn failed() -> Self {
        Self {
            status: GenerationStatus::Failed,
            processed: 0,
            created: 0,
        }
    }
}

#[derive(Clone)]
pub struct AutoMappingGenerator {
    terminology: Arc<dyn TerminologyStore>,
    mappings: MappingService,
    systems: CodeSystems,
    audit: AuditLogger,
    run_lock: Arc<Mutex<()>>,
}

impl AutoMappingGenerator {
    pub fn new(
        terminology: Arc<dyn TerminologyStore>,
        mappings: MappingService,
        systems: CodeSystems,
        audit: AuditLogger,
    ) -> Self {
        Self {
            terminology,
            mappings,
            systems,
            audit,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run one generation pass. Overlapping calls wait for the running pass.
    pub async fn generate(&self) -> GenerationReport {
        let _guard = self.run_lock.lock().await;
        tracing::info!("Starting automatic mapping generation");

        let report = match self.scan().await {
            Ok((processed, created)) => {
                tracing::info!(processed, created, "Automatic mapping generation completed");
                GenerationReport {
                    status: GenerationStatus::Success,
                    processed,
                    created,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate automatic mappings");
                GenerationReport::failed()
            }
        };

        self.audit
            .automatic_mapping(report.status.as_str(), report.processed);
        crate::metrics::MAPPING_GENERATION_RUNS_TOTAL
            .with_label_values(&[report.status.as_str()])
            .inc();
        crate::metrics::MAPPINGS_GENERATED_TOTAL.inc_by(report.created as u64);
        report
    }

    async fn scan(&self) -> Result<(usize, usize)> {
        let codes = self.terminology.all(Catalog::Namaste).await?;
        let mut created = 0;

        for code in &codes {
            if let Some(tm2) = code.tm2_reference() {
                if self
                    .ensure_mapping(&code.code, tm2, &self.systems.tm2, TM2_EQUIVALENCE)
                    .await?
                {
                    created += 1;
                }
            }
            if let Some(bio) = code.biomedicine_reference() {
                if self
                    .ensure_mapping(&code.code, bio, &self.systems.biomedicine, BIOMEDICINE_EQUIVALENCE)
                    .await?
                {
                    created += 1;
                }
            }
        }

        Ok((codes.len(), created))
    }

    /// Returns whether a mapping was created
    async fn ensure_mapping(
        &self,
        source_code: &str,
        target_code: &str,
        target_system: &str,
        equivalence: Equivalence,
    ) -> Result<bool> {
        let existing = self
            .mappings
            .find_by_source_and_target_system(source_code, &self.systems.namaste, target_system)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        self.mappings
            .create(NewMapping::new(
                source_code,
                &self.systems.namaste,
                target_code,
                target_system,
                equivalence,
            ))
            .await?;
        Ok(true)
    }
}
