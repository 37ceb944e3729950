//! Shared application state handed to every handler

use crate::{
    config::{CodeSystems, Config},
    db::{InMemoryMappingStore, InMemoryTerminologyStore, MappingStore, TerminologyStore},
    services::{
        AuditLogger, AutoMappingGenerator, CatalogLoader, DualCodingValidator, FhirService,
        Icd11Client, MappingService, ProblemListService, TerminologyService, TokenState,
        TranslationService,
    },
    Result,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub systems: CodeSystems,
    pub audit: AuditLogger,
    pub terminology: TerminologyService,
    pub mappings: MappingService,
    pub translation: TranslationService,
    pub generator: AutoMappingGenerator,
    pub validator: DualCodingValidator,
    pub fhir: FhirService,
    pub problem_list: ProblemListService,
    pub loader: CatalogLoader,
    pub icd11: Icd11Client,
}

impl AppState {
    /// State over fresh in-memory stores
    pub fn new(config: Config) -> Result<Self> {
        Self::with_stores(
            config,
            Arc::new(InMemoryTerminologyStore::new()),
            Arc::new(InMemoryMappingStore::new()),
        )
    }

    pub fn with_stores(
        config: Config,
        terminology_store: Arc<dyn TerminologyStore>,
        mapping_store: Arc<dyn MappingStore>,
    ) -> Result<Self> {
        let systems = config.code_systems();
        let audit = AuditLogger::new(config.logging.audit_enabled);

        let terminology = TerminologyService::new(terminology_store.clone(), audit.clone());
        let mappings = MappingService::new(mapping_store, audit.clone());
        let translation = TranslationService::new(
            mappings.clone(),
            terminology_store.clone(),
            systems.clone(),
            audit.clone(),
        );
        let generator = AutoMappingGenerator::new(
            terminology_store.clone(),
            mappings.clone(),
            systems.clone(),
            audit.clone(),
        );
        let validator =
            DualCodingValidator::new(terminology_store.clone(), mappings.clone(), systems.clone());
        let fhir = FhirService::new(
            terminology_store.clone(),
            mappings.clone(),
            translation.clone(),
            systems.clone(),
            config.base_url(),
            audit.clone(),
        );
        let problem_list = ProblemListService::new(
            terminology_store.clone(),
            translation.clone(),
            fhir.clone(),
            validator.clone(),
            systems.clone(),
            audit.clone(),
        );
        let loader = CatalogLoader::new(terminology_store.clone(), audit.clone());
        let icd11 = Icd11Client::new(
            config.icd11.clone(),
            Arc::new(TokenState::new()),
            terminology_store,
            audit.clone(),
        )?;

        Ok(Self {
            config: Arc::new(config),
            systems,
            audit,
            terminology,
            mappings,
            translation,
            generator,
            validator,
            fhir,
            problem_list,
            loader,
            icd11,
        })
    }

    /// Load the configured NAMASTE CSV when `load_on_startup` is set
    pub async fn load_initial_data(&self) -> Result<()> {
        let t = &self.config.terminology;
        if !t.load_on_startup {
            tracing::info!("Skipping NAMASTE CSV load on startup");
            return Ok(());
        }
        self.loader.load_namaste(&t.namaste_csv_path).await?;
        if let Some(path) = t.icd11_csv_path.as_deref() {
            self.loader.load_icd11(path).await?;
        }
        Ok(())
    }
}
