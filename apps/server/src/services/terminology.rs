use crate::{
    db::TerminologyStore,
    models::{Catalog, ClassificationTag, Icd11Module, Page, TerminologyCode, TraditionalSystem},
    services::audit::AuditLogger,
    Error, Result,
};
use serde::Serialize;
use std::sync::Arc;

/// Catalog and per-tag code counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminologyStats {
    pub namaste_code_count: usize,
    pub icd11_code_count: usize,
    pub mapping_count: usize,
    pub ayurveda_count: usize,
    pub siddha_count: usize,
    pub unani_count: usize,
    pub tm2_count: usize,
    pub biomedicine_count: usize,
}

/// Audited read access to the NAMASTE and ICD-11 catalogs
#[derive(Clone)]
pub struct TerminologyService {
    store: Arc<dyn TerminologyStore>,
    audit: AuditLogger,
}

impl TerminologyService {
    pub fn new(store: Arc<dyn TerminologyStore>, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<dyn TerminologyStore> {
        &self.store
    }

    pub async fn find(&self, catalog: Catalog, code: &str) -> Result<Option<TerminologyCode>> {
        self.audit.code_lookup(catalog.label(), code);
        self.store.find_by_code(catalog, code).await
    }

    /// Like [`find`](Self::find) but absent codes are `CodeNotFound`
    pub async fn get(&self, catalog: Catalog, code: &str) -> Result<TerminologyCode> {
        self.find(catalog, code).await?.ok_or_else(|| match catalog {
            Catalog::Namaste => Error::namaste_not_found(code),
            Catalog::Icd11 => Error::icd11_not_found(code),
        })
    }

    pub async fn search(
        &self,
        catalog: Catalog,
        term: &str,
        page: usize,
        size: usize,
    ) -> Result<Page<TerminologyCode>> {
        let results = self.store.search_by_term(catalog, term, page, size).await?;
        self.audit
            .search(catalog.label(), term, results.total_elements);
        Ok(results)
    }

    pub async fn autocomplete(
        &self,
        catalog: Catalog,
        term: &str,
        limit: usize,
    ) -> Result<Vec<TerminologyCode>> {
        self.store.find_by_prefix(catalog, term, limit).await
    }

    pub async fn by_system(&self, system: TraditionalSystem) -> Result<Vec<TerminologyCode>> {
        self.store.find_by_tag(system.into()).await
    }

    pub async fn by_module(&self, module: Icd11Module) -> Result<Vec<TerminologyCode>> {
        self.store.find_by_tag(module.into()).await
    }

    pub async fn categories(&self, tag: ClassificationTag) -> Result<Vec<String>> {
        self.store.categories_by_tag(tag).await
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<TerminologyCode>> {
        self.store.find_by_category(category).await
    }

    pub async fn save(&self, code: TerminologyCode) -> Result<TerminologyCode> {
        let catalog = code.catalog();
        let saved = self.store.save(code).await?;
        self.audit.code_update(catalog.label(), &saved.code, "SAVE");
        Ok(saved)
    }

    pub async fn stats(&self, mapping_count: usize) -> Result<TerminologyStats> {
        let tag = |t: ClassificationTag| self.store.count_by_tag(t);
        Ok(TerminologyStats {
            namaste_code_count: self.store.count(Catalog::Namaste).await?,
            icd11_code_count: self.store.count(Catalog::Icd11).await?,
            mapping_count,
            ayurveda_count: tag(TraditionalSystem::Ayurveda.into()).await?,
            siddha_count: tag(TraditionalSystem::Siddha.into()).await?,
            unani_count: tag(TraditionalSystem::Unani.into()).await?,
            tm2_count: tag(Icd11Module::Tm2.into()).await?,
            biomedicine_count: tag(Icd11Module::Biomedicine.into()).await?,
        })
    }
}
