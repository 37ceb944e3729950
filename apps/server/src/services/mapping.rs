use crate::{
    db::MappingStore,
    models::{ConceptMapping, Equivalence, NewMapping},
    services::audit::AuditLogger,
    Error, Result,
};
use std::sync::Arc;

/// Registry of concept mappings
#[derive(Clone)]
pub struct MappingService {
    store: Arc<dyn MappingStore>,
    audit: AuditLogger,
}

impl MappingService {
    pub fn new(store: Arc<dyn MappingStore>, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    /// Always inserts a new mapping; explicit creation does not deduplicate
    pub async fn create(&self, mapping: NewMapping) -> Result<ConceptMapping> {
        let created = self.store.insert(mapping).await?;
        self.audit.mapping_creation(
            &created.source_code,
            &created.target_code,
            created.equivalence.as_str(),
        );
        tracing::debug!(
            id = created.id,
            source = %created.source_code,
            target = %created.target_code,
            equivalence = %created.equivalence,
            "Created concept mapping"
        );
        Ok(created)
    }

    pub async fn all(&self) -> Result<Vec<ConceptMapping>> {
        self.store.all().await
    }

    pub async fn get(&self, id: i64) -> Result<ConceptMapping> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(Error::MappingNotFound(id))
    }

    /// Mappings where `code` participates within `system`, as source or target
    pub async fn find_for_code(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        self.store.find_for_code(code, system).await
    }

    pub async fn find_by_source(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        self.store.find_by_source(code, system).await
    }

    pub async fn find_by_target(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        self.store.find_by_target(code, system).await
    }

    pub async fn find_by_equivalence(&self, equivalence: Equivalence) -> Result<Vec<ConceptMapping>> {
        self.store.find_by_equivalence(equivalence).await
    }

    pub async fn find_between_systems(
        &self,
        source_system: &str,
        target_system: &str,
    ) -> Result<Vec<ConceptMapping>> {
        self.store
            .find_between_systems(source_system, target_system)
            .await
    }

    pub async fn find_by_source_and_target_system(
        &self,
        source_code: &str,
        source_system: &str,
        target_system: &str,
    ) -> Result<Option<ConceptMapping>> {
        self.store
            .find_by_source_and_target_system(source_code, source_system, target_system)
            .await
    }

    pub async fn count_between_systems(
        &self,
        source_system: &str,
        target_system: &str,
    ) -> Result<usize> {
        Ok(self
            .find_between_systems(source_system, target_system)
            .await?
            .len())
    }

    /// Irreversibly remove a mapping; `MappingNotFound` when absent
    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::MappingNotFound(id));
        }
        self.audit.mapping_deletion(id);
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryMappingStore;

    const NAMASTE: &str = "http://terminology.ayush.gov.in/CodeSystem/namaste";
    const TM2: &str = "http://id.who.int/icd11/tm2";
    const BIO: &str = "http://id.who.int/icd11/mms";

    fn service() -> MappingService {
        MappingService::new(Arc::new(InMemoryMappingStore::new()), AuditLogger::new(false))
    }

    #[tokio::test]
    async fn explicit_create_allows_duplicate_edges() {
        let svc = service();
        let m = NewMapping::new("AY001", NAMASTE, "TM2-A1", TM2, Equivalence::Equivalent);
        svc.create(m.clone()).await.unwrap();
        svc.create(m).await.unwrap();
        assert_eq!(svc.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lookups_by_equivalence_and_system_pair() {
        let svc = service();
        svc.create(NewMapping::new("AY001", NAMASTE, "TM2-A1", TM2, Equivalence::Equivalent))
            .await
            .unwrap();
        svc.create(NewMapping::new("AY001", NAMASTE, "1A00", BIO, Equivalence::RelatedTo))
            .await
            .unwrap();

        assert_eq!(
            svc.find_by_equivalence(Equivalence::RelatedTo)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(svc.count_between_systems(NAMASTE, TM2).await.unwrap(), 1);
        assert_eq!(svc.find_for_code("AY001", NAMASTE).await.unwrap().len(), 2);
        assert!(svc
            .find_by_source_and_target_system("AY001", NAMASTE, BIO)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleting_a_missing_mapping_is_not_found() {
        let svc = service();
        let m = svc
            .create(NewMapping::new("AY001", NAMASTE, "TM2-A1", TM2, Equivalence::Equivalent))
            .await
            .unwrap();
        svc.delete(m.id).await.unwrap();
        assert!(matches!(
            svc.delete(m.id).await,
            Err(Error::MappingNotFound(id)) if id == m.id
        ));
        assert!(matches!(svc.get(m.id).await, Err(Error::MappingNotFound(_))));
    }
}
