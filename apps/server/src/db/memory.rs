//! In-memory store implementations

use super::traits::{MappingStore, TerminologyStore};
use crate::{
    models::{
        Catalog, ClassificationTag, ConceptMapping, Equivalence, NewMapping, Page, TerminologyCode,
    },
    Result,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Catalogs {
    namaste: BTreeMap<String, TerminologyCode>,
    icd11: BTreeMap<String, TerminologyCode>,
}

impl Catalogs {
    fn get(&self, catalog: Catalog) -> &BTreeMap<String, TerminologyCode> {
        match catalog {
            Catalog::Namaste => &self.namaste,
            Catalog::Icd11 => &self.icd11,
        }
    }

    fn get_mut(&mut self, catalog: Catalog) -> &mut BTreeMap<String, TerminologyCode> {
        match catalog {
            Catalog::Namaste => &mut self.namaste,
            Catalog::Icd11 => &mut self.icd11,
        }
    }

    fn upsert(&mut self, mut code: TerminologyCode) -> TerminologyCode {
        let now = Utc::now();
        let entries = self.get_mut(code.catalog());
        code.created_at = entries
            .get(&code.code)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        code.updated_at = Some(now);
        entries.insert(code.code.clone(), code.clone());
        code
    }
}

/// Both catalogs held in ordered maps keyed by code
#[derive(Debug, Clone, Default)]
pub struct InMemoryTerminologyStore {
    inner: Arc<RwLock<Catalogs>>,
}

impl InMemoryTerminologyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[async_trait]
impl TerminologyStore for InMemoryTerminologyStore {
    async fn find_by_code(&self, catalog: Catalog, code: &str) -> Result<Option<TerminologyCode>> {
        Ok(self.inner.read().await.get(catalog).get(code).cloned())
    }

    async fn search_by_term(
        &self,
        catalog: Catalog,
        term: &str,
        page: usize,
        size: usize,
    ) -> Result<Page<TerminologyCode>> {
        let needle = term.trim().to_lowercase();
        let guard = self.inner.read().await;
        let hits: Vec<TerminologyCode> = guard
            .get(catalog)
            .values()
            .filter(|c| {
                contains_ci(&c.code, &needle)
                    || contains_ci(&c.display, &needle)
                    || c.definition
                        .as_deref()
                        .is_some_and(|d| contains_ci(d, &needle))
            })
            .cloned()
            .collect();
        Ok(Page::from_slice(hits, page, size))
    }

    async fn find_by_prefix(
        &self,
        catalog: Catalog,
        term: &str,
        limit: usize,
    ) -> Result<Vec<TerminologyCode>> {
        let prefix = term.trim().to_lowercase();
        let guard = self.inner.read().await;
        Ok(guard
            .get(catalog)
            .values()
            .filter(|c| {
                c.display.to_lowercase().starts_with(&prefix)
                    || c.code.to_lowercase().starts_with(&prefix)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_tag(&self, tag: ClassificationTag) -> Result<Vec<TerminologyCode>> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(tag.catalog())
            .values()
            .filter(|c| c.classification() == tag)
            .cloned()
            .collect())
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<TerminologyCode>> {
        let guard = self.inner.read().await;
        Ok(guard
            .namaste
            .values()
            .filter(|c| c.category.as_deref() == Some(category))
            .cloned()
            .collect())
    }

    async fn categories_by_tag(&self, tag: ClassificationTag) -> Result<Vec<String>> {
        let guard = self.inner.read().await;
        let categories: BTreeSet<String> = guard
            .get(tag.catalog())
            .values()
            .filter(|c| c.classification() == tag)
            .filter_map(|c| c.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn all(&self, catalog: Catalog) -> Result<Vec<TerminologyCode>> {
        Ok(self.inner.read().await.get(catalog).values().cloned().collect())
    }

    async fn save(&self, code: TerminologyCode) -> Result<TerminologyCode> {
        Ok(self.inner.write().await.upsert(code))
    }

    async fn save_all(&self, codes: Vec<TerminologyCode>) -> Result<usize> {
        let mut guard = self.inner.write().await;
        let count = codes.len();
        for code in codes {
            guard.upsert(code);
        }
        Ok(count)
    }

    async fn delete(&self, catalog: Catalog, code: &str) -> Result<bool> {
        Ok(self.inner.write().await.get_mut(catalog).remove(code).is_some())
    }

    async fn count(&self, catalog: Catalog) -> Result<usize> {
        Ok(self.inner.read().await.get(catalog).len())
    }

    async fn count_by_tag(&self, tag: ClassificationTag) -> Result<usize> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(tag.catalog())
            .values()
            .filter(|c| c.classification() == tag)
            .count())
    }
}

#[derive(Debug, Default)]
struct MappingTable {
    rows: Vec<ConceptMapping>,
    next_id: i64,
}

/// Mapping registry backed by an insertion-ordered vector
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    inner: Arc<RwLock<MappingTable>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<ConceptMapping>
    where
        F: Fn(&ConceptMapping) -> bool,
    {
        self.inner
            .read()
            .await
            .rows
            .iter()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn insert(&self, mapping: NewMapping) -> Result<ConceptMapping> {
        let mut guard = self.inner.write().await;
        guard.next_id += 1;
        let now = Utc::now();
        let row = ConceptMapping {
            id: guard.next_id,
            source_code: mapping.source_code,
            source_system: mapping.source_system,
            target_code: mapping.target_code,
            target_system: mapping.target_system,
            equivalence: mapping.equivalence,
            comment: mapping.comment,
            confidence_score: mapping.confidence_score,
            mapping_version: mapping.mapping_version,
            created_at: now,
            updated_at: now,
        };
        guard.rows.push(row.clone());
        Ok(row)
    }

    async fn all(&self) -> Result<Vec<ConceptMapping>> {
        Ok(self.inner.read().await.rows.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ConceptMapping>> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_for_code(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        Ok(self.filtered(|m| m.involves(code, system)).await)
    }

    async fn find_by_source(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        Ok(self
            .filtered(|m| m.source_code == code && m.source_system == system)
            .await)
    }

    async fn find_by_target(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>> {
        Ok(self
            .filtered(|m| m.target_code == code && m.target_system == system)
            .await)
    }

    async fn find_by_equivalence(&self, equivalence: Equivalence) -> Result<Vec<ConceptMapping>> {
        Ok(self.filtered(|m| m.equivalence == equivalence).await)
    }

    async fn find_between_systems(
        &self,
        source_system: &str,
        target_system: &str,
    ) -> Result<Vec<ConceptMapping>> {
        Ok(self
            .filtered(|m| m.source_system == source_system && m.target_system == target_system)
            .await)
    }

    async fn find_by_source_and_target_system(
        &self,
        source_code: &str,
        source_system: &str,
        target_system: &str,
    ) -> Result<Option<ConceptMapping>> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|m| {
                m.source_code == source_code
                    && m.source_system == source_system
                    && m.target_system == target_system
            })
            .cloned())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut guard = self.inner.write().await;
        let before = guard.rows.len();
        guard.rows.retain(|m| m.id != id);
        Ok(guard.rows.len() != before)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.rows.len())
    }
}
