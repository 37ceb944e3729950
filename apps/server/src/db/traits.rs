//! Storage traits for the terminology catalogs and the mapping registry
//!
//! Any backend (in-memory, SQL, remote) can sit behind these traits. All
//! methods are fallible so that a persistent backend can surface its own
//! errors through [`crate::Error`].

use crate::{
    models::{
        Catalog, ClassificationTag, ConceptMapping, Equivalence, NewMapping, Page, TerminologyCode,
    },
    Result,
};
use async_trait::async_trait;

/// The two code catalogs (NAMASTE and ICD-11), keyed by code string
#[async_trait]
pub trait TerminologyStore: Send + Sync {
    /// Point lookup of a code in one catalog
    async fn find_by_code(&self, catalog: Catalog, code: &str) -> Result<Option<TerminologyCode>>;

    /// Case-insensitive substring search over code, display and definition
    ///
    /// Results are ordered by code; `page` is zero-based.
    async fn search_by_term(
        &self,
        catalog: Catalog,
        term: &str,
        page: usize,
        size: usize,
    ) -> Result<Page<TerminologyCode>>;

    /// Case-insensitive prefix match over display or code, at most `limit` results
    async fn find_by_prefix(
        &self,
        catalog: Catalog,
        term: &str,
        limit: usize,
    ) -> Result<Vec<TerminologyCode>>;

    /// All codes carrying a classification tag; the tag implies the catalog
    async fn find_by_tag(&self, tag: ClassificationTag) -> Result<Vec<TerminologyCode>>;

    /// NAMASTE codes in a category
    async fn find_by_category(&self, category: &str) -> Result<Vec<TerminologyCode>>;

    /// Distinct categories of the codes carrying `tag`, sorted
    async fn categories_by_tag(&self, tag: ClassificationTag) -> Result<Vec<String>>;

    async fn all(&self, catalog: Catalog) -> Result<Vec<TerminologyCode>>;

    /// Insert or replace a code.
    ///
    /// `created_at` is set on first save and preserved afterwards; `updated_at`
    /// is refreshed on every save. Returns the stored record.
    async fn save(&self, code: TerminologyCode) -> Result<TerminologyCode>;

    /// Save a batch, returning how many records were written
    async fn save_all(&self, codes: Vec<TerminologyCode>) -> Result<usize>;

    /// Remove a code, returning whether it existed
    async fn delete(&self, catalog: Catalog, code: &str) -> Result<bool>;

    async fn count(&self, catalog: Catalog) -> Result<usize>;

    async fn count_by_tag(&self, tag: ClassificationTag) -> Result<usize>;
}

/// Directed concept mappings. Iteration order is insertion order.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Insert a new mapping, assigning its id and timestamps. Never deduplicates.
    async fn insert(&self, mapping: NewMapping) -> Result<ConceptMapping>;

    async fn all(&self) -> Result<Vec<ConceptMapping>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ConceptMapping>>;

    /// Mappings where `code` is the source or the target within `system`
    async fn find_for_code(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>>;

    async fn find_by_source(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>>;

    async fn find_by_target(&self, code: &str, system: &str) -> Result<Vec<ConceptMapping>>;

    async fn find_by_equivalence(&self, equivalence: Equivalence) -> Result<Vec<ConceptMapping>>;

    async fn find_between_systems(
        &self,
        source_system: &str,
        target_system: &str,
    ) -> Result<Vec<ConceptMapping>>;

    /// First mapping keyed by (source code, source system, target system)
    async fn find_by_source_and_target_system(
        &self,
        source_code: &str,
        source_system: &str,
        target_system: &str,
    ) -> Result<Option<ConceptMapping>>;

    /// Remove a mapping, returning whether it existed
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<usize>;
}
