//! Terminology code records shared by the NAMASTE and ICD-11 catalogs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The two independent code catalogs held by the terminology store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// National AYUSH Morbidity & Standardized Terminologies Electronic
    Namaste,
    /// ICD-11 (both the TM2 and Biomedicine modules)
    Icd11,
}

impl Catalog {
    pub fn label(&self) -> &'static str {
        match self {
            Catalog::Namaste => "NAMASTE",
            Catalog::Icd11 => "ICD11",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Traditional medicine system a NAMASTE code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraditionalSystem {
    Ayurveda,
    Siddha,
    Unani,
}

impl TraditionalSystem {
    pub const ALL: [TraditionalSystem; 3] = [
        TraditionalSystem::Ayurveda,
        TraditionalSystem::Siddha,
        TraditionalSystem::Unani,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraditionalSystem::Ayurveda => "AYURVEDA",
            TraditionalSystem::Siddha => "SIDDHA",
            TraditionalSystem::Unani => "UNANI",
        }
    }

    /// Strict, case-insensitive parse (used for query and path parameters)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AYURVEDA" => Some(TraditionalSystem::Ayurveda),
            "SIDDHA" => Some(TraditionalSystem::Siddha),
            "UNANI" => Some(TraditionalSystem::Unani),
            _ => None,
        }
    }

    /// Lenient parse used for CSV ingestion: unknown or blank values fall back to Ayurveda
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or(TraditionalSystem::Ayurveda)
    }
}

impl fmt::Display for TraditionalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ICD-11 module an ICD-11 code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Icd11Module {
    Tm2,
    Biomedicine,
}

impl Icd11Module {
    pub const ALL: [Icd11Module; 2] = [Icd11Module::Tm2, Icd11Module::Biomedicine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Icd11Module::Tm2 => "TM2",
            Icd11Module::Biomedicine => "BIOMEDICINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TM2" => Some(Icd11Module::Tm2),
            "BIOMEDICINE" => Some(Icd11Module::Biomedicine),
            _ => None,
        }
    }
}

impl fmt::Display for Icd11Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed classification tag, one per catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationTag {
    Namaste(TraditionalSystem),
    Icd11(Icd11Module),
}

impl ClassificationTag {
    pub fn catalog(&self) -> Catalog {
        match self {
            ClassificationTag::Namaste(_) => Catalog::Namaste,
            ClassificationTag::Icd11(_) => Catalog::Icd11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationTag::Namaste(s) => s.as_str(),
            ClassificationTag::Icd11(m) => m.as_str(),
        }
    }
}

impl From<TraditionalSystem> for ClassificationTag {
    fn from(value: TraditionalSystem) -> Self {
        ClassificationTag::Namaste(value)
    }
}

impl From<Icd11Module> for ClassificationTag {
    fn from(value: Icd11Module) -> Self {
        ClassificationTag::Icd11(value)
    }
}

/// NAMASTE-specific fields, including the cross-references into ICD-11
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamasteDetails {
    pub system: TraditionalSystem,
    pub subcategory: Option<String>,
    pub who_terminology_code: Option<String>,
    pub icd11_tm2_code: Option<String>,
    pub icd11_biomedicine_code: Option<String>,
    pub version: Option<String>,
}

/// ICD-11-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icd11Details {
    pub module: Icd11Module,
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
    pub linearization_uri: Option<String>,
    pub foundation_uri: Option<String>,
}

/// Catalog discriminant carrying the catalog-specific extras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "catalog", rename_all = "lowercase")]
pub enum CodeDetails {
    Namaste(NamasteDetails),
    Icd11(Icd11Details),
}

/// A code record in either catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminologyCode {
    pub code: String,
    /// NAMASTE display, ICD-11 title
    pub display: String,
    pub definition: Option<String>,
    /// NAMASTE category, ICD-11 chapter
    pub category: Option<String>,
    pub parent: Option<String>,
    #[serde(flatten)]
    pub details: CodeDetails,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TerminologyCode {
    pub fn namaste(
        code: impl Into<String>,
        display: impl Into<String>,
        system: TraditionalSystem,
    ) -> Self {
        Self {
            code: code.into(),
            display: display.into(),
            definition: None,
            category: None,
            parent: None,
            details: CodeDetails::Namaste(NamasteDetails {
                system,
                subcategory: None,
                who_terminology_code: None,
                icd11_tm2_code: None,
                icd11_biomedicine_code: None,
                version: None,
            }),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn icd11(code: impl Into<String>, title: impl Into<String>, module: Icd11Module) -> Self {
        Self {
            code: code.into(),
            display: title.into(),
            definition: None,
            category: None,
            parent: None,
            details: CodeDetails::Icd11(Icd11Details {
                module,
                synonyms: BTreeMap::new(),
                linearization_uri: None,
                foundation_uri: None,
            }),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn catalog(&self) -> Catalog {
        match self.details {
            CodeDetails::Namaste(_) => Catalog::Namaste,
            CodeDetails::Icd11(_) => Catalog::Icd11,
        }
    }

    pub fn classification(&self) -> ClassificationTag {
        match &self.details {
            CodeDetails::Namaste(d) => ClassificationTag::Namaste(d.system),
            CodeDetails::Icd11(d) => ClassificationTag::Icd11(d.module),
        }
    }

    pub fn namaste_details(&self) -> Option<&NamasteDetails> {
        match &self.details {
            CodeDetails::Namaste(d) => Some(d),
            CodeDetails::Icd11(_) => None,
        }
    }

    pub fn icd11_details(&self) -> Option<&Icd11Details> {
        match &self.details {
            CodeDetails::Icd11(d) => Some(d),
            CodeDetails::Namaste(_) => None,
        }
    }

    /// TM2 cross-reference, blank values treated as absent
    pub fn tm2_reference(&self) -> Option<&str> {
        self.namaste_details()
            .and_then(|d| d.icd11_tm2_code.as_deref())
            .and_then(non_blank)
    }

    /// Biomedicine cross-reference, blank values treated as absent
    pub fn biomedicine_reference(&self) -> Option<&str> {
        self.namaste_details()
            .and_then(|d| d.icd11_biomedicine_code.as_deref())
            .and_then(non_blank)
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the ICD-11 cross-references of a NAMASTE code; no-op on ICD-11 codes
    pub fn with_cross_references(mut self, tm2: Option<&str>, biomedicine: Option<&str>) -> Self {
        if let CodeDetails::Namaste(d) = &mut self.details {
            d.icd11_tm2_code = tm2.map(str::to_string);
            d.icd11_biomedicine_code = biomedicine.map(str::to_string);
        }
        self
    }

    pub fn with_who_terminology_code(mut self, who: impl Into<String>) -> Self {
        if let CodeDetails::Namaste(d) = &mut self.details {
            d.who_terminology_code = Some(who.into());
        }
        self
    }
}

pub(crate) fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// One page of a paged catalog search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn from_slice(all: Vec<T>, page: usize, size: usize) -> Self {
        let total_elements = all.len();
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size)
        };
        let content = all
            .into_iter()
            .skip(page.saturating_mul(size))
            .take(size)
            .collect();
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_follows_details_discriminant() {
        let ay = TerminologyCode::namaste("AY001", "Vataja Jwara", TraditionalSystem::Ayurveda);
        let tm = TerminologyCode::icd11("TM2-A1", "Wind fever pattern", Icd11Module::Tm2);

        assert_eq!(ay.catalog(), Catalog::Namaste);
        assert_eq!(tm.catalog(), Catalog::Icd11);
        assert_eq!(ay.classification().as_str(), "AYURVEDA");
        assert_eq!(tm.classification().as_str(), "TM2");
    }

    #[test]
    fn blank_cross_references_are_ignored() {
        let code = TerminologyCode::namaste("AY002", "Pittaja Jwara", TraditionalSystem::Ayurveda)
            .with_cross_references(Some("  "), Some("1A00 "));

        assert_eq!(code.tm2_reference(), None);
        assert_eq!(code.biomedicine_reference(), Some("1A00"));
    }

    #[test]
    fn lenient_system_parse_defaults_to_ayurveda() {
        assert_eq!(TraditionalSystem::parse_lenient("siddha"), TraditionalSystem::Siddha);
        assert_eq!(TraditionalSystem::parse_lenient(""), TraditionalSystem::Ayurveda);
        assert_eq!(TraditionalSystem::parse_lenient("homeopathy"), TraditionalSystem::Ayurveda);
        assert_eq!(TraditionalSystem::parse("homeopathy"), None);
    }

    #[test]
    fn page_slices_and_counts() {
        let page = Page::from_slice((0..45).collect::<Vec<_>>(), 2, 20);
        assert_eq!(page.content, (40..45).collect::<Vec<_>>());
        assert_eq!(page.total_elements, 45);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn serializes_with_flattened_catalog_tag() {
        let code = TerminologyCode::icd11("1A00", "Cholera", Icd11Module::Biomedicine);
        let json = serde_json::to_value(&code).unwrap();
        assert_eq!(json["catalog"], "icd11");
        assert_eq!(json["module"], "BIOMEDICINE");
        assert_eq!(json["display"], "Cholera");
    }
}
