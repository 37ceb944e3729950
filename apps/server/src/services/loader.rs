//! CSV ingestion for the NAMASTE catalog and the sample ICD-11 catalog.
//!
//! NAMASTE columns: `code, display, definition, system, category, subcategory,
//! who_terminology_code, icd11_tm2_code, icd11_biomedicine_code`. Only the first
//! four are required.
//!
//! ICD-11 columns: `code, title, definition, code_type, chapter, parent`.
//!
//! The header row is always skipped. Short or malformed rows are logged and
//! skipped; an unreadable file is an error.

use crate::{
    db::TerminologyStore,
    models::{
        terminology::non_blank, Catalog, CodeDetails, Icd11Module, TerminologyCode, TraditionalSystem,
    },
    services::audit::AuditLogger,
    Result,
};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub const NAMASTE_CSV_VERSION: &str = "1.0";
const MIN_COLUMNS: usize = 4;

fn column(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record.get(idx).and_then(non_blank).map(str::to_string)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Parse NAMASTE rows. Unknown or blank systems default to Ayurveda.
pub fn parse_namaste_csv<R: Read>(input: R) -> Vec<TerminologyCode> {
    let mut codes = Vec::new();

    for (idx, row) in reader(input).records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, error = %e, "Failed to parse CSV record");
                continue;
            }
        };
        if record.len() < MIN_COLUMNS {
            tracing::warn!(line, columns = record.len(), "Skipping short CSV record");
            continue;
        }
        let (Some(code), Some(display)) = (column(&record, 0), column(&record, 1)) else {
            tracing::warn!(line, "Skipping CSV record without code or display");
            continue;
        };

        let system = TraditionalSystem::parse_lenient(record.get(3).unwrap_or_default());
        let mut entry = TerminologyCode::namaste(code, display, system);
        entry.definition = column(&record, 2);
        entry.category = column(&record, 4);
        if let CodeDetails::Namaste(details) = &mut entry.details {
            details.subcategory = column(&record, 5);
            details.who_terminology_code = column(&record, 6);
            details.icd11_tm2_code = column(&record, 7);
            details.icd11_biomedicine_code = column(&record, 8);
            details.version = Some(NAMASTE_CSV_VERSION.to_string());
        }
        codes.push(entry);
    }

    tracing::info!(count = codes.len(), "Parsed NAMASTE codes from CSV");
    codes
}

/// Parse ICD-11 rows. Rows with an unknown code type are skipped.
pub fn parse_icd11_csv<R: Read>(input: R) -> Vec<TerminologyCode> {
    let mut codes = Vec::new();

    for (idx, row) in reader(input).records().enumerate() {
        let line = idx + 2;
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, error = %e, "Failed to parse CSV record");
                continue;
            }
        };
        if record.len() < MIN_COLUMNS {
            tracing::warn!(line, columns = record.len(), "Skipping short CSV record");
            continue;
        }
        let Some(module) = record.get(3).and_then(Icd11Module::parse) else {
            tracing::warn!(line, code_type = record.get(3), "Skipping record with unknown code type");
            continue;
        };
        let (Some(code), Some(title)) = (column(&record, 0), column(&record, 1)) else {
            tracing::warn!(line, "Skipping CSV record without code or title");
            continue;
        };

        let mut entry = TerminologyCode::icd11(code, title, module);
        entry.definition = column(&record, 2);
        entry.category = column(&record, 4);
        entry.parent = column(&record, 5);
        codes.push(entry);
    }

    tracing::info!(count = codes.len(), "Parsed ICD-11 codes from CSV");
    codes
}

/// Loads CSV files into the terminology store
#[derive(Clone)]
pub struct CatalogLoader {
    terminology: Arc<dyn TerminologyStore>,
    audit: AuditLogger,
}

impl CatalogLoader {
    pub fn new(terminology: Arc<dyn TerminologyStore>, audit: AuditLogger) -> Self {
        Self { terminology, audit }
    }

    /// Upsert every NAMASTE row of `path`; returns the number saved
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn load_namaste(&self, path: impl AsRef<Path>) -> Result<usize> {
        let file = std::fs::File::open(path.as_ref())?;
        let codes = parse_namaste_csv(file);
        let saved = self.terminology.save_all(codes).await?;
        self.audit.data_load("NAMASTE_CSV", saved);
        crate::metrics::set_catalog_size(Catalog::Namaste, &*self.terminology).await;
        tracing::info!(saved, "Loaded NAMASTE codes");
        Ok(saved)
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn load_icd11(&self, path: impl AsRef<Path>) -> Result<usize> {
        let file = std::fs::File::open(path.as_ref())?;
        let codes = parse_icd11_csv(file);
        let saved = self.terminology.save_all(codes).await?;
        self.audit.data_load("ICD11_CSV", saved);
        crate::metrics::set_catalog_size(Catalog::Icd11, &*self.terminology).await;
        tracing::info!(saved, "Loaded ICD-11 codes");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryTerminologyStore;
    use std::io::Write;

    const NAMASTE_CSV: &str = "\
code,display,definition,system,category,subcategory,who_code,tm2,biomedicine
AY001,Vataja Jwara,Fever due to vata,AYURVEDA,Jwara,,ITA-5.1,TM2-A1,
SD001,Azhal Suram,,siddha,Suram
BAD,only two
UN001,Humma,Fever,homeopathy,Humma,,,  ,1A00
";

    #[test]
    fn namaste_rows_are_parsed_and_short_rows_skipped() {
        let codes = parse_namaste_csv(NAMASTE_CSV.as_bytes());
        assert_eq!(codes.len(), 3);

        let ay = &codes[0];
        assert_eq!(ay.code, "AY001");
        assert_eq!(ay.category.as_deref(), Some("Jwara"));
        assert_eq!(ay.tm2_reference(), Some("TM2-A1"));
        assert_eq!(ay.biomedicine_reference(), None);
        let details = ay.namaste_details().unwrap();
        assert_eq!(details.who_terminology_code.as_deref(), Some("ITA-5.1"));
        assert_eq!(details.version.as_deref(), Some("1.0"));
        assert!(details.subcategory.is_none());

        assert_eq!(
            codes[1].namaste_details().unwrap().system,
            TraditionalSystem::Siddha
        );
        assert!(codes[1].definition.is_none());

        let un = &codes[2];
        assert_eq!(un.namaste_details().unwrap().system, TraditionalSystem::Ayurveda);
        assert_eq!(un.tm2_reference(), None);
        assert_eq!(un.biomedicine_reference(), Some("1A00"));
    }

    #[test]
    fn icd11_rows_need_a_known_code_type() {
        let csv = "\
code,title,definition,code_type,chapter,parent
TM2-A1,Vata pattern,Wind disorder,TM2,26,TM2-A
1A00,Cholera,,BIOMEDICINE,01
X1,Unknown,,OTHER
";
        let codes = parse_icd11_csv(csv.as_bytes());
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].parent.as_deref(), Some("TM2-A"));
        assert_eq!(codes[0].category.as_deref(), Some("26"));
        assert_eq!(
            codes[1].icd11_details().unwrap().module,
            Icd11Module::Biomedicine
        );
    }

    #[tokio::test]
    async fn load_namaste_saves_into_the_store() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(NAMASTE_CSV.as_bytes()).unwrap();

        let store = Arc::new(InMemoryTerminologyStore::new());
        let loader = CatalogLoader::new(store.clone(), AuditLogger::new(false));
        assert_eq!(loader.load_namaste(file.path()).await.unwrap(), 3);
        assert_eq!(store.count(Catalog::Namaste).await.unwrap(), 3);

        // reload is an upsert
        assert_eq!(loader.load_namaste(file.path()).await.unwrap(), 3);
        assert_eq!(store.count(Catalog::Namaste).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let loader = CatalogLoader::new(
            Arc::new(InMemoryTerminologyStore::new()),
            AuditLogger::new(false),
        );
        assert!(matches!(
            loader.load_namaste("/nonexistent/namaste.csv").await,
            Err(crate::Error::Io(_))
        ));
    }
}
