pub mod audit;
pub mod automap;
pub mod fhir;
pub mod icd11;
pub mod loader;
pub mod mapping;
pub mod problem_list;
pub mod terminology;
pub mod translation;
pub mod validation;

pub use audit::AuditLogger;
pub use automap::{AutoMappingGenerator, GenerationReport, GenerationStatus};
pub use fhir::{ConditionOptions, FhirService};
pub use icd11::{Icd11Client, TokenState};
pub use loader::CatalogLoader;
pub use mapping::MappingService;
pub use problem_list::ProblemListService;
pub use terminology::{TerminologyService, TerminologyStats};
pub use translation::{TranslationDirection, TranslationService};
pub use validation::{DualCodingValidation, DualCodingValidator};
