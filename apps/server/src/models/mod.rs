//! Domain models for the terminology service

pub mod fhir;
pub mod mapping;
pub mod terminology;

pub use fhir::{Parameter, ParameterValue, Parameters};
pub use mapping::{ConceptMapping, Equivalence, NewMapping};
pub use terminology::{
    Catalog, ClassificationTag, CodeDetails, Icd11Details, Icd11Module, NamasteDetails, Page,
    TerminologyCode, TraditionalSystem,
};
