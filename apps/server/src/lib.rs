//! AYUSH terminology server
//!
//! Crosswalk between the NAMASTE catalog of Ayurveda, Siddha and Unani
//! diagnoses and ICD-11 (Traditional Medicine Module 2 and Biomedicine):
//! - Concept mapping registry with translation in each supported direction
//! - Automatic mapping generation from catalog cross-references
//! - Dual-coding validation
//! - FHIR CodeSystem, ConceptMap, ValueSet, Condition and Bundle synthesis
//! - CSV catalog loading and WHO ICD-11 API synchronisation

#![allow(
    clippy::too_many_arguments, // service constructors wire several collaborators
)]

pub mod api;
pub mod background;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
