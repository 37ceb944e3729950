//! Concept mapping records and the equivalence taxonomy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How precisely a mapped pair of codes corresponds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Equivalence {
    RelatedTo,
    Equivalent,
    Equal,
    Wider,
    Subsumes,
    Narrower,
    Specializes,
    Inexact,
    Unmatched,
    Disjoint,
}

impl Equivalence {
    pub const ALL: [Equivalence; 10] = [
        Equivalence::RelatedTo,
        Equivalence::Equivalent,
        Equivalence::Equal,
        Equivalence::Wider,
        Equivalence::Subsumes,
        Equivalence::Narrower,
        Equivalence::Specializes,
        Equivalence::Inexact,
        Equivalence::Unmatched,
        Equivalence::Disjoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Equivalence::RelatedTo => "RELATEDTO",
            Equivalence::Equivalent => "EQUIVALENT",
            Equivalence::Equal => "EQUAL",
            Equivalence::Wider => "WIDER",
            Equivalence::Subsumes => "SUBSUMES",
            Equivalence::Narrower => "NARROWER",
            Equivalence::Specializes => "SPECIALIZES",
            Equivalence::Inexact => "INEXACT",
            Equivalence::Unmatched => "UNMATCHED",
            Equivalence::Disjoint => "DISJOINT",
        }
    }

    /// Case-insensitive parse of the internal names
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|e| e.as_str() == upper)
    }

    /// Map onto the FHIR R4 `ConceptMapEquivalence` vocabulary.
    ///
    /// Every internal value has a direct counterpart. The `FHIR_DEFAULT`
    /// branch covers equivalence strings that do not parse into this enum
    /// (see [`Equivalence::fhir_code_for`]).
    pub fn fhir_code(&self) -> &'static str {
        match self {
            Equivalence::RelatedTo => "relatedto",
            Equivalence::Equivalent => "equivalent",
            Equivalence::Equal => "equal",
            Equivalence::Wider => "wider",
            Equivalence::Subsumes => "subsumes",
            Equivalence::Narrower => "narrower",
            Equivalence::Specializes => "specializes",
            Equivalence::Inexact => "inexact",
            Equivalence::Unmatched => "unmatched",
            Equivalence::Disjoint => "disjoint",
        }
    }

    pub const FHIR_DEFAULT: &'static str = "relatedto";

    /// FHIR code for a raw equivalence string; unrecognised values fall back to `relatedto`
    pub fn fhir_code_for(raw: &str) -> &'static str {
        Self::parse(raw)
            .map(|e| e.fhir_code())
            .unwrap_or(Self::FHIR_DEFAULT)
    }

    /// Whether a `$translate` match with this equivalence counts as a successful translation
    pub fn is_positive_match(&self) -> bool {
        !matches!(self, Equivalence::Unmatched | Equivalence::Disjoint)
    }
}

impl fmt::Display for Equivalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge source → target between two code systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMapping {
    pub id: i64,
    pub source_code: String,
    pub source_system: String,
    pub target_code: String,
    pub target_system: String,
    pub equivalence: Equivalence,
    pub comment: Option<String>,
    /// Advisory only, range is not enforced
    pub confidence_score: Option<f64>,
    pub mapping_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConceptMapping {
    /// Whether `code` participates in this mapping within `system`, in either direction
    pub fn involves(&self, code: &str, system: &str) -> bool {
        (self.source_code == code && self.source_system == system)
            || (self.target_code == code && self.target_system == system)
    }
}

/// Input for creating a mapping; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewMapping {
    pub source_code: String,
    pub source_system: String,
    pub target_code: String,
    pub target_system: String,
    pub equivalence: Equivalence,
    pub comment: Option<String>,
    pub confidence_score: Option<f64>,
    pub mapping_version: Option<String>,
}

impl NewMapping {
    pub fn new(
        source_code: impl Into<String>,
        source_system: impl Into<String>,
        target_code: impl Into<String>,
        target_system: impl Into<String>,
        equivalence: Equivalence,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            source_system: source_system.into(),
            target_code: target_code.into(),
            target_system: target_system.into(),
            equivalence,
            comment: None,
            confidence_score: None,
            mapping_version: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence_score = confidence;
        self
    }
}
