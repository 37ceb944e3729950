//! Per-request context inserted by the request id middleware and read by
//! handlers for audit logging.

/// Top-level area of the HTTP surface a request falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSurface {
    ProblemList,
    Fhir,
    Terminology,
    System,
}

impl ApiSurface {
    pub fn from_path(path: &str) -> Self {
        if path.starts_with("/fhir/ProblemList") {
            ApiSurface::ProblemList
        } else if path.starts_with("/fhir") {
            ApiSurface::Fhir
        } else if path.starts_with("/api/terminology") {
            ApiSurface::Terminology
        } else {
            ApiSurface::System
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiSurface::ProblemList => "problem_list",
            ApiSurface::Fhir => "fhir",
            ApiSurface::Terminology => "terminology",
            ApiSurface::System => "system",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Server-assigned id, echoed as `X-Request-Id`
    pub request_id: String,
    /// Client-supplied `X-Request-Id`, if any
    pub correlation_id: Option<String>,
    pub surface: ApiSurface,
}
