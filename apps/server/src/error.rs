//! Error types for the terminology server

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{catalog} code not found: {code}")]
    CodeNotFound { catalog: &'static str, code: String },

    #[error("Mapping not found: {0}")]
    MappingNotFound(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Operation already running: {0}")]
    Conflict(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Format(#[from] ayush_fhir_format::FormatError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn namaste_not_found(code: impl Into<String>) -> Self {
        Error::CodeNotFound {
            catalog: "NAMASTE",
            code: code.into(),
        }
    }

    pub fn icd11_not_found(code: impl Into<String>) -> Self {
        Error::CodeNotFound {
            catalog: "ICD-11",
            code: code.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::CodeNotFound { .. } | Error::MappingNotFound(_) | Error::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::Validation(_) | Error::InvalidResource(_) | Error::Csv(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_)
            | Error::Serialization(_)
            | Error::Format(_)
            | Error::Internal(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": status_to_fhir_code(status),
                "diagnostics": error_message
            }]
        }));

        let mut response = (status, body).into_response();

        // IntoResponse has no request context, so errors are always JSON
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/fhir+json; charset=utf-8"),
        );

        response
    }
}

pub(crate) fn status_to_fhir_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "invalid",
        StatusCode::NOT_FOUND => "not-found",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "not-supported",
        StatusCode::CONFLICT => "conflict",
        StatusCode::UNPROCESSABLE_ENTITY => "processing",
        StatusCode::BAD_GATEWAY => "transient",
        _ => "exception",
    }
}
