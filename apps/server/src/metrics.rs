//! Metrics collection for the terminology server
//!
//! Prometheus metrics registered in the default registry and exposed at `/metrics`.

use crate::{db::TerminologyStore, models::Catalog};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // HTTP Request Metrics

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ayush_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ayush_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    /// In-flight HTTP requests
    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "ayush_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Terminology Metrics

    /// Translations by direction and outcome (hit/empty)
    pub static ref TRANSLATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ayush_translations_total",
        "Total number of translation requests",
        &["direction", "outcome"]
    )
    .expect("Failed to register TRANSLATIONS_TOTAL");

    /// Automatic mapping generation runs by status
    pub static ref MAPPING_GENERATION_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ayush_mapping_generation_runs_total",
        "Automatic mapping generation runs",
        &["status"]
    )
    .expect("Failed to register MAPPING_GENERATION_RUNS_TOTAL");

    /// Mappings created by automatic generation
    pub static ref MAPPINGS_GENERATED_TOTAL: IntCounter = register_int_counter!(
        "ayush_mappings_generated_total",
        "Mappings created by automatic generation"
    )
    .expect("Failed to register MAPPINGS_GENERATED_TOTAL");

    /// ICD-11 sync runs by module and status
    pub static ref ICD11_SYNC_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ayush_icd11_sync_total",
        "ICD-11 synchronization runs",
        &["module", "status"]
    )
    .expect("Failed to register ICD11_SYNC_TOTAL");

    /// Codes currently held per catalog
    pub static ref CATALOG_CODES: IntGaugeVec = register_int_gauge_vec!(
        "ayush_catalog_codes",
        "Number of codes held per catalog",
        &["catalog"]
    )
    .expect("Failed to register CATALOG_CODES");
}

/// Refresh the catalog size gauge from the store; failures leave the gauge unchanged
pub async fn set_catalog_size(catalog: Catalog, store: &dyn TerminologyStore) {
    if let Ok(count) = store.count(catalog).await {
        CATALOG_CODES
            .with_label_values(&[catalog.label()])
            .set(count as i64);
    }
}

/// Path segments followed by a variable segment, with the label used in its place
const PARAM_SEGMENTS: &[(&str, &str)] = &[
    ("code", "{code}"),
    ("system", "{system}"),
    ("categories", "{system}"),
    ("type", "{type}"),
    ("namaste-to-tm2", "{code}"),
    ("tm2-to-namaste", "{code}"),
    ("namaste-to-biomedicine", "{code}"),
];

/// Replace codes and ids in a request path to keep label cardinality bounded
pub fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());

    let mut i = 0;
    while i < segments.len() {
        let segment = segments[i];
        out.push(segment);

        if segment == "mapping" && i + 1 < segments.len() {
            // /mapping/{id} or /mapping/{system}/{code}
            if i + 2 < segments.len() {
                out.push("{system}");
                out.push("{code}");
                i += 3;
            } else {
                out.push("{id}");
                i += 2;
            }
            continue;
        }

        if let Some((_, label)) = PARAM_SEGMENTS.iter().find(|(name, _)| *name == segment) {
            if i + 1 < segments.len() {
                out.push(label);
                i += 2;
                continue;
            }
        }
        i += 1;
    }

    let joined = out.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/terminology/namaste/code/AY001"),
            "/api/terminology/namaste/code/{code}"
        );
        assert_eq!(
            sanitize_path("/api/terminology/translate/namaste-to-tm2/AY001"),
            "/api/terminology/translate/namaste-to-tm2/{code}"
        );
        assert_eq!(
            sanitize_path("/api/terminology/mapping/12"),
            "/api/terminology/mapping/{id}"
        );
        assert_eq!(
            sanitize_path("/api/terminology/mapping/http%3A%2F%2Fx/AY001"),
            "/api/terminology/mapping/{system}/{code}"
        );
        assert_eq!(sanitize_path("/api/terminology/mapping"), "/api/terminology/mapping");
        assert_eq!(
            sanitize_path("/fhir/CodeSystem/namaste-codes"),
            "/fhir/CodeSystem/namaste-codes"
        );
        assert_eq!(sanitize_path("/health"), "/health");
        assert_eq!(sanitize_path("/"), "/");
    }
}
