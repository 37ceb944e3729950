use anyhow::Context as _;
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(
        actual, expected,
        "{context}: expected status {expected}, got {actual}"
    );
}

pub fn assert_resource_type(value: &Value, expected: &str) {
    assert_eq!(
        value.get("resourceType").and_then(|v| v.as_str()),
        Some(expected),
        "expected resourceType {expected}"
    );
}

pub fn assert_header(headers: &HeaderMap, name: &str, expected: &str) {
    let actual = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(actual, expected, "expected header {name}: {expected}");
}

/// Assert an OperationOutcome error and return its diagnostics
pub fn assert_outcome_error(value: &Value) -> anyhow::Result<String> {
    assert_resource_type(value, "OperationOutcome");
    let issue = value
        .get("issue")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .context("OperationOutcome has an issue")?;
    assert_eq!(issue["severity"], "error");
    Ok(issue["diagnostics"].as_str().unwrap_or_default().to_string())
}

/// `(system, code)` of every Coding in `Condition.code`
pub fn condition_codings(condition: &Value) -> Vec<(String, String)> {
    condition
        .pointer("/code/coding")
        .and_then(|v| v.as_array())
        .map(|codings| {
            codings
                .iter()
                .map(|c| {
                    (
                        c["system"].as_str().unwrap_or_default().to_string(),
                        c["code"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parts of every `match` parameter of a `$translate` response
pub fn translate_matches(parameters: &Value) -> Vec<&Value> {
    parameters["parameter"]
        .as_array()
        .map(|params| params.iter().filter(|p| p["name"] == "match").collect())
        .unwrap_or_default()
}
