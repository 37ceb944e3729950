//! Request body extractors.

use crate::Error;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, HeaderMap},
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use validator::Validate;

fn media_type(headers: &HeaderMap) -> String {
    headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Reject XML bodies; JSON (or a missing content type) is accepted
fn ensure_json(headers: &HeaderMap) -> Result<(), Error> {
    match media_type(headers).as_str() {
        "application/fhir+xml" | "application/xml" | "text/xml" => Err(
            Error::UnsupportedMediaType("XML request bodies are not supported".to_string()),
        ),
        _ => Ok(()),
    }
}

async fn read_body<S: Send + Sync>(req: Request, state: &S) -> Result<Bytes, Error> {
    ensure_json(req.headers())?;
    Bytes::from_request(req, state)
        .await
        .map_err(|e| Error::InvalidResource(format!("Failed to read request body: {}", e)))
}

/// A FHIR resource posted as JSON (`application/fhir+json` or `application/json`)
pub struct FhirBody(pub JsonValue);

#[async_trait]
impl<S> FromRequest<S> for FhirBody
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_body(req, state).await?;
        let value: JsonValue = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidResource(format!("Invalid JSON in request body: {}", e)))?;
        if !value.is_object() {
            return Err(Error::InvalidResource(
                "Request body must be a JSON object".to_string(),
            ));
        }
        Ok(FhirBody(value))
    }
}

/// Like [`FhirBody`] but an empty body yields `None`
pub struct OptionalFhirBody(pub Option<JsonValue>);

#[async_trait]
impl<S> FromRequest<S> for OptionalFhirBody
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_body(req, state).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalFhirBody(None));
        }
        let value: JsonValue = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidResource(format!("Invalid JSON in request body: {}", e)))?;
        Ok(OptionalFhirBody(Some(value)))
    }
}

/// JSON body deserialized into `T` and checked with its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = read_body(req, state).await?;
        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Validation(format!("Invalid request body: {}", e)))?;
        value
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;
        Ok(ValidatedJson(value))
    }
}

/// Query string deserialized into `T` and checked with its `validator` rules
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::Validation(e.body_text()))?;
        value
            .validate()
            .map_err(|e| Error::Validation(e.to_string()))?;
        Ok(ValidatedQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Probe {
        #[validate(length(min = 1))]
        name: String,
    }

    fn request(content_type: &str, body: &str) -> Request {
        axum::http::Request::builder()
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn xml_bodies_are_unsupported() {
        let result = FhirBody::from_request(request("application/fhir+xml", "<Bundle/>"), &()).await;
        assert!(matches!(result, Err(Error::UnsupportedMediaType(_))));
    }

    #[tokio::test]
    async fn non_object_json_is_invalid() {
        let result = FhirBody::from_request(request("application/fhir+json", "[]"), &()).await;
        assert!(matches!(result, Err(Error::InvalidResource(_))));
    }

    #[tokio::test]
    async fn empty_optional_body_is_none() {
        let result = OptionalFhirBody::from_request(request("application/fhir+json", ""), &())
            .await
            .unwrap();
        assert!(result.0.is_none());
    }

    #[tokio::test]
    async fn validation_rules_apply() {
        let ok = ValidatedJson::<Probe>::from_request(request("application/json", r#"{"name":"a"}"#), &())
            .await
            .unwrap();
        assert_eq!(ok.0.name, "a");

        let blank = ValidatedJson::<Probe>::from_request(request("application/json", r#"{"name":""}"#), &()).await;
        assert!(matches!(blank, Err(Error::Validation(_))));

        let missing = ValidatedJson::<Probe>::from_request(request("application/json", "{}"), &()).await;
        assert!(matches!(missing, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn query_validation_rules_apply() {
        let (mut parts, _) = axum::http::Request::get("/?name=")
            .body(())
            .unwrap()
            .into_parts();
        let result = ValidatedQuery::<Probe>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
