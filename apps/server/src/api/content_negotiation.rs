//! FHIR content negotiation
//!
//! The wire format is chosen by the `_format` query parameter first, then by
//! the `Accept` header, and defaults to JSON. `_pretty=true` indents JSON.
//!
//! See: http://hl7.org/fhir/http.html#parameters

use crate::{Error, Result};
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, HeaderMap, HeaderValue},
};
use std::collections::HashMap;

/// Wire formats served by the FHIR endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFormat {
    #[default]
    Json,
    Xml,
}

impl ContentFormat {
    /// Accepts the short forms and the generic and FHIR MIME types
    pub fn parse(s: &str) -> Option<Self> {
        let mime_type = s.split(';').next().unwrap_or(s).trim();
        match mime_type.to_ascii_lowercase().as_str() {
            "json" | "application/json" | "application/fhir+json" => Some(Self::Json),
            "xml" | "text/xml" | "application/xml" | "application/fhir+xml" => Some(Self::Xml),
            _ => None,
        }
    }

    pub fn content_type_header(&self) -> HeaderValue {
        HeaderValue::from_static(match self {
            Self::Json => "application/fhir+json; charset=utf-8",
            Self::Xml => "application/fhir+xml; charset=utf-8",
        })
    }
}

/// Format preferences extracted from a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentNegotiation {
    pub format: ContentFormat,
    pub pretty: bool,
}

impl ContentNegotiation {
    /// An explicit but unknown `_format` is rejected; an unusable `Accept`
    /// header just falls back to JSON.
    pub fn from_request(query: &HashMap<String, String>, headers: &HeaderMap) -> Result<Self> {
        let format = match query.get("_format") {
            Some(requested) => ContentFormat::parse(requested).ok_or_else(|| {
                Error::UnsupportedMediaType(format!("Unsupported _format: {}", requested))
            })?,
            None => Self::format_from_accept(headers).unwrap_or_default(),
        };

        let pretty = query
            .get("_pretty")
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(false);

        Ok(Self { format, pretty })
    }

    /// First supported media type in `Accept`, ignoring q-values
    fn format_from_accept(headers: &HeaderMap) -> Option<ContentFormat> {
        let accept = headers.get("accept")?.to_str().ok()?;
        accept.split(',').find_map(ContentFormat::parse)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ContentNegotiation
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(query) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::Validation(e.body_text()))?;
        Self::from_request(&query, &parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn format_aliases() {
        assert_eq!(ContentFormat::parse("XML"), Some(ContentFormat::Xml));
        assert_eq!(
            ContentFormat::parse("application/fhir+json; charset=utf-8"),
            Some(ContentFormat::Json)
        );
        assert_eq!(ContentFormat::parse("text/xml"), Some(ContentFormat::Xml));
        assert_eq!(ContentFormat::parse("ttl"), None);
    }

    #[test]
    fn query_parameter_wins_over_accept() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "application/fhir+xml".parse().unwrap());

        let cn = ContentNegotiation::from_request(&query(&[("_format", "json")]), &headers).unwrap();
        assert_eq!(cn.format, ContentFormat::Json);

        let cn = ContentNegotiation::from_request(&query(&[]), &headers).unwrap();
        assert_eq!(cn.format, ContentFormat::Xml);
    }

    #[test]
    fn browser_accept_header_falls_through_to_first_supported() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "accept",
            "text/html,application/xhtml+xml,application/json;q=0.9"
                .parse()
                .unwrap(),
        );
        let cn = ContentNegotiation::from_request(&query(&[]), &headers).unwrap();
        assert_eq!(cn.format, ContentFormat::Json);
    }

    #[test]
    fn unknown_format_parameter_is_rejected() {
        let result = ContentNegotiation::from_request(&query(&[("_format", "ttl")]), &HeaderMap::new());
        assert!(matches!(result, Err(Error::UnsupportedMediaType(_))));
    }

    #[test]
    fn pretty_flag() {
        let cn = ContentNegotiation::from_request(&query(&[("_pretty", "true")]), &HeaderMap::new())
            .unwrap();
        assert!(cn.pretty);
        assert_eq!(cn.format, ContentFormat::Json);
    }
}
