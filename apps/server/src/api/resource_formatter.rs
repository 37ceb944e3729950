//! Serialises synthesized FHIR resources in the negotiated wire format

use crate::{
    api::content_negotiation::{ContentFormat, ContentNegotiation},
    Result,
};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value as JsonValue;

pub const CACHE_NO_CACHE: &str = "no-cache";
pub const CACHE_ONE_HOUR: &str = "max-age=3600";
pub const CACHE_HALF_HOUR: &str = "max-age=1800";

/// A FHIR resource response awaiting formatting
#[derive(Debug, Clone)]
pub struct FhirResponse {
    status: StatusCode,
    resource: JsonValue,
    cache_control: Option<&'static str>,
    location: Option<String>,
}

impl FhirResponse {
    pub fn ok(resource: JsonValue) -> Self {
        Self {
            status: StatusCode::OK,
            resource,
            cache_control: None,
            location: None,
        }
    }

    pub fn created(resource: JsonValue, location: String) -> Self {
        Self {
            status: StatusCode::CREATED,
            resource,
            cache_control: None,
            location: Some(location),
        }
    }

    pub fn cache_control(mut self, value: &'static str) -> Self {
        self.cache_control = Some(value);
        self
    }

    /// Format the body and attach headers
    pub fn render(self, negotiation: &ContentNegotiation) -> Result<Response> {
        let body = format_resource(&self.resource, negotiation)?;
        let mut response = (self.status, body).into_response();

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            negotiation.format.content_type_header(),
        );
        if let Some(cache) = self.cache_control {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));
        }
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            headers.insert(header::LOCATION, location);
        }
        Ok(response)
    }
}

pub fn format_resource(resource: &JsonValue, negotiation: &ContentNegotiation) -> Result<Vec<u8>> {
    match negotiation.format {
        ContentFormat::Json if negotiation.pretty => Ok(serde_json::to_vec_pretty(resource)?),
        ContentFormat::Json => Ok(serde_json::to_vec(resource)?),
        ContentFormat::Xml => Ok(ayush_fhir_format::value_to_xml(resource)?.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn negotiation(format: ContentFormat, pretty: bool) -> ContentNegotiation {
        ContentNegotiation { format, pretty }
    }

    #[test]
    fn json_is_compact_unless_pretty() {
        let resource = json!({ "resourceType": "ValueSet", "id": "namaste-valueset" });
        let compact = format_resource(&resource, &negotiation(ContentFormat::Json, false)).unwrap();
        assert!(!compact.contains(&b'\n'));
        let pretty = format_resource(&resource, &negotiation(ContentFormat::Json, true)).unwrap();
        assert!(pretty.contains(&b'\n'));
        let parsed: JsonValue = serde_json::from_slice(&pretty).unwrap();
        assert_eq!(parsed, resource);
    }

    #[test]
    fn xml_rendering_uses_resource_root() {
        let resource = json!({ "resourceType": "CodeSystem", "id": "namaste-codes" });
        let xml = format_resource(&resource, &negotiation(ContentFormat::Xml, false)).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains("<CodeSystem"));
        assert!(xml.contains("namaste-codes"));
    }

    #[test]
    fn render_sets_headers() {
        let response = FhirResponse::created(json!({ "resourceType": "Condition" }), "/fhir/Condition/c1".to_string())
            .cache_control(CACHE_NO_CACHE)
            .render(&ContentNegotiation::default())
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/fhir/Condition/c1");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/fhir+json; charset=utf-8"
        );
    }
}
