//! FHIR resource endpoints under /fhir
//!
//! Covers CodeSystem, ConceptMap, ValueSet, CapabilityStatement, $translate,
//! Condition creation, Bundle upload and content negotiation.

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::{
    assert_header, assert_outcome_error, assert_resource_type, assert_status, condition_codings,
    constants, to_json_body, translate_matches, TestApp,
};

#[tokio::test]
async fn capability_statement_is_not_cached() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (status, headers, body) = app.get_json("/fhir/metadata").await?;

    assert_status(status, StatusCode::OK, "metadata");
    assert_resource_type(&body, "CapabilityStatement");
    assert_header(&headers, "cache-control", "no-cache");
    assert_header(&headers, "content-type", "application/fhir+json; charset=utf-8");
    assert_eq!(body["fhirVersion"], "4.0.1");
    Ok(())
}

#[tokio::test]
async fn code_system_lists_every_namaste_code() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let (status, headers, body) = app.get_json("/fhir/CodeSystem/namaste-codes").await?;

    assert_status(status, StatusCode::OK, "code system");
    assert_resource_type(&body, "CodeSystem");
    assert_header(&headers, "cache-control", "max-age=3600");
    assert_eq!(body["url"], constants::NAMASTE_SYSTEM);
    assert_eq!(body["content"], "complete");
    assert_eq!(body["count"], 4);

    let concepts = body["concept"].as_array().unwrap();
    let ay001 = concepts.iter().find(|c| c["code"] == "AY001").unwrap();
    assert_eq!(ay001["display"], "Vataja Jwara");
    let props: Vec<_> = ay001["property"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(props, vec!["system", "category", "who-terminology"]);
    Ok(())
}

#[tokio::test]
async fn concept_map_groups_by_target_system() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let (status, headers, body) = app.get_json("/fhir/ConceptMap/namaste-to-icd11").await?;

    assert_status(status, StatusCode::OK, "concept map");
    assert_header(&headers, "cache-control", "max-age=1800");
    assert_resource_type(&body, "ConceptMap");

    let groups = body["group"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["target"], constants::TM2_SYSTEM);
    assert_eq!(groups[1]["target"], constants::BIOMEDICINE_SYSTEM);

    let tm2_sources: Vec<_> = groups[0]["element"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["code"].as_str().unwrap())
        .collect();
    assert_eq!(tm2_sources, vec!["AY001", "SD001"]);
    assert_eq!(groups[0]["element"][0]["target"][0]["equivalence"], "equivalent");
    assert_eq!(groups[1]["element"][0]["target"][0]["code"], "1D01");
    assert_eq!(groups[1]["element"][0]["target"][0]["equivalence"], "relatedto");
    Ok(())
}

#[tokio::test]
async fn value_set_filters_follow_query() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;

    let (_, _, plain) = app.get_json("/fhir/ValueSet/namaste").await?;
    assert!(plain["compose"]["include"][0].get("filter").is_none());

    let (status, _, filtered) = app
        .get_json("/fhir/ValueSet/namaste?filter=jwara&system=siddha")
        .await?;
    assert_status(status, StatusCode::OK, "value set");
    let filters = filtered["compose"]["include"][0]["filter"].as_array().unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0]["value"], ".*jwara.*");
    assert_eq!(filters[1]["value"], "SIDDHA");

    let (status, _, _) = app.get_json("/fhir/ValueSet/namaste?system=homeopathy").await?;
    assert_status(status, StatusCode::BAD_REQUEST, "unknown system");
    Ok(())
}

#[tokio::test]
async fn translate_forward_and_reverse() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;

    let (status, _, body) = app
        .get_json("/fhir/ConceptMap/namaste-to-icd11/$translate?code=AY001")
        .await?;
    assert_status(status, StatusCode::OK, "translate");
    assert_resource_type(&body, "Parameters");
    assert_eq!(body["parameter"][0]["name"], "result");
    assert_eq!(body["parameter"][0]["valueBoolean"], true);
    let matches = translate_matches(&body);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["part"][1]["valueCoding"]["code"], "TM2-SM01");
    assert_eq!(matches[0]["part"][1]["valueCoding"]["display"], "Vata pattern fever");

    let reverse = format!(
        "/fhir/ConceptMap/namaste-to-icd11/$translate?code=TM2-SM01&system={}",
        urlencoding::encode(constants::TM2_SYSTEM)
    );
    let (_, _, body) = app.get_json(&reverse).await?;
    let matches = translate_matches(&body);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["part"][1]["valueCoding"]["code"], "AY001");
    Ok(())
}

#[tokio::test]
async fn translate_post_accepts_parameters_body() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let params = json!({
        "resourceType": "Parameters",
        "parameter": [
            { "name": "code", "valueCode": "AY001" },
            { "name": "targetsystem", "valueUri": constants::BIOMEDICINE_SYSTEM }
        ]
    });
    let (status, _, body) = app
        .post_json("/fhir/ConceptMap/namaste-to-icd11/$translate", &params)
        .await?;
    assert_status(status, StatusCode::OK, "translate POST");
    let matches = translate_matches(&body);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["part"][0]["valueCode"], "relatedto");
    assert_eq!(matches[0]["part"][1]["valueCoding"]["code"], "1D01");

    let (status, _, body) = app
        .post_json("/fhir/ConceptMap/namaste-to-icd11/$translate", &json!({ "resourceType": "Parameters" }))
        .await?;
    assert_status(status, StatusCode::BAD_REQUEST, "missing code");
    assert!(assert_outcome_error(&body)?.contains("code"));
    Ok(())
}

#[tokio::test]
async fn translate_without_mappings_reports_no_result() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let (_, _, body) = app
        .get_json("/fhir/ConceptMap/namaste-to-icd11/$translate?code=UN001")
        .await?;
    assert_eq!(body["parameter"][0]["valueBoolean"], false);
    assert!(translate_matches(&body).is_empty());
    Ok(())
}

#[tokio::test]
async fn condition_create_returns_location_and_dual_coding() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let (status, headers, body) = app
        .post_json(
            "/fhir/Condition",
            &json!({ "namasteCode": "AY001", "patientId": "14-1234-5678-9012" }),
        )
        .await?;

    assert_status(status, StatusCode::CREATED, "create condition");
    assert_resource_type(&body, "Condition");
    let id = body["id"].as_str().unwrap();
    assert!(id.starts_with("condition-"));
    assert_header(&headers, "location", &format!("/fhir/Condition/{}", id));
    assert_eq!(body["subject"]["reference"], "Patient/14-1234-5678-9012");
    assert_eq!(body["clinicalStatus"]["coding"][0]["code"], "active");
    assert_eq!(body["verificationStatus"]["coding"][0]["code"], "confirmed");

    assert_eq!(
        condition_codings(&body),
        vec![
            (constants::NAMASTE_SYSTEM.to_string(), "AY001".to_string()),
            (constants::TM2_SYSTEM.to_string(), "TM2-SM01".to_string()),
            (constants::BIOMEDICINE_SYSTEM.to_string(), "1D01".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn condition_create_rejects_blank_fields() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let (status, _, body) = app
        .post_json("/fhir/Condition", &json!({ "namasteCode": "", "patientId": "p1" }))
        .await?;
    assert_status(status, StatusCode::BAD_REQUEST, "blank code");
    assert_outcome_error(&body)?;
    Ok(())
}

#[tokio::test]
async fn bundle_upload_counts_entries() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            { "resource": { "resourceType": "Patient", "id": "p1" } },
            { "resource": { "resourceType": "Condition", "id": "c1" } }
        ]
    });
    let (status, _, body) = app.post_json("/fhir/Bundle", &bundle).await?;
    assert_status(status, StatusCode::OK, "bundle");
    assert_resource_type(&body, "OperationOutcome");
    assert_eq!(body["id"], "bundle-processing-result");
    assert_eq!(
        body["issue"][0]["diagnostics"],
        "Bundle processed successfully with 2 entries"
    );

    let (status, _, _) = app
        .post_json("/fhir/Bundle", &json!({ "resourceType": "Patient" }))
        .await?;
    assert_status(status, StatusCode::BAD_REQUEST, "not a bundle");
    Ok(())
}

#[tokio::test]
async fn xml_format_and_unsupported_formats() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;

    let (status, headers, body) = app
        .request(Method::GET, "/fhir/CodeSystem/namaste-codes?_format=xml", None)
        .await?;
    assert_status(status, StatusCode::OK, "xml");
    assert_header(&headers, "content-type", "application/fhir+xml; charset=utf-8");
    let xml = String::from_utf8(body.to_vec())?;
    assert!(xml.contains("<CodeSystem"));
    assert!(xml.contains("AY001"));

    let (status, _, _) = app
        .request(Method::GET, "/fhir/metadata?_format=turtle", None)
        .await?;
    assert_status(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "turtle");

    let (status, _, _) = app
        .request_with_extra_headers(
            Method::POST,
            "/fhir/Bundle",
            Some(to_json_body(&json!({}))?),
            &[("content-type", "application/fhir+xml")],
        )
        .await?;
    assert_status(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "xml body");
    Ok(())
}

#[tokio::test]
async fn responses_carry_request_id() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (_, headers, _) = app
        .request_with_extra_headers(Method::GET, "/health", None, &[("x-request-id", "client-1")])
        .await?;
    assert!(headers.get("x-request-id").is_some());
    assert_header(&headers, "x-correlation-id", "client-1");
    assert_header(&headers, "x-content-type-options", "nosniff");
    Ok(())
}
