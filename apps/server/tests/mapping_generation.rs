//! Automatic mapping generation from NAMASTE cross-references

mod support;

use axum::http::{Method, StatusCode};
use ayush_terminology::{
    models::{Equivalence, NewMapping},
    services::GenerationStatus,
};
use serde_json::json;
use support::{assert_status, constants, seed_catalogs, TestApp};

#[tokio::test]
async fn generation_reports_scanned_and_created() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    seed_catalogs(&app.state).await?;

    let report = app.state.generator.generate().await;
    assert_eq!(report.status, GenerationStatus::Success);
    assert_eq!(report.processed, 4);
    assert_eq!(report.created, 3);

    let tm2 = app
        .state
        .mappings
        .find_by_source_and_target_system("AY001", constants::NAMASTE_SYSTEM, constants::TM2_SYSTEM)
        .await?
        .expect("TM2 mapping for AY001");
    assert_eq!(tm2.target_code, "TM2-SM01");
    assert_eq!(tm2.equivalence, Equivalence::Equivalent);

    let bio = app
        .state
        .mappings
        .find_by_source_and_target_system(
            "AY001",
            constants::NAMASTE_SYSTEM,
            constants::BIOMEDICINE_SYSTEM,
        )
        .await?
        .expect("Biomedicine mapping for AY001");
    assert_eq!(bio.target_code, "1D01");
    assert_eq!(bio.equivalence, Equivalence::RelatedTo);
    Ok(())
}

#[tokio::test]
async fn rerun_creates_nothing() -> anyhow::Result<()> {
    let app = TestApp::seeded().await?;
    let report = app.state.generator.generate().await;
    assert_eq!(report.status, GenerationStatus::Success);
    assert_eq!(report.processed, 4);
    assert_eq!(report.created, 0);
    assert_eq!(app.state.mappings.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn existing_mapping_for_target_system_is_kept() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    seed_catalogs(&app.state).await?;
    app.state
        .mappings
        .create(
            NewMapping::new(
                "SD001",
                constants::NAMASTE_SYSTEM,
                "TM2-SM01",
                constants::TM2_SYSTEM,
                Equivalence::Narrower,
            )
            .with_comment(Some("curated".to_string())),
        )
        .await?;

    let report = app.state.generator.generate().await;
    assert_eq!(report.created, 2);

    let sd001 = app
        .state
        .mappings
        .find_by_source("SD001", constants::NAMASTE_SYSTEM)
        .await?;
    assert_eq!(sd001.len(), 1);
    assert_eq!(sd001[0].target_code, "TM2-SM01");
    assert_eq!(sd001[0].equivalence, Equivalence::Narrower);
    Ok(())
}

#[tokio::test]
async fn empty_catalog_is_a_successful_noop() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let report = app.state.generator.generate().await;
    assert_eq!(report.status, GenerationStatus::Success);
    assert_eq!(report.processed, 0);
    assert_eq!(report.created, 0);
    Ok(())
}

#[tokio::test]
async fn admin_trigger_populates_concept_map() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    seed_catalogs(&app.state).await?;

    let (status, _, body) = app
        .request(Method::POST, "/api/terminology/admin/generate-mappings", None)
        .await?;
    assert_status(status, StatusCode::OK, "generate mappings");
    assert_eq!(&body[..], b"Automatic mapping generation initiated");

    let (status, _, concept_map) = app.get_json("/fhir/ConceptMap/namaste-to-icd11").await?;
    assert_status(status, StatusCode::OK, "concept map");

    let tm2 = &concept_map["group"][0];
    assert_eq!(tm2["target"], constants::TM2_SYSTEM);
    assert_eq!(
        tm2["element"],
        json!([
            { "code": "AY001", "target": [{ "code": "TM2-SM01", "equivalence": "equivalent" }] },
            { "code": "SD001", "target": [{ "code": "TM2-SS01", "equivalence": "equivalent" }] }
        ])
    );

    let bio = &concept_map["group"][1];
    assert_eq!(bio["target"], constants::BIOMEDICINE_SYSTEM);
    assert_eq!(
        bio["element"],
        json!([{ "code": "AY001", "target": [{ "code": "1D01", "equivalence": "relatedto" }] }])
    );
    Ok(())
}
