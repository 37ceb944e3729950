use ayush_fhir_format::{json_to_xml, value_to_xml, FormatError};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};

/// Element names in document order, plus the `value` attribute of empty elements
fn walk(xml: &str) -> Vec<(String, Option<String>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut out = Vec::new();
    loop {
        match reader.read_event().expect("well-formed XML") {
            Event::Start(e) => {
                out.push((String::from_utf8_lossy(e.name().as_ref()).into_owned(), None));
            }
            Event::Empty(e) => {
                let value = e
                    .try_get_attribute("value")
                    .expect("attribute parse")
                    .map(|a| a.unescape_value().expect("unescape").into_owned());
                out.push((String::from_utf8_lossy(e.name().as_ref()).into_owned(), value));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    out
}

fn values_of<'a>(walked: &'a [(String, Option<String>)], name: &str) -> Vec<&'a str> {
    walked
        .iter()
        .filter(|(n, _)| n == name)
        .filter_map(|(_, v)| v.as_deref())
        .collect()
}

fn concept_map() -> Value {
    json!({
        "resourceType": "ConceptMap",
        "id": "namaste-to-icd11",
        "status": "active",
        "sourceUri": "http://terminology.ayush.gov.in/CodeSystem/namaste",
        "group": [
            {
                "source": "http://terminology.ayush.gov.in/CodeSystem/namaste",
                "target": "http://id.who.int/icd11/tm2",
                "element": [{
                    "code": "AY001",
                    "target": [{ "code": "TM2-SM01", "equivalence": "equivalent" }]
                }]
            },
            {
                "source": "http://terminology.ayush.gov.in/CodeSystem/namaste",
                "target": "http://id.who.int/icd11/mms"
            }
        ]
    })
}

#[test]
fn concept_map_groups_become_repeated_elements() {
    let xml = value_to_xml(&concept_map()).unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));

    let walked = walk(&xml);
    assert_eq!(walked[0].0, "ConceptMap");
    assert_eq!(walked.iter().filter(|(n, _)| n == "group").count(), 2);
    assert_eq!(
        values_of(&walked, "target"),
        vec!["http://id.who.int/icd11/tm2", "http://id.who.int/icd11/mms"]
    );
    assert_eq!(values_of(&walked, "code"), vec!["AY001", "TM2-SM01"]);
    assert_eq!(values_of(&walked, "equivalence"), vec!["equivalent"]);
}

#[test]
fn bundle_entries_wrap_contained_resources() {
    let bundle = json!({
        "resourceType": "Bundle",
        "id": "processed-enc-1",
        "type": "collection",
        "entry": [
            { "resource": { "resourceType": "Patient", "id": "p-1" } },
            { "resource": {
                "resourceType": "Condition",
                "id": "c-1",
                "code": { "coding": [
                    { "system": "http://terminology.ayush.gov.in/CodeSystem/namaste", "code": "AY001" },
                    { "system": "http://id.who.int/icd11/tm2", "code": "TM2-SM01" }
                ]},
                "subject": { "reference": "Patient/p-1" }
            }}
        ]
    });

    let xml = value_to_xml(&bundle).unwrap();
    assert_eq!(xml.matches("xmlns=").count(), 1);

    let walked = walk(&xml);
    let names: Vec<&str> = walked.iter().map(|(n, _)| n.as_str()).collect();
    let patient = names.iter().position(|n| *n == "Patient").unwrap();
    let condition = names.iter().position(|n| *n == "Condition").unwrap();
    assert_eq!(names[patient - 1], "resource");
    assert_eq!(names[condition - 1], "resource");
    assert!(patient < condition);
    assert_eq!(names.iter().filter(|n| **n == "coding").count(), 2);
}

#[test]
fn parameters_keep_typed_values() {
    let params = json!({
        "resourceType": "Parameters",
        "parameter": [
            { "name": "result", "valueBoolean": false },
            { "name": "message", "valueString": "No mappings found for code AY404 & system" }
        ]
    });

    let xml = json_to_xml(&params.to_string()).unwrap();
    let walked = walk(&xml);
    assert_eq!(values_of(&walked, "valueBoolean"), vec!["false"]);
    assert_eq!(
        values_of(&walked, "valueString"),
        vec!["No mappings found for code AY404 & system"]
    );
    assert!(xml.contains("&amp;"));
}

#[test]
fn nulls_and_underscored_keys_are_dropped() {
    let value_set = json!({
        "resourceType": "ValueSet",
        "id": "namaste-valueset",
        "title": null,
        "_status": { "extension": [] },
        "status": "active"
    });

    let walked = walk(&value_to_xml(&value_set).unwrap());
    let names: Vec<&str> = walked.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["ValueSet", "id", "status"]);
}

#[test]
fn malformed_input_is_reported() {
    assert!(matches!(json_to_xml("{"), Err(FormatError::Json(_))));
    assert!(matches!(
        json_to_xml(r#""CodeSystem""#),
        Err(FormatError::ExpectedObject)
    ));
}
