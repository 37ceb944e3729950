//! FHIR JSON → XML serialization.
//!
//! Schema-agnostic writer following the HL7 JSON/XML mapping rules that matter
//! for the resources this workspace generates:
//! - Root element uses the `resourceType` name in the FHIR namespace.
//! - Primitive values are encoded with the `value` attribute.
//! - Arrays are represented by repeated elements.
//! - Contained resources (`Bundle.entry.resource`) are wrapped in an element
//!   named after their `resourceType`.
//! - `id` is an element on resources and an attribute on data types.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde_json::{Map, Value};
use std::io::Cursor;
use thiserror::Error;

const FHIR_NS: &str = "http://hl7.org/fhir";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected a JSON object for the resource")]
    ExpectedObject,
    #[error("missing resourceType property")]
    MissingResourceType,
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Convert a FHIR JSON payload into its XML representation.
pub fn json_to_xml(input: &str) -> Result<String, FormatError> {
    let value: Value = serde_json::from_str(input)?;
    value_to_xml(&value)
}

/// Convert an already-parsed FHIR JSON resource into XML.
pub fn value_to_xml(value: &Value) -> Result<String, FormatError> {
    let obj = value.as_object().ok_or(FormatError::ExpectedObject)?;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_resource(&mut writer, obj, true)?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_resource(
    writer: &mut XmlWriter,
    obj: &Map<String, Value>,
    root: bool,
) -> Result<(), FormatError> {
    let resource_type = obj
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(FormatError::MissingResourceType)?;

    let mut start = BytesStart::new(resource_type);
    if root {
        start.push_attribute(("xmlns", FHIR_NS));
    }
    writer.write_event(Event::Start(start))?;

    // Resource ids are ordinary primitive elements, unlike data type ids.
    if let Some(id) = obj.get("id") {
        write_primitive(writer, "id", id)?;
    }
    for (k, v) in obj {
        if k == "resourceType" || k == "id" || k.starts_with('_') {
            continue;
        }
        write_json_value(writer, k, v)?;
    }

    writer.write_event(Event::End(BytesEnd::new(resource_type)))?;
    Ok(())
}

fn write_json_value(writer: &mut XmlWriter, name: &str, value: &Value) -> Result<(), FormatError> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_json_value(writer, name, item)?;
            }
        }
        Value::Object(obj) if obj.contains_key("resourceType") => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            write_resource(writer, obj, false)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Value::Object(obj) => write_complex(writer, name, obj)?,
        Value::Null => {}
        primitive => write_primitive(writer, name, primitive)?,
    }
    Ok(())
}

fn write_complex(
    writer: &mut XmlWriter,
    name: &str,
    obj: &Map<String, Value>,
) -> Result<(), FormatError> {
    let mut start = BytesStart::new(name);
    if let Some(Value::String(id)) = obj.get("id") {
        start.push_attribute(("id", id.as_str()));
    }

    writer.write_event(Event::Start(start))?;
    for (k, v) in obj {
        if k.starts_with('_') || k == "id" {
            continue;
        }
        write_json_value(writer, k, v)?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_primitive(writer: &mut XmlWriter, name: &str, value: &Value) -> Result<(), FormatError> {
    if value.is_null() {
        return Ok(());
    }
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("value", primitive_to_string(value).as_str()));
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

fn primitive_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
