//! FHIR `Parameters` resource used by the operation endpoints

use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;

/// A single `Parameters.parameter` entry
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// `value[x]` keyed by its JSON property name, e.g. `valueCode`
    Value(HashMap<String, JsonValue>),
    Resource(JsonValue),
    Parts(Vec<Parameter>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    pub parameter: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Parameters` resource body. Unknown properties are ignored.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("resourceType").and_then(|v| v.as_str()) != Some("Parameters") {
            return None;
        }
        let parameter = obj
            .get("parameter")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(parse_parameter).collect())
            .unwrap_or_default();
        Some(Self { parameter })
    }

    /// Build from URL query pairs; each value becomes a `valueString`
    pub fn from_query(pairs: &[(String, String)]) -> Self {
        let parameter = pairs
            .iter()
            .map(|(name, value)| Parameter {
                name: name.clone(),
                value: ParameterValue::Value(HashMap::from([(
                    "valueString".to_string(),
                    JsonValue::String(value.clone()),
                )])),
            })
            .collect();
        Self { parameter }
    }

    /// First `value[x]` of the named parameter
    pub fn get_value(&self, name: &str) -> Option<&JsonValue> {
        self.parameter
            .iter()
            .filter(|p| p.name == name)
            .find_map(|p| match &p.value {
                ParameterValue::Value(map) => map.values().next(),
                _ => None,
            })
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_value(name).and_then(|v| v.as_str())
    }

    /// Boolean parameter, accepting the string form used by query parameters
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get_value(name)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn add_value(&mut self, name: impl Into<String>, key: &str, value: JsonValue) {
        self.parameter.push(Parameter {
            name: name.into(),
            value: ParameterValue::Value(HashMap::from([(key.to_string(), value)])),
        });
    }

    pub fn add_value_boolean(&mut self, name: impl Into<String>, value: bool) {
        self.add_value(name, "valueBoolean", JsonValue::Bool(value));
    }

    pub fn add_value_code(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add_value(name, "valueCode", JsonValue::String(value.into()));
    }

    pub fn add_value_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.add_value(name, "valueString", JsonValue::String(value.into()));
    }

    pub fn add_parts(&mut self, name: impl Into<String>, parts: Vec<Parameter>) {
        self.parameter.push(Parameter {
            name: name.into(),
            value: ParameterValue::Parts(parts),
        });
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "resourceType": "Parameters",
            "parameter": self.parameter.iter().map(parameter_to_json).collect::<Vec<_>>()
        })
    }
}

fn parameter_to_json(p: &Parameter) -> JsonValue {
    let mut obj = Map::new();
    obj.insert("name".to_string(), JsonValue::String(p.name.clone()));
    match &p.value {
        ParameterValue::Value(map) => {
            for (k, v) in map {
                obj.insert(k.clone(), v.clone());
            }
        }
        ParameterValue::Resource(resource) => {
            obj.insert("resource".to_string(), resource.clone());
        }
        ParameterValue::Parts(parts) => {
            obj.insert(
                "part".to_string(),
                JsonValue::Array(parts.iter().map(parameter_to_json).collect()),
            );
        }
    }
    JsonValue::Object(obj)
}

fn parse_parameter(value: &JsonValue) -> Option<Parameter> {
    let obj = value.as_object()?;
    let name = obj.get("name")?.as_str()?.to_string();

    if let Some(parts) = obj.get("part").and_then(|v| v.as_array()) {
        return Some(Parameter {
            name,
            value: ParameterValue::Parts(parts.iter().filter_map(parse_parameter).collect()),
        });
    }
    if let Some(resource) = obj.get("resource") {
        return Some(Parameter {
            name,
            value: ParameterValue::Resource(resource.clone()),
        });
    }
    let (key, v) = obj.iter().find(|(k, _)| k.starts_with("value"))?;
    Some(Parameter {
        name,
        value: ParameterValue::Value(HashMap::from([(key.clone(), v.clone())])),
    })
}
