//! Parse phase: JSON or YAML text → `WorkflowDoc`.
//!
//! Both the flat document shape (`{metadata, entrypoint, templates, ...}`)
//! and the Kubernetes manifest shape (`{apiVersion, kind, metadata, spec}`)
//! are accepted. In manifest form the `spec` fields are hoisted next to
//! `metadata`.

pub mod types;

pub use types::*;

use serde_json::{Map, Value};

use crate::error::ParseError;

/// Deserialize a workflow from JSON text.
pub fn parse_json(json: &str) -> Result<WorkflowDoc, ParseError> {
    let value: Value = serde_json::from_str(json)?;
    from_value(value)
}

/// Deserialize a workflow from YAML text.
pub fn parse_yaml(yaml: &str) -> Result<WorkflowDoc, ParseError> {
    let value: Value = serde_yaml::from_str(yaml)?;
    from_value(value)
}

/// Deserialize a workflow from an already-parsed JSON tree.
pub fn from_value(value: Value) -> Result<WorkflowDoc, ParseError> {
    let Value::Object(root) = value else {
        return Err(ParseError::NotAnObject(kind_name(&value)));
    };
    let flat = hoist_spec(root);
    Ok(serde_json::from_value(Value::Object(flat))?)
}

fn hoist_spec(mut root: Map<String, Value>) -> Map<String, Value> {
    let Some(Value::Object(spec)) = root.remove("spec") else {
        return root;
    };
    let mut flat = Map::new();
    if let Some(metadata) = root.remove("metadata") {
        flat.insert("metadata".into(), metadata);
    }
    flat.extend(spec);
    flat
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
