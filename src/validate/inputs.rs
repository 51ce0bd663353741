//! Arguments, template inputs, loop items, and call-site argument binding.

use serde_json::Value;

use super::Validator;
use super::artifacts;
use super::names::{self, Grammar};
use super::scope::{ANY_ITEM, Scope};
use super::variables;
use crate::parse::types::{
    Arguments, Artifact, LoopSpec, Parameter, Template, TemplateKind, ValueSource,
};

/// Arguments presented at a call site.
#[derive(Debug, Clone, Copy)]
pub enum CallArgs<'c> {
    Supplied(&'c Arguments),
    /// Validation without a concrete caller; every input counts as supplied.
    Any,
}

const ARGUMENT_SOURCES: [ValueSource; 3] = [
    ValueSource::ConfigMapKeyRef,
    ValueSource::Event,
    ValueSource::Supplied,
];

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Validate an argument bag: names, then values. `allow_empty` permits
/// parameters with neither `value` nor `valueFrom` (lint mode).
pub(crate) fn validate_arguments(
    v: &mut Validator<'_>,
    path: &str,
    field: &str,
    args: &Arguments,
    allow_empty: bool,
) {
    if let Some(msg) = names::check_names(args.parameters.iter().map(|p| p.name.as_str()), Grammar::Param) {
        v.bad_request(path, &format!("{}.parameters", field), msg);
    }
    if let Some(msg) = names::check_names(args.artifacts.iter().map(|a| a.name.as_str()), Grammar::Param) {
        v.bad_request(path, &format!("{}.artifacts", field), msg);
    }

    for p in &args.parameters {
        let pfield = format!("{}.parameters.{}", field, p.name);
        check_argument_value(v, path, &pfield, p, allow_empty);
    }

    for a in &args.artifacts {
        let afield = format!("{}.artifacts.{}", field, a.name);
        let has_from = a.from.as_deref().is_some_and(|f| !f.is_empty());
        if !has_from && !a.location.has_location() {
            v.bad_request(path, &afield, "from, artifact location, or key is required");
        }
        check_location(v, path, &afield, a);
    }
}

fn check_argument_value(
    v: &mut Validator<'_>,
    path: &str,
    field: &str,
    p: &Parameter,
    allow_empty: bool,
) {
    match (&p.value, &p.value_from) {
        (None, None) if !allow_empty => {
            v.bad_request(path, field, "value or valueFrom is required");
        }
        (Some(_), Some(_)) => {
            v.bad_request(path, field, "value and valueFrom cannot both be set");
        }
        (_, Some(vf)) => {
            let sources = vf.sources();
            if sources.iter().any(|s| !ARGUMENT_SOURCES.contains(s)) {
                v.bad_request(
                    path,
                    &format!("{}.valueFrom", field),
                    "valueFrom only allows: configMapKeyRef, event and supplied",
                );
            }
        }
        _ => {}
    }

    if let Some(allowed) = &p.enum_values {
        if allowed.is_empty() {
            v.bad_request(path, &format!("{}.enum", field), "enum should contain at least one value");
        } else if let Some(value) = &p.value {
            if !value.as_str().contains("{{") && !allowed.contains(value) {
                v.bad_request(
                    path,
                    field,
                    format!("value '{}' is not in the enum list", value),
                );
            }
        }
    }
}

fn check_location(v: &mut Validator<'_>, path: &str, field: &str, a: &Artifact) {
    for issue in artifacts::check_location(&a.location) {
        let f = if issue.field.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", field, issue.field)
        };
        v.bad_request(path, &f, issue.message);
    }
}

// ---------------------------------------------------------------------------
// Template inputs
// ---------------------------------------------------------------------------

/// Names, enums and artifact rules of a template's declared inputs.
pub(crate) fn validate_inputs(v: &mut Validator<'_>, tmpl: &Template, kind: TemplateKind, path: &str) {
    let inputs = &tmpl.inputs;
    if let Some(msg) = names::check_names(inputs.parameters.iter().map(|p| p.name.as_str()), Grammar::Param) {
        v.bad_request(path, "inputs.parameters", msg);
    }
    if let Some(msg) = names::check_names(inputs.artifacts.iter().map(|a| a.name.as_str()), Grammar::Param) {
        v.bad_request(path, "inputs.artifacts", msg);
    }

    for p in &inputs.parameters {
        let Some(allowed) = &p.enum_values else {
            continue;
        };
        let field = format!("inputs.parameters.{}", p.name);
        if allowed.is_empty() {
            v.bad_request(path, &format!("{}.enum", field), "enum should contain at least one value");
            continue;
        }
        for candidate in [&p.value, &p.default].into_iter().flatten() {
            if !candidate.as_str().contains("{{") && !allowed.contains(candidate) {
                v.bad_request(path, &field, format!("value '{}' is not in the enum list", candidate));
            }
        }
    }

    for a in &inputs.artifacts {
        let field = format!("inputs.artifacts.{}", a.name);
        if a.from.as_deref().is_some_and(|f| !f.is_empty()) {
            v.bad_request(path, &format!("{}.from", field), "from not valid in inputs");
        }
        let has_path = a.path.as_deref().is_some_and(|p| !p.is_empty());
        if kind.is_leaf() && !has_path {
            v.bad_request(path, &format!("{}.path", field), "path not specified");
        }
        if !kind.is_leaf() && has_path {
            v.bad_request(
                path,
                &format!("{}.path", field),
                "path only valid in container/script templates",
            );
        }
        check_location(v, path, &field, a);
    }
}

/// The local scope of a template body: its inputs and the runtime
/// variables its kind provides.
pub(crate) fn template_scope(tmpl: &Template, kind: TemplateKind) -> Scope {
    let mut scope = Scope::new();

    if !tmpl.inputs.parameters.is_empty() {
        scope.insert("inputs.parameters");
    }
    for p in &tmpl.inputs.parameters {
        let key = format!("inputs.parameters.{}", p.name);
        match p.value.as_ref().or(p.default.as_ref()) {
            Some(v) => scope.insert_literal(key, v.as_str()),
            None => scope.insert(key),
        }
    }
    for a in &tmpl.inputs.artifacts {
        scope.insert(format!("inputs.artifacts.{}", a.name));
        if kind.is_leaf() {
            scope.insert(format!("inputs.artifacts.{}.path", a.name));
        }
    }

    if kind.runs_pod() {
        scope.insert("pod.name");
    }
    if tmpl.retry_strategy.is_some() {
        for key in [
            "retries",
            "lastRetry.exitCode",
            "lastRetry.status",
            "lastRetry.duration",
            "lastRetry.message",
        ] {
            scope.insert(key);
        }
    }
    if kind.is_leaf() {
        for a in &tmpl.outputs.artifacts {
            scope.insert(format!("outputs.artifacts.{}.path", a.name));
        }
        for p in &tmpl.outputs.parameters {
            scope.insert(format!("outputs.parameters.{}.path", p.name));
        }
    }
    scope
}

// ---------------------------------------------------------------------------
// Loop items
// ---------------------------------------------------------------------------

/// Add the `item` variables a loop binds.
pub(crate) fn add_items_to_scope(spec: LoopSpec<'_>, scope: &mut Scope) -> Result<(), String> {
    let items = spec.with_items.filter(|i| !i.is_empty());
    let param = spec.with_param.filter(|p| !p.is_empty());
    let defined = [items.is_some(), param.is_some(), spec.with_sequence.is_some()]
        .into_iter()
        .filter(|d| *d)
        .count();
    if defined > 1 {
        return Err("only one of withItems, withParam, withSequence can be specified".into());
    }

    if let Some(items) = items {
        for item in items {
            match item {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => scope.insert("item"),
                Value::Array(list) => {
                    for i in 0..list.len() {
                        scope.insert(format!("item.[{}]", i));
                    }
                }
                Value::Object(map) => {
                    for key in map.keys() {
                        scope.insert(format!("item.{}", key));
                    }
                }
                Value::Null => return Err("unsupported withItems type: null".into()),
            }
        }
    } else if param.is_some() {
        scope.insert("item");
        scope.insert(ANY_ITEM);
    } else if let Some(seq) = spec.with_sequence {
        if seq.count.is_some() && seq.end.is_some() {
            return Err("only one of count or end can be defined in withSequence".into());
        }
        scope.insert("item");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Argument binding
// ---------------------------------------------------------------------------

/// Check that a call site supplies every input the callee cannot default.
///
/// `relax` accepts parameters that are named by the caller without a value,
/// which lint mode allows for the top-level arguments.
pub(crate) fn bind_arguments(
    v: &mut Validator<'_>,
    path: &str,
    field: &str,
    callee: &Template,
    args: CallArgs<'_>,
    relax: bool,
) {
    let CallArgs::Supplied(args) = args else {
        return;
    };

    for input in &callee.inputs.parameters {
        let supplied = args.parameter(&input.name);
        let has_value = supplied.is_some_and(|s| relax || s.value.is_some() || s.value_from.is_some());
        let has_default =
            input.value.is_some() || input.default.is_some() || input.value_from.is_some();
        if !has_value && !has_default {
            v.bad_request(
                path,
                field,
                format!("inputs.parameters.{} was not supplied", input.name),
            );
            continue;
        }

        let (Some(allowed), Some(value)) = (&input.enum_values, supplied.and_then(|s| s.value.as_ref())) else {
            continue;
        };
        if !allowed.is_empty() && !variables::is_reference(value.as_str()) && !allowed.contains(value) {
            v.bad_request(
                path,
                field,
                format!(
                    "value '{}' for inputs.parameters.{} is not in the enum list",
                    value, input.name
                ),
            );
        }
    }

    for input in &callee.inputs.artifacts {
        if input.optional || input.location.has_location() {
            continue;
        }
        if args.artifact(&input.name).is_none() {
            v.bad_request(
                path,
                field,
                format!("inputs.artifacts.{} was not supplied", input.name),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::Sequence;
    use serde_json::json;

    #[test]
    fn items_shapes() {
        let items = vec![json!({"os": "linux", "arch": "amd64"}), json!(["a", "b"]), json!(3)];
        let mut scope = Scope::new();
        add_items_to_scope(
            LoopSpec {
                with_items: Some(items.as_slice()),
                ..Default::default()
            },
            &mut scope,
        )
        .unwrap();
        for key in ["item.os", "item.arch", "item.[0]", "item.[1]", "item"] {
            assert!(scope.contains(key), "missing {}", key);
        }
        assert!(!scope.contains(ANY_ITEM));
    }

    #[test]
    fn with_param_adds_magic_item() {
        let mut scope = Scope::new();
        add_items_to_scope(
            LoopSpec {
                with_param: Some("{{inputs.parameters.list}}"),
                ..Default::default()
            },
            &mut scope,
        )
        .unwrap();
        assert!(scope.contains("item"));
        assert!(scope.contains(ANY_ITEM));
    }

    #[test]
    fn loop_conflicts() {
        let items = vec![json!(1)];
        let seq = Sequence {
            count: Some(crate::parse::types::IntOrString::Int(3)),
            end: Some(crate::parse::types::IntOrString::Int(5)),
            ..Default::default()
        };
        let mut scope = Scope::new();
        assert_eq!(
            add_items_to_scope(
                LoopSpec {
                    with_items: Some(items.as_slice()),
                    with_param: Some("x"),
                    with_sequence: None,
                },
                &mut scope,
            ),
            Err("only one of withItems, withParam, withSequence can be specified".to_string())
        );
        assert_eq!(
            add_items_to_scope(
                LoopSpec {
                    with_sequence: Some(&seq),
                    ..Default::default()
                },
                &mut scope,
            ),
            Err("only one of count or end can be defined in withSequence".to_string())
        );
    }

    #[test]
    fn leaf_scope_has_pod_and_retry_variables() {
        let t: Template = serde_json::from_value(json!({
            "name": "t",
            "inputs": {"parameters": [{"name": "p", "value": "v"}], "artifacts": [{"name": "a", "path": "/a"}]},
            "retryStrategy": {"limit": 2},
            "container": {"image": "alpine"}
        }))
        .unwrap();
        let scope = template_scope(&t, TemplateKind::Container);
        for key in [
            "inputs.parameters",
            "inputs.parameters.p",
            "inputs.artifacts.a",
            "inputs.artifacts.a.path",
            "pod.name",
            "retries",
            "lastRetry.exitCode",
        ] {
            assert!(scope.contains(key), "missing {}", key);
        }
        assert_eq!(scope.substitute("{{inputs.parameters.p}}"), "v");

        let steps_scope = template_scope(&t, TemplateKind::Steps);
        assert!(!steps_scope.contains("pod.name"));
        assert!(!steps_scope.contains("inputs.artifacts.a.path"));
    }
}
