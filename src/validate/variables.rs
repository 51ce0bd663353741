//! `{{...}}` reference scanning and resolution.
//!
//! Objects are scanned as serde_json trees: every string leaf and every map
//! key is searched for `{{token}}`. An unterminated `{{` is literal text.

use std::collections::HashSet;

use serde_json::Value;

use super::scope::{ANY_ITEM, Scope};

/// Roots whose references are checked. Anything else belongs to an
/// extension (or is plain text that happens to use braces) and is skipped.
const CHECKED_ROOTS: &[&str] = &[
    "inputs",
    "outputs",
    "steps",
    "tasks",
    "item",
    "pod",
    "workflow",
    "retries",
    "lastRetry",
    "node",
];

/// Tokens resolved at runtime without a scope entry.
const RUNTIME_PREFIXES: &[&str] = &[
    "workflow.creationTimestamp",
    "workflow.scheduledTime",
    "workflow.duration",
    "tasks.name",
    "steps.name",
    "node.name",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub token: String,
    pub field: String,
}

/// Every `{{token}}` in `s`, trimmed, in order of appearance.
pub fn tokens(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        out.push(after[..end].trim());
        rest = &after[end + 2..];
    }
    out
}

/// Whether a string is a single reference, e.g. a templated `globalName`.
pub fn is_reference(s: &str) -> bool {
    let t = s.trim();
    t.starts_with("{{") && t.ends_with("}}") && !tokens(t).is_empty()
}

/// Every reference inside `value`, with the field path of each occurrence.
pub fn references(value: &Value, base: &str) -> Vec<Reference> {
    let mut out = Vec::new();
    walk(value, base, &mut out);
    out
}

fn join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

fn push_tokens(s: &str, field: &str, out: &mut Vec<Reference>) {
    for token in tokens(s) {
        out.push(Reference {
            token: token.to_string(),
            field: field.to_string(),
        });
    }
}

fn walk(value: &Value, field: &str, out: &mut Vec<Reference>) {
    match value {
        Value::String(s) => push_tokens(s, field, out),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{}[{}]", field, i), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = join(field, k);
                push_tokens(k, &child, out);
                walk(v, &child, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Resolution rules for one scan.
pub struct VariableCheck<'a> {
    pub scope: &'a Scope,
    pub globals: &'a Scope,
    /// Validating a workflow template in isolation: `workflow.parameters.*`
    /// may come from the submitting workflow.
    pub workflow_template: bool,
}

impl VariableCheck<'_> {
    pub fn is_checked(token: &str) -> bool {
        !token.starts_with('=') && CHECKED_ROOTS.iter().any(|r| token.starts_with(r))
    }

    pub fn is_resolvable(&self, token: &str) -> bool {
        if !Self::is_checked(token) {
            return true;
        }
        if self.scope.contains(token) || self.globals.contains(token) {
            return true;
        }
        if (token == "item" || token.starts_with("item.")) && self.scope.contains(ANY_ITEM) {
            return true;
        }
        // self-references, e.g. for metrics emitted from a template's own outputs
        if token.starts_with("outputs.") {
            return true;
        }
        if RUNTIME_PREFIXES
            .iter()
            .any(|p| token.strip_prefix(p).is_some_and(|rest| rest.is_empty() || rest.starts_with('.')))
        {
            return true;
        }
        self.workflow_template && token.starts_with("workflow.parameters")
    }

    /// Distinct unresolved tokens in `value`, each with the field of its first occurrence.
    pub fn unresolved(&self, value: &Value, base: &str) -> Vec<Reference> {
        let mut seen = HashSet::new();
        references(value, base)
            .into_iter()
            .filter(|r| !self.is_resolvable(&r.token))
            .filter(|r| seen.insert(r.token.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tokens_are_trimmed_and_unterminated_braces_ignored() {
        assert_eq!(
            tokens("a {{ inputs.x }} b {{steps.y.id}}{{ tail"),
            vec!["inputs.x", "steps.y.id"]
        );
        assert!(tokens("no refs").is_empty());
    }

    #[test]
    fn references_record_field_paths() {
        let v = json!({"args": ["{{inputs.a}}", "x"], "env": {"{{item}}": "{{pod.name}}"}});
        let refs = references(&v, "container");
        let fields: Vec<(&str, &str)> = refs
            .iter()
            .map(|r| (r.token.as_str(), r.field.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("inputs.a", "container.args[0]"),
                ("item", "container.env.{{item}}"),
                ("pod.name", "container.env.{{item}}"),
            ]
        );
    }

    #[test]
    fn resolution_rules() {
        let mut scope = Scope::new();
        scope.insert("inputs.parameters.a");
        scope.insert(ANY_ITEM);
        let mut globals = Scope::new();
        globals.insert("workflow.name");
        let check = VariableCheck {
            scope: &scope,
            globals: &globals,
            workflow_template: false,
        };

        for ok in [
            "inputs.parameters.a",
            "workflow.name",
            "item",
            "item.field.nested",
            "outputs.parameters.self",
            "workflow.creationTimestamp.RFC3339",
            "tasks.name",
            "= inputs.parameters.b + 1",
            "custom.extension",
        ] {
            assert!(check.is_resolvable(ok), "{} should resolve", ok);
        }
        for bad in ["inputs.parameters.b", "workflow.parameters.p", "steps.x.status"] {
            assert!(!check.is_resolvable(bad), "{} should not resolve", bad);
        }
    }

    #[test]
    fn item_requires_loop() {
        let scope = Scope::new();
        let globals = Scope::new();
        let check = VariableCheck {
            scope: &scope,
            globals: &globals,
            workflow_template: true,
        };
        assert!(!check.is_resolvable("item.x"));
        assert!(check.is_resolvable("workflow.parameters.p"));
    }

    #[test]
    fn unresolved_reports_each_token_once() {
        let scope = Scope::new();
        let globals = Scope::new();
        let check = VariableCheck {
            scope: &scope,
            globals: &globals,
            workflow_template: false,
        };
        let v = json!({"a": "{{inputs.x}}", "b": ["{{inputs.x}}", "{{inputs.y}}"]});
        let refs = check.unresolved(&v, "");
        assert_eq!(
            refs,
            vec![
                Reference {
                    token: "inputs.x".into(),
                    field: "a".into()
                },
                Reference {
                    token: "inputs.y".into(),
                    field: "b[1]".into()
                },
            ]
        );
    }

    #[test]
    fn single_reference_detection() {
        assert!(is_reference("{{inputs.parameters.name}}"));
        assert!(!is_reference("plain-name"));
        assert!(!is_reference("{{ unterminated"));
    }
}
