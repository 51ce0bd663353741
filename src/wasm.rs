//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::dag::depends;
use crate::error::{Diagnostic, DiagnosticKind, ValidationResult};
use crate::parse;
use crate::validate::{ValidateOpts, validate};

/// Validate a workflow given as JSON or YAML text.
/// `opts_json` may be empty for the default options.
/// Returns a `ValidationResult` object.
#[wasm_bindgen]
pub fn validate_workflow(source: &str, opts_json: &str) -> JsValue {
    let result = validate_workflow_inner(source, opts_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_workflow_inner(source: &str, opts_json: &str) -> ValidationResult {
    let opts = if opts_json.trim().is_empty() {
        ValidateOpts::default()
    } else {
        match serde_json::from_str::<ValidateOpts>(opts_json) {
            Ok(o) => o,
            Err(e) => {
                return ValidationResult::from_diagnostics(vec![Diagnostic::bad_request(
                    "",
                    "opts",
                    format!("failed to parse validation options: {}", e),
                )]);
            }
        }
    };

    let parsed = if source.trim_start().starts_with('{') {
        parse::parse_json(source)
    } else {
        parse::parse_yaml(source)
    };
    match parsed {
        Ok(doc) => validate(&doc, &doc, &opts),
        Err(e) => ValidationResult::from_diagnostics(vec![Diagnostic::bad_request("", "", e.to_string())]),
    }
}

/// Task names referenced by a `depends` expression.
/// Returns `{ dependencies: [{ task, itemsBased }] }` or `{ error }`.
#[wasm_bindgen]
pub fn depends_dependencies(expr: &str) -> JsValue {
    let result = depends_dependencies_inner(expr);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn depends_dependencies_inner(expr: &str) -> DependsResult {
    match depends::parse(expr) {
        Ok(parsed) => DependsResult::Dependencies(
            parsed
                .dependencies()
                .into_iter()
                .map(|(task, ty)| DependencyDto {
                    task,
                    items_based: ty == depends::DependencyType::Items,
                })
                .collect(),
        ),
        Err(e) => DependsResult::Error(Diagnostic::new(
            DiagnosticKind::BadRequest,
            "",
            "depends",
            e.to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyDto {
    task: String,
    items_based: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
enum DependsResult {
    Dependencies(Vec<DependencyDto>),
    Error(Diagnostic),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_and_json_sources() {
        let yaml = "entrypoint: main\ntemplates:\n  - name: main\n    container: {image: alpine}\n";
        assert!(validate_workflow_inner(yaml, "").success);

        let json = r#"{"entrypoint": "main", "templates": [{"name": "main", "suspend": {}}]}"#;
        assert!(validate_workflow_inner(json, r#"{"lint": true}"#).success);
    }

    #[test]
    fn bad_input_becomes_a_diagnostic() {
        let r = validate_workflow_inner("[1, 2]", "");
        assert!(!r.success);
        assert!(r.diagnostics[0].message.contains("must be an object"));

        let r = validate_workflow_inner("entrypoint: main", "{not json");
        assert_eq!(r.diagnostics[0].field, "opts");
    }

    #[test]
    fn depends_dto() {
        let r = serde_json::to_value(depends_dependencies_inner("A && (B.AnySucceeded || !C)")).unwrap();
        assert_eq!(
            r,
            serde_json::json!({"dependencies": [
                {"task": "A", "itemsBased": false},
                {"task": "B", "itemsBased": true},
                {"task": "C", "itemsBased": false},
            ]})
        );
        let r = depends_dependencies_inner("A &&");
        assert!(matches!(r, DependsResult::Error(_)));
    }
}
