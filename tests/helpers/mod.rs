#![allow(dead_code)]

use workflow_validator::parse::{self, WorkflowDoc};
use workflow_validator::{Diagnostic, DiagnosticKind, ValidateOpts, ValidationResult, validate};

// =============================================================================
// Runners
// =============================================================================

/// Route `tracing` output through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn doc(yaml: &str) -> WorkflowDoc {
    parse::parse_yaml(yaml).expect("fixture should parse")
}

pub fn run(yaml: &str) -> ValidationResult {
    run_with(yaml, &ValidateOpts::default())
}

pub fn run_with(yaml: &str, opts: &ValidateOpts) -> ValidationResult {
    init_tracing();
    let doc = doc(yaml);
    validate(&doc, &doc, opts)
}

pub fn lint() -> ValidateOpts {
    ValidateOpts {
        lint: true,
        ..Default::default()
    }
}

// =============================================================================
// Assertions
// =============================================================================

pub fn assert_success(result: &ValidationResult) {
    assert!(
        result.success,
        "expected no diagnostics, got:\n{}",
        render(&result.diagnostics)
    );
}

/// Assert a diagnostic of `kind` whose message contains `fragment`.
pub fn assert_has(result: &ValidationResult, kind: DiagnosticKind, fragment: &str) {
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.kind == kind && d.message.contains(fragment)),
        "expected {} containing {:?}, got:\n{}",
        kind,
        fragment,
        render(&result.diagnostics)
    );
}

/// One diagnostic per line, for snapshots and failure output.
pub fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
