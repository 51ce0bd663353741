//! Diagnostics produced by validation and errors produced by parsing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    BadRequest,
    UnresolvedReference,
    DependencyCycle,
    UndefinedTemplate,
    DependencyMissing,
    IncompatibleValueFrom,
    InternalError,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::BadRequest => write!(f, "BadRequest"),
            DiagnosticKind::UnresolvedReference => write!(f, "UnresolvedReference"),
            DiagnosticKind::DependencyCycle => write!(f, "DependencyCycle"),
            DiagnosticKind::UndefinedTemplate => write!(f, "UndefinedTemplate"),
            DiagnosticKind::DependencyMissing => write!(f, "DependencyMissing"),
            DiagnosticKind::IncompatibleValueFrom => write!(f, "IncompatibleValueFrom"),
            DiagnosticKind::InternalError => write!(f, "InternalError"),
        }
    }
}

/// A single validation finding.
///
/// `path` locates the template (e.g. `templates.main.tasks.B`), `field` the
/// offending field inside it (e.g. `arguments.parameters.x`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: String,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.path.is_empty(), self.field.is_empty()) {
            (true, true) => write!(f, "[{}] {}", self.kind, self.message),
            (false, true) => write!(f, "[{}] {}: {}", self.kind, self.path, self.message),
            (true, false) => write!(f, "[{}] {}: {}", self.kind, self.field, self.message),
            (false, false) => write!(
                f,
                "[{}] {}.{}: {}",
                self.kind, self.path, self.field, self.message
            ),
        }
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        path: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            path: path.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(
        path: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(DiagnosticKind::BadRequest, path, field, message)
    }

    pub fn unresolved(path: impl Into<String>, field: impl Into<String>, token: &str) -> Self {
        Self::new(
            DiagnosticKind::UnresolvedReference,
            path,
            field,
            format!("failed to resolve {{{{{}}}}}", token),
        )
    }
}

/// Outcome of a validation run. `success` holds iff `diagnostics` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        ValidationResult {
            success: diagnostics.is_empty(),
            diagnostics,
        }
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to parse workflow JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("workflow document must be an object, found {0}")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_path_and_field() {
        let d = Diagnostic::unresolved("templates.main", "args", "inputs.parameters.x");
        assert_eq!(
            d.to_string(),
            "[UnresolvedReference] templates.main.args: failed to resolve {{inputs.parameters.x}}"
        );
    }

    #[test]
    fn display_without_location() {
        let d = Diagnostic::bad_request("", "", "spec.entrypoint is required");
        assert_eq!(d.to_string(), "[BadRequest] spec.entrypoint is required");
    }

    #[test]
    fn result_success_tracks_diagnostics() {
        assert!(ValidationResult::from_diagnostics(vec![]).success);
        let r = ValidationResult::from_diagnostics(vec![Diagnostic::bad_request("a", "", "x")]);
        assert!(!r.success);
        assert!(r.has(DiagnosticKind::BadRequest));
        assert_eq!(r.of_kind(DiagnosticKind::DependencyCycle).count(), 0);
    }
}
