//! Declared outputs, and the variables a call exposes to later callers.

use super::Validator;
use super::artifacts;
use super::names::{self, Grammar};
use super::scope::Scope;
use super::variables;
use crate::dag::TaskResult;
use crate::error::{Diagnostic, DiagnosticKind};
use crate::parse::types::{Container, Template, TemplateKind, ValueSource};

/// A `globalName` usable as a workflow-level output key.
pub(crate) fn literal_global_name(name: Option<&str>) -> Option<&str> {
    let name = name?.trim();
    if name.is_empty() || name.contains("{{") {
        return None;
    }
    names::name_errors(name, Grammar::Param)
        .is_empty()
        .then_some(name)
}

// ---------------------------------------------------------------------------
// Declaration rules
// ---------------------------------------------------------------------------

pub(crate) fn validate_outputs(
    v: &mut Validator<'_>,
    tmpl: &Template,
    kind: TemplateKind,
    scope: &Scope,
    path: &str,
) {
    let outputs = &tmpl.outputs;
    if let Some(msg) = names::check_names(outputs.parameters.iter().map(|p| p.name.as_str()), Grammar::Param) {
        v.bad_request(path, "outputs.parameters", msg);
    }
    if let Some(msg) = names::check_names(outputs.artifacts.iter().map(|a| a.name.as_str()), Grammar::Param) {
        v.bad_request(path, "outputs.artifacts", msg);
    }

    if let Some(tree) = v.tree(path, "outputs", outputs) {
        v.scan(scope, path, "outputs", &tree);
    }

    let container = tmpl.body().ok().and_then(|b| b.container());
    let executor = v.opts.executor_kind;

    for a in &outputs.artifacts {
        let field = format!("outputs.artifacts.{}", a.name);
        let out_path = a.path.as_deref().filter(|p| !p.is_empty());
        if kind.is_leaf() {
            if out_path.is_none() {
                v.bad_request(path, &format!("{}.path", field), "path must be specified");
            }
        } else {
            if out_path.is_some() {
                v.bad_request(
                    path,
                    &format!("{}.path", field),
                    "path only valid in container/script templates",
                );
            }
            if a.from.as_deref().is_none_or(str::is_empty) {
                v.bad_request(path, &format!("{}.from", field), "from is required for steps and dag templates");
            }
        }
        check_global_name(v, path, &field, a.global_name.as_deref());
        if executor.requires_volume_outputs() {
            if let (Some(c), Some(p)) = (container, out_path) {
                check_volume_path(v, path, &format!("{}.path", field), c, p);
            }
        }
        for issue in artifacts::check_location(&a.location) {
            let f = if issue.field.is_empty() {
                field.clone()
            } else {
                format!("{}.{}", field, issue.field)
            };
            v.bad_request(path, &f, issue.message);
        }
    }

    for p in &outputs.parameters {
        let field = format!("outputs.parameters.{}", p.name);
        check_global_name(v, path, &field, p.global_name.as_deref());

        if p.value.is_some() && p.value_from.is_some() {
            v.bad_request(path, &field, "has both valueFrom and value specified. Choose one.");
            continue;
        }
        let Some(vf) = &p.value_from else {
            v.bad_request(path, &field, "valueFrom is required");
            continue;
        };
        let vf_field = format!("{}.valueFrom", field);
        let sources: Vec<ValueSource> = vf
            .sources()
            .into_iter()
            .filter(|s| !matches!(s, ValueSource::ConfigMapKeyRef | ValueSource::Event))
            .collect();
        match sources.as_slice() {
            [] => {
                v.bad_request(
                    path,
                    &vf_field,
                    "valueFrom type unspecified. choose one of: path, jqFilter, jsonPath, parameter, expression, supplied",
                );
                continue;
            }
            [_] => {}
            many => {
                let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
                v.bad_request(
                    path,
                    &vf_field,
                    format!("multiple valueFrom types specified: {}", names.join(", ")),
                );
                continue;
            }
        }

        let source = sources[0];
        if let Some(msg) = incompatible_source(kind, source) {
            v.report(Diagnostic::new(
                DiagnosticKind::IncompatibleValueFrom,
                path,
                &vf_field,
                msg,
            ));
        }
        if executor.requires_volume_outputs() {
            if let (Some(c), Some(p)) = (container, vf.path.as_deref()) {
                check_volume_path(v, path, &format!("{}.path", vf_field), c, p);
            }
        }
    }
}

/// The message for a value source a template kind cannot produce.
fn incompatible_source(kind: TemplateKind, source: ValueSource) -> Option<String> {
    let ok = match kind {
        TemplateKind::Container | TemplateKind::Script => source == ValueSource::Path,
        TemplateKind::Resource => matches!(source, ValueSource::JqFilter | ValueSource::JsonPath),
        TemplateKind::Steps | TemplateKind::Dag => {
            matches!(source, ValueSource::Parameter | ValueSource::Expression)
        }
        TemplateKind::Suspend => source == ValueSource::Supplied,
    };
    if ok {
        return None;
    }
    Some(match kind {
        TemplateKind::Container | TemplateKind::Script => {
            format!("path must be specified for {} templates", kind)
        }
        TemplateKind::Resource => "jqFilter or jsonPath must be specified for resource templates".into(),
        TemplateKind::Steps | TemplateKind::Dag => {
            format!("parameter or expression must be specified for {} templates", kind)
        }
        TemplateKind::Suspend => "supplied must be specified for suspend templates".into(),
    })
}

fn check_global_name(v: &mut Validator<'_>, path: &str, field: &str, global: Option<&str>) {
    let Some(global) = global.filter(|g| !g.is_empty()) else {
        return;
    };
    let field = format!("{}.globalName", field);
    if variables::is_reference(global) || global.contains("{{") {
        v.bad_request(path, &field, "globalName must be a literal name");
        return;
    }
    let errs = names::name_errors(global, Grammar::Param);
    if !errs.is_empty() {
        v.bad_request(
            path,
            &field,
            format!("globalName '{}' is invalid: {}", global, errs.join(";")),
        );
    }
}

fn check_volume_path(v: &mut Validator<'_>, path: &str, field: &str, c: &Container, out: &str) {
    if out.contains("{{") {
        return;
    }
    let mounted = c.volume_mounts.iter().any(|m| {
        let root = m.mount_path.trim_end_matches('/');
        !root.is_empty() && (out == root || out.starts_with(&format!("{}/", root)))
    });
    if !mounted {
        v.bad_request(
            path,
            field,
            format!(
                "executor '{}' does not support outputs from base image layer. must use emptyDir",
                v.opts.executor_kind.as_str()
            ),
        );
    }
}

// ---------------------------------------------------------------------------
// Exposed variables
// ---------------------------------------------------------------------------

/// Add what a completed call of `tmpl` exposes under `prefix`
/// (`steps.<name>`, `tasks.<name>`).
///
/// `aggregate` adds the list forms produced by loops; `ancestor` adds the
/// status fields a dependent task may read.
pub(crate) fn add_outputs_to_scope(
    tmpl: &Template,
    prefix: &str,
    scope: &mut Scope,
    aggregate: bool,
    ancestor: bool,
) {
    if ancestor {
        add_status_to_scope(prefix, scope);
    }
    if tmpl.is_daemon() {
        scope.insert(format!("{}.ip", prefix));
    }
    let kind = tmpl.kind();
    if kind.is_some_and(|k| k.has_result()) {
        scope.insert(format!("{}.outputs.result", prefix));
        scope.insert(format!("{}.exitCode", prefix));
    }
    for p in &tmpl.outputs.parameters {
        scope.insert(format!("{}.outputs.parameters.{}", prefix, p.name));
    }
    for a in &tmpl.outputs.artifacts {
        scope.insert(format!("{}.outputs.artifacts.{}", prefix, a.name));
    }
    if aggregate {
        scope.insert(format!("{}.outputs.parameters", prefix));
        if kind == Some(TemplateKind::Script) {
            scope.insert(format!("{}.outputs.result", prefix));
        }
    }
}

/// Status fields of a finished call, also used when the callee is unknown.
pub(crate) fn add_status_to_scope(prefix: &str, scope: &mut Scope) {
    for field in ["status", "id", "startedAt", "finishedAt", "hostNodeName"] {
        scope.insert(format!("{}.{}", prefix, field));
    }
    for result in TaskResult::ALL {
        scope.insert(format!("{}.{}", prefix, result.as_str()));
    }
}
