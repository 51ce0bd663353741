//! Per-template validation: the single body type, execution policies,
//! inputs, the body itself, and declared outputs.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::Validator;
use super::scope::Scope;
use super::{artifacts, dag, inputs, outputs, steps, variables};
use crate::parse::types::{
    BodyError, Container, IntOrString, Resource, Suspend, Template, TemplateBody, TemplateKind,
};

/// Go-style durations: `30s`, `1h30m`, `1.5h`.
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(\.\d+)?(ns|us|µs|ms|s|m|h|d))+$").expect("valid regex")
});

static TEMPLATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("valid regex"));

const RESOURCE_ACTIONS: &[&str] = &["get", "create", "apply", "delete", "replace", "patch"];
const RETRY_POLICIES: &[&str] = &["Always", "OnFailure", "OnError", "OnTransientError", ""];

pub(crate) fn validate_template<'a>(v: &mut Validator<'a>, tmpl: &'a Template, depth: usize) {
    let path = format!("templates.{}", tmpl.name);

    let body = match tmpl.body() {
        Ok(body) => body,
        Err(BodyError::Unspecified) => {
            v.bad_request(
                &path,
                "",
                "template type unspecified. choose one of: container, script, resource, suspend, steps, dag",
            );
            return;
        }
        Err(BodyError::Multiple(kinds)) => {
            let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            v.bad_request(
                &path,
                "",
                format!("multiple template types specified: {}", names.join(", ")),
            );
            return;
        }
    };
    let kind = body.kind();

    check_policies(v, tmpl, kind, &path);
    inputs::validate_inputs(v, tmpl, kind, &path);
    let mut scope = inputs::template_scope(tmpl, kind);

    match body {
        TemplateBody::Steps(groups) => steps::validate_steps(v, tmpl, groups, &mut scope, depth),
        TemplateBody::Dag(d) => dag::validate_dag(v, tmpl, d, &mut scope, depth),
        _ => validate_leaf(v, tmpl, body, &scope, &path),
    }

    outputs::validate_outputs(v, tmpl, kind, &scope, &path);
}

// ---------------------------------------------------------------------------
// Execution policies
// ---------------------------------------------------------------------------

fn check_policies(v: &mut Validator<'_>, tmpl: &Template, kind: TemplateKind, path: &str) {
    if tmpl.parallelism.is_some() && kind.is_leaf() {
        v.bad_request(
            path,
            "parallelism",
            "parallelism is only valid for steps and dag templates",
        );
    }

    if let Some(retry) = &tmpl.retry_strategy {
        if !kind.is_leaf() {
            v.bad_request(
                path,
                "retryStrategy",
                "retryStrategy is only valid for container, script, resource and suspend templates",
            );
        }
        if let Some(policy) = retry.retry_policy.as_deref() {
            if !RETRY_POLICIES.contains(&policy) {
                v.bad_request(
                    path,
                    "retryStrategy.retryPolicy",
                    format!(
                        "retryPolicy '{}' is invalid. valid values are Always, OnFailure, OnError, OnTransientError",
                        policy
                    ),
                );
            }
        }
    }

    if let Some(deadline) = &tmpl.active_deadline_seconds {
        if !kind.is_leaf() {
            v.bad_request(
                path,
                "activeDeadlineSeconds",
                "activeDeadlineSeconds is only valid for leaf templates",
            );
        } else if !is_positive_or_reference(deadline) {
            v.bad_request(
                path,
                "activeDeadlineSeconds",
                "activeDeadlineSeconds must be a positive integer > 0 or a {{...}} variable",
            );
        }
    }

    if let Some(timeout) = &tmpl.timeout {
        if !kind.is_leaf() {
            v.bad_request(path, "timeout", "timeout is only valid for leaf templates");
        } else if !is_duration(timeout) {
            v.bad_request(
                path,
                "timeout",
                format!("invalid timeout format '{}'. must be a duration string, e.g. 30s", timeout),
            );
        }
    }

    if let Some(loc) = &tmpl.archive_location {
        for issue in artifacts::check_location(loc) {
            let field = if issue.field.is_empty() {
                "archiveLocation".to_string()
            } else {
                format!("archiveLocation.{}", issue.field)
            };
            v.bad_request(path, &field, issue.message);
        }
    }
}

fn is_positive_or_reference(value: &IntOrString) -> bool {
    match value {
        IntOrString::Str(s) if variables::is_reference(s) => true,
        _ => value.as_int().is_some_and(|n| n > 0),
    }
}

/// A duration string or a templated value. Bare integers carry no unit.
fn is_duration(value: &IntOrString) -> bool {
    match value {
        IntOrString::Int(_) => false,
        IntOrString::Str(s) => s.contains("{{") || DURATION.is_match(s.trim()),
    }
}

// ---------------------------------------------------------------------------
// Leaf bodies
// ---------------------------------------------------------------------------

fn validate_leaf(
    v: &mut Validator<'_>,
    tmpl: &Template,
    body: TemplateBody<'_>,
    scope: &Scope,
    path: &str,
) {
    // outputs are checked on their own, against the same scope
    if let Some(mut tree) = v.tree(path, "", tmpl) {
        if let Some(map) = tree.as_object_mut() {
            map.remove("outputs");
        }
        v.scan(scope, path, "", &tree);
    }

    match body {
        TemplateBody::Container(c) => check_container(v, tmpl, c, "container", path),
        TemplateBody::Script(s) => check_container(v, tmpl, &s.container, "script", path),
        TemplateBody::Resource(r) => check_resource(v, r, path),
        TemplateBody::Suspend(s) => check_suspend(v, s, path),
        TemplateBody::Steps(_) | TemplateBody::Dag(_) => {}
    }
}

fn check_container(v: &mut Validator<'_>, tmpl: &Template, c: &Container, field: &str, path: &str) {
    if c.image.as_deref().is_none_or(|i| i.trim().is_empty()) {
        v.bad_request(path, &format!("{}.image", field), format!("{}.image may not be empty", field));
    }

    let mut mounts: HashMap<&str, usize> = HashMap::new();
    for (i, m) in c.volume_mounts.iter().enumerate() {
        let Some(&first) = mounts.get(m.mount_path.as_str()) else {
            mounts.insert(m.mount_path.as_str(), i);
            continue;
        };
        v.bad_request(
            path,
            &format!("{}.volumeMounts[{}].mountPath", field, i),
            format!(
                "mountPath '{}' is already used by volumeMounts[{}]",
                m.mount_path, first
            ),
        );
    }
    for a in &tmpl.inputs.artifacts {
        let Some(p) = a.path.as_deref() else {
            continue;
        };
        if mounts.contains_key(p) {
            v.bad_request(
                path,
                &format!("inputs.artifacts.{}.path", a.name),
                format!("path '{}' already mounted in {}.volumeMounts", p, field),
            );
        }
    }
}

fn check_resource(v: &mut Validator<'_>, r: &Resource, path: &str) {
    let action = r.action.as_str();
    if !action.contains("{{") && !RESOURCE_ACTIONS.contains(&action) {
        v.bad_request(
            path,
            "resource.action",
            format!(
                "action '{}' is invalid. valid actions are: {}",
                action,
                RESOURCE_ACTIONS.join(", ")
            ),
        );
    }
    if matches!(action, "get" | "delete") {
        return;
    }
    let manifest = r.manifest.as_deref().unwrap_or_default();
    if manifest.trim().is_empty() {
        v.bad_request(path, "resource.manifest", "resource.manifest is required");
        return;
    }
    // references may sit where YAML expects a scalar, so parse with placeholders
    let placeholder = TEMPLATE_TOKEN.replace_all(manifest, "placeholder");
    if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(&placeholder) {
        v.bad_request(
            path,
            "resource.manifest",
            format!("resource.manifest must be a valid yaml: {}", e),
        );
    }
}

fn check_suspend(v: &mut Validator<'_>, s: &Suspend, path: &str) {
    let Some(duration) = &s.duration else {
        return;
    };
    if !is_suspend_duration(duration) {
        v.bad_request(
            path,
            "suspend.duration",
            format!("invalid suspend duration '{}'", duration),
        );
    }
}

/// Whole seconds, a duration string, or a templated value.
fn is_suspend_duration(value: &IntOrString) -> bool {
    match value {
        IntOrString::Str(d) if d.contains("{{") || DURATION.is_match(d.trim()) => true,
        _ => value.as_int().is_some_and(|n| n >= 0),
    }
}
