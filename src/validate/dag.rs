//! DAG templates: dependency structure, target resolution, and per-task
//! scopes built from each task's ancestors.

use std::collections::HashMap;

use serde_json::Value;

use super::Validator;
use super::inputs::{self, CallArgs};
use super::names::{self, Grammar};
use super::outputs;
use super::scope::Scope;
use super::variables::Reference;
use crate::dag::{self as graph, DependencyType, TaskGraph};
use crate::error::{Diagnostic, DiagnosticKind};
use crate::parse::types::{DagTask, DagTemplate, Template};

pub(crate) fn validate_dag<'a>(
    v: &mut Validator<'a>,
    tmpl: &'a Template,
    dag: &'a DagTemplate,
    scope: &mut Scope,
    depth: usize,
) {
    let path = format!("templates.{}", tmpl.name);
    let tasks = &dag.tasks;

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    if tasks.is_empty() {
        v.bad_request(&path, "dag.tasks", "must have at least one task");
        return;
    }
    if let Some(msg) = names::check_names(tasks.iter().map(|t| t.name.as_str()), Grammar::Field) {
        v.bad_request(&path, "dag.tasks", msg);
        return;
    }

    let using_depends = tasks.iter().any(DagTask::uses_depends);
    let using_dependencies = tasks.iter().any(|t| !t.dependencies.is_empty());
    if using_depends && using_dependencies {
        v.bad_request(
            &path,
            "dag.tasks",
            "cannot use both 'depends' and 'dependencies' in the same DAG template",
        );
        return;
    }

    for task in tasks {
        let task_path = task_path(&path, task);
        let has_dependencies = task.uses_depends() || !task.dependencies.is_empty();
        if (using_depends || has_dependencies) && task.name.starts_with(|c: char| c.is_ascii_digit()) {
            v.bad_request(
                &task_path,
                "name",
                "name cannot begin with a digit when using either 'depends' or 'dependencies'",
            );
        }
        if using_depends && task.continue_on.is_some() {
            v.bad_request(
                &task_path,
                "continueOn",
                "cannot use 'continueOn' when using 'depends'. Instead use 'dep-task.Failed'/'dep-task.Errored'",
            );
        }
    }

    let by_name: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.name.as_str(), i))
        .collect();

    let mut g = TaskGraph::new(tasks.iter().map(|t| t.name.as_str()));
    for task in tasks {
        let task_path = task_path(&path, task);
        let (field, deps) = match task.depends.as_deref().filter(|_| task.uses_depends()) {
            Some(expr) => match graph::depends::parse(expr) {
                Ok(parsed) => ("depends", parsed.dependencies()),
                Err(e) => {
                    v.bad_request(
                        &task_path,
                        "depends",
                        format!("invalid 'depends' expression '{}': {}", expr, e),
                    );
                    continue;
                }
            },
            None => (
                "dependencies",
                task.dependencies
                    .iter()
                    .map(|d| (d.clone(), DependencyType::Plain))
                    .collect(),
            ),
        };

        for (dep, ty) in deps {
            let Some(&dep_index) = by_name.get(dep.as_str()) else {
                v.bad_request(&task_path, field, format!("dependency '{}' not defined", dep));
                continue;
            };
            if ty == DependencyType::Items && !tasks[dep_index].loop_spec().is_loop() {
                v.bad_request(
                    &task_path,
                    field,
                    format!(
                        "dependency '{}' uses an items-based condition such as .AnySucceeded or .AllFailed but does not contain any items",
                        dep
                    ),
                );
            }
            g.add_dependency(&task.name, &dep);
        }
    }

    if let Some(cycle) = g.find_cycle() {
        v.report(Diagnostic::new(
            DiagnosticKind::DependencyCycle,
            &path,
            "dag.tasks",
            format!("dependency cycle detected: {}", cycle.join("->")),
        ));
        return;
    }

    // -----------------------------------------------------------------------
    // Callees and the DAG-level scope
    // -----------------------------------------------------------------------

    let callees: Vec<Option<&'a Template>> = tasks
        .iter()
        .map(|task| {
            let task_path = task_path(&path, task);
            v.resolve_callee(&task_path, "template", &task.template, depth + 1)
        })
        .collect();

    let base = scope.clone();
    for (task, callee) in tasks.iter().zip(&callees) {
        if let Some(callee) = callee {
            outputs::add_outputs_to_scope(
                callee,
                &format!("tasks.{}", task.name),
                scope,
                task.loop_spec().aggregates(),
                false,
            );
        }
    }

    if let Some(target) = dag.target.as_deref() {
        v.scan(scope, &path, "dag.target", &Value::String(target.to_string()));
        let resolved = v.globals.substitute(&scope.substitute(target));
        for name in resolved.split_whitespace() {
            if name.contains("{{") || name.contains("}}") {
                continue;
            }
            if !g.contains(name) {
                v.bad_request(&path, "dag.target", format!("target '{}' is not defined", name));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    for (task, callee) in tasks.iter().zip(&callees) {
        let task_path = task_path(&path, task);
        let mut task_scope = base.clone();
        let ancestors = g.ancestors(&task.name);
        for &ancestor in &ancestors {
            let prefix = format!("tasks.{}", ancestor);
            let Some(&i) = by_name.get(ancestor) else {
                continue;
            };
            match callees[i] {
                Some(c) => outputs::add_outputs_to_scope(
                    c,
                    &prefix,
                    &mut task_scope,
                    tasks[i].loop_spec().aggregates(),
                    true,
                ),
                None => outputs::add_status_to_scope(&prefix, &mut task_scope),
            }
        }
        if let Err(msg) = inputs::add_items_to_scope(task.loop_spec(), &mut task_scope) {
            v.bad_request(&task_path, "", msg);
        }

        scan_task(v, task, &task_scope, &task_path, &g, &ancestors);

        inputs::validate_arguments(v, &task_path, "arguments", &task.arguments, false);
        if let Some(callee) = callee {
            inputs::bind_arguments(
                v,
                &task_path,
                "arguments",
                callee,
                CallArgs::Supplied(&task.arguments),
                false,
            );
        }
    }
}

fn task_path(template_path: &str, task: &DagTask) -> String {
    format!("{}.tasks.{}", template_path, task.name)
}

/// Scan a task's references. Reading a sibling's outputs without depending
/// on it is a missing dependency rather than an unknown variable.
fn scan_task(
    v: &mut Validator<'_>,
    task: &DagTask,
    scope: &Scope,
    path: &str,
    g: &TaskGraph,
    ancestors: &[&str],
) {
    let mut found: Vec<(Reference, String)> = Vec::new();

    for p in &task.arguments.parameters {
        let field = format!("arguments.parameters.{}", p.name);
        if let Some(tree) = v.tree(path, &field, p) {
            for r in v.unresolved(scope, &tree, &field) {
                found.push((r, format!("parameter '{}'", p.name)));
            }
        }
    }
    for a in &task.arguments.artifacts {
        let field = format!("arguments.artifacts.{}", a.name);
        if let Some(tree) = v.tree(path, &field, a) {
            for r in v.unresolved(scope, &tree, &field) {
                found.push((r, format!("artifact '{}'", a.name)));
            }
        }
    }
    if let Some(mut tree) = v.tree(path, "", task) {
        if let Some(map) = tree.as_object_mut() {
            map.remove("arguments");
        }
        for r in v.unresolved(scope, &tree, "") {
            let label = format!("field '{}'", r.field);
            found.push((r, label));
        }
    }

    for (r, label) in found {
        match missing_dependency(&r.token, g, ancestors) {
            Some(dep) => v.report(Diagnostic::new(
                DiagnosticKind::DependencyMissing,
                path,
                r.field,
                format!("missing dependency '{}' for {}", dep, label),
            )),
            None => v.report(Diagnostic::unresolved(path, r.field, &r.token)),
        }
    }
}

/// The non-ancestor sibling named by a `tasks.<name>.outputs...` reference.
fn missing_dependency<'t>(token: &'t str, g: &TaskGraph, ancestors: &[&str]) -> Option<&'t str> {
    let rest = token.strip_prefix("tasks.")?;
    let (name, tail) = rest.split_once('.')?;
    (g.contains(name) && !ancestors.contains(&name) && tail.starts_with("outputs")).then_some(name)
}
