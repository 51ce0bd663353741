//! Steps templates: ordered groups of parallel calls.
//!
//! A step sees the template scope plus the outputs of every earlier group.
//! Siblings in the same group run concurrently and cannot see each other.

use std::collections::HashSet;

use super::Validator;
use super::inputs::{self, CallArgs};
use super::names::{self, Grammar};
use super::outputs;
use super::scope::Scope;
use crate::parse::types::{Template, WorkflowStep};

pub(crate) fn validate_steps<'a>(
    v: &mut Validator<'a>,
    tmpl: &'a Template,
    groups: &'a [Vec<WorkflowStep>],
    scope: &mut Scope,
    depth: usize,
) {
    let path = format!("templates.{}", tmpl.name);
    check_step_names(v, groups, &path);

    for (i, group) in groups.iter().enumerate() {
        let visible = scope.clone();
        let mut finished: Vec<(&'a WorkflowStep, Option<&'a Template>)> = Vec::with_capacity(group.len());

        for step in group {
            let step_path = format!("{}.steps[{}].{}", path, i, step.name);
            let mut step_scope = visible.clone();
            if let Err(msg) = inputs::add_items_to_scope(step.loop_spec(), &mut step_scope) {
                v.bad_request(&step_path, "", msg);
            }
            if let Some(tree) = v.tree(&step_path, "", step) {
                v.scan(&step_scope, &step_path, "", &tree);
            }
            inputs::validate_arguments(v, &step_path, "arguments", &step.arguments, false);

            let callee = v.resolve_callee(&step_path, "template", &step.template, depth + 1);
            if let Some(callee) = callee {
                inputs::bind_arguments(
                    v,
                    &step_path,
                    "arguments",
                    callee,
                    CallArgs::Supplied(&step.arguments),
                    false,
                );
            }
            finished.push((step, callee));
        }

        for (step, callee) in finished {
            let prefix = format!("steps.{}", step.name);
            match callee {
                Some(callee) => outputs::add_outputs_to_scope(
                    callee,
                    &prefix,
                    scope,
                    step.loop_spec().aggregates(),
                    true,
                ),
                None => outputs::add_status_to_scope(&prefix, scope),
            }
        }
    }
}

/// Step names are unique across all groups of a template.
fn check_step_names(v: &mut Validator<'_>, groups: &[Vec<WorkflowStep>], path: &str) {
    let mut seen = HashSet::new();
    for (i, group) in groups.iter().enumerate() {
        for (j, step) in group.iter().enumerate() {
            let field = format!("steps[{}][{}].name", i, j);
            if step.name.is_empty() {
                v.bad_request(path, &field, "name is required");
                continue;
            }
            let errs = names::name_errors(&step.name, Grammar::Field);
            if !errs.is_empty() {
                v.bad_request(
                    path,
                    &field,
                    format!("'{}' is invalid: {}", step.name, errs.join(";")),
                );
            } else if !seen.insert(step.name.as_str()) {
                v.bad_request(path, &field, format!("'{}' is not unique", step.name));
            }
        }
    }
}
