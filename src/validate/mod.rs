//! Validation driver.
//!
//! Walks the template graph from the entrypoint, validating each reachable
//! template once (memoized by name) and binding arguments at every call
//! site. The exit handler is validated afterwards with `workflow.status`
//! in the global scope, then every declared template that was not reached.

pub mod artifacts;
pub mod dag;
pub mod inputs;
pub mod names;
pub mod outputs;
pub mod scope;
pub mod steps;
pub mod template;
pub mod variables;

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Diagnostic, DiagnosticKind, ValidationResult};
use crate::parse::types::{Template, WorkflowDoc};
use crate::resolver::TemplateResolver;

use self::inputs::CallArgs;
use self::names::{Grammar, MAX_WORKFLOW_NAME_LEN};
use self::scope::Scope;
use self::variables::{Reference, VariableCheck};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// The executor that will run pods. Some executors cannot collect outputs
/// from the container's base image layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Emissary,
    Docker,
    Pns,
    Kubelet,
    #[serde(rename = "k8sapi")]
    KubernetesApi,
}

impl ExecutorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Emissary => "emissary",
            ExecutorKind::Docker => "docker",
            ExecutorKind::Pns => "pns",
            ExecutorKind::Kubelet => "kubelet",
            ExecutorKind::KubernetesApi => "k8sapi",
        }
    }

    /// Output paths must live under a volume mount.
    pub fn requires_volume_outputs(&self) -> bool {
        matches!(
            self,
            ExecutorKind::Pns | ExecutorKind::Kubelet | ExecutorKind::KubernetesApi
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateOpts {
    /// Allow top-level argument parameters without a value.
    pub lint: bool,
    pub executor_kind: ExecutorKind,
    /// Maximum template call depth.
    pub max_depth: usize,
    /// The document is a workflow template validated on its own, so
    /// `workflow.parameters.*` may be supplied by the submitting workflow.
    pub workflow_template: bool,
}

impl Default for ValidateOpts {
    fn default() -> Self {
        ValidateOpts {
            lint: false,
            executor_kind: ExecutorKind::default(),
            max_depth: 100,
            workflow_template: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Validate a workflow document. Pure: no I/O, no shared state.
pub fn validate(
    doc: &WorkflowDoc,
    resolver: &dyn TemplateResolver,
    opts: &ValidateOpts,
) -> ValidationResult {
    let mut v = Validator::new(doc, resolver, opts);
    v.run();
    let mut diagnostics = v.diagnostics;
    sort_by_document_order(doc, &mut diagnostics);
    debug!(
        workflow = doc.metadata.name.as_deref().unwrap_or_default(),
        templates = v.visited.len(),
        diagnostics = diagnostics.len(),
        "validation finished"
    );
    ValidationResult::from_diagnostics(diagnostics)
}

/// Stable sort: document-level findings first, then by template declaration order.
fn sort_by_document_order(doc: &WorkflowDoc, diagnostics: &mut [Diagnostic]) {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, t) in doc.templates.iter().enumerate() {
        index.entry(t.name.as_str()).or_insert(i);
    }
    diagnostics.sort_by_key(|d| match d.path.strip_prefix("templates.") {
        Some(rest) => {
            let name = rest.split(['.', '[']).next().unwrap_or(rest);
            index.get(name).map_or(usize::MAX, |i| i + 1)
        }
        None => 0,
    });
}

// ---------------------------------------------------------------------------
// Validator context
// ---------------------------------------------------------------------------

pub(crate) struct Validator<'a> {
    doc: &'a WorkflowDoc,
    resolver: &'a dyn TemplateResolver,
    pub(crate) opts: &'a ValidateOpts,
    pub(crate) globals: Scope,
    visited: HashSet<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'a> Validator<'a> {
    fn new(doc: &'a WorkflowDoc, resolver: &'a dyn TemplateResolver, opts: &'a ValidateOpts) -> Self {
        Validator {
            doc,
            resolver,
            opts,
            globals: seed_globals(doc),
            visited: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        let doc = self.doc;
        let lint = self.opts.lint;

        if let Some(name) = doc.metadata.name.as_deref() {
            if name.len() > MAX_WORKFLOW_NAME_LEN {
                self.bad_request(
                    "metadata",
                    "name",
                    format!(
                        "workflow name '{}' must not be more than {} characters long (currently {})",
                        name,
                        MAX_WORKFLOW_NAME_LEN,
                        name.len()
                    ),
                );
            }
        }

        if let Some(msg) = names::check_names(doc.templates.iter().map(|t| t.name.as_str()), Grammar::Field) {
            self.bad_request("templates", "", format!("templates{}", msg));
        }

        inputs::validate_arguments(self, "spec", "arguments", &doc.arguments, lint);
        self.register_global_outputs();

        match doc.entrypoint.as_deref().filter(|e| !e.is_empty()) {
            None => self.bad_request("spec", "entrypoint", "spec.entrypoint is required"),
            Some(entrypoint) => {
                if let Some(entry) = self.resolve_callee("spec", "entrypoint", entrypoint, 0) {
                    inputs::bind_arguments(
                        self,
                        "spec",
                        "entrypoint",
                        entry,
                        CallArgs::Supplied(&doc.arguments),
                        lint,
                    );
                }
            }
        }

        if let Some(on_exit) = doc.on_exit.as_deref().filter(|e| !e.is_empty()) {
            self.globals.insert("workflow.status");
            self.globals.insert("workflow.failures");
            if let Some(handler) = self.resolve_callee("spec", "onExit", on_exit, 0) {
                inputs::bind_arguments(
                    self,
                    "spec",
                    "onExit",
                    handler,
                    CallArgs::Supplied(&doc.arguments),
                    lint,
                );
            }
        }

        for t in &doc.templates {
            if !self.visited.contains(&t.name) {
                debug!(template = %t.name, "validating unreferenced template");
                self.validate_template(t, 0);
            }
        }
    }

    /// Register every literal `globalName` of reachable templates, so global
    /// outputs resolve regardless of declaration order.
    fn register_global_outputs(&mut self) {
        let doc = self.doc;
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.extend(doc.entrypoint.as_deref());
        queue.extend(doc.on_exit.as_deref());
        queue.extend(doc.templates.iter().map(|t| t.name.as_str()));

        let mut seen = HashSet::new();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            let Some(tmpl) = self.lookup(name) else {
                continue;
            };
            for p in &tmpl.outputs.parameters {
                if let Some(g) = outputs::literal_global_name(p.global_name.as_deref()) {
                    self.globals.insert(format!("workflow.outputs.parameters.{}", g));
                }
            }
            for a in &tmpl.outputs.artifacts {
                if let Some(g) = outputs::literal_global_name(a.global_name.as_deref()) {
                    self.globals.insert(format!("workflow.outputs.artifacts.{}", g));
                }
            }
            if let Some(groups) = &tmpl.steps {
                queue.extend(groups.iter().flatten().map(|s| s.template.as_str()));
            }
            if let Some(dag) = &tmpl.dag {
                queue.extend(dag.tasks.iter().map(|t| t.template.as_str()));
            }
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<&'a Template> {
        let resolver = self.resolver;
        resolver.by_name(name)
    }

    /// Look up a call target and validate its body (once). Returns the
    /// template when its type is valid, so callers can bind arguments and
    /// surface its outputs.
    pub(crate) fn resolve_callee(
        &mut self,
        path: &str,
        field: &str,
        name: &str,
        depth: usize,
    ) -> Option<&'a Template> {
        if depth > self.opts.max_depth {
            self.bad_request(
                path,
                field,
                format!("maximum template depth ({}) exceeded", self.opts.max_depth),
            );
            return None;
        }
        if name.is_empty() {
            self.bad_request(path, field, "template name is required");
            return None;
        }
        let Some(tmpl) = self.lookup(name) else {
            self.report(Diagnostic::new(
                DiagnosticKind::UndefinedTemplate,
                path,
                field,
                format!("template name '{}' undefined", name),
            ));
            return None;
        };
        if tmpl.name != name {
            warn!(requested = name, returned = %tmpl.name, "resolver returned a mismatched template");
            self.report(Diagnostic::new(
                DiagnosticKind::InternalError,
                path,
                field,
                format!(
                    "template lookup for '{}' returned template '{}'",
                    name, tmpl.name
                ),
            ));
            return None;
        }
        self.validate_template(tmpl, depth);
        tmpl.body().ok().map(|_| tmpl)
    }

    /// Validate a template body unless it has been visited already.
    pub(crate) fn validate_template(&mut self, tmpl: &'a Template, depth: usize) {
        if !self.visited.insert(tmpl.name.clone()) {
            debug!(template = %tmpl.name, "template already validated");
            return;
        }
        debug!(template = %tmpl.name, depth, "validating template");
        template::validate_template(self, tmpl, depth);
    }

    // -----------------------------------------------------------------------
    // Diagnostics and reference scanning
    // -----------------------------------------------------------------------

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn bad_request(&mut self, path: &str, field: &str, message: impl Into<String>) {
        self.report(Diagnostic::bad_request(path, field, message));
    }

    /// Serialize a document fragment for scanning.
    pub(crate) fn tree<T: Serialize>(&mut self, path: &str, field: &str, value: &T) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.report(Diagnostic::new(
                    DiagnosticKind::InternalError,
                    path,
                    field,
                    format!("failed to serialize for reference scanning: {}", e),
                ));
                None
            }
        }
    }

    pub(crate) fn unresolved(&self, scope: &Scope, value: &Value, field: &str) -> Vec<Reference> {
        VariableCheck {
            scope,
            globals: &self.globals,
            workflow_template: self.opts.workflow_template,
        }
        .unresolved(value, field)
    }

    /// Report every unresolved reference in `value` under `path`.
    pub(crate) fn scan(&mut self, scope: &Scope, path: &str, field: &str, value: &Value) {
        for r in self.unresolved(scope, value, field) {
            self.report(Diagnostic::unresolved(path, r.field, &r.token));
        }
    }
}

// ---------------------------------------------------------------------------
// Global scope
// ---------------------------------------------------------------------------

fn seed_globals(doc: &WorkflowDoc) -> Scope {
    let mut g = Scope::new();
    let meta = &doc.metadata;

    match meta.name.as_deref() {
        Some(name) => g.insert_literal("workflow.name", name),
        None => g.insert("workflow.name"),
    }
    match meta.namespace.as_deref() {
        Some(ns) => g.insert_literal("workflow.namespace", ns),
        None => g.insert("workflow.namespace"),
    }
    g.insert("workflow.uid");
    match doc.entrypoint.as_deref() {
        Some(e) => g.insert_literal("workflow.mainEntrypoint", e),
        None => g.insert("workflow.mainEntrypoint"),
    }
    match doc.service_account_name.as_deref() {
        Some(sa) => g.insert_literal("workflow.serviceAccountName", sa),
        None => g.insert("workflow.serviceAccountName"),
    }
    if let Some(p) = doc.priority {
        g.insert_literal("workflow.priority", p.to_string());
    }

    if !doc.arguments.parameters.is_empty() {
        g.insert("workflow.parameters");
        g.insert("workflow.parameters.json");
    }
    for p in &doc.arguments.parameters {
        let key = format!("workflow.parameters.{}", p.name);
        match &p.value {
            Some(v) => g.insert_literal(key, v.as_str()),
            None => g.insert(key),
        }
    }

    let wf_meta = doc.workflow_metadata.as_ref();
    for (kind, own, extra) in [
        (
            "annotations",
            &meta.annotations,
            wf_meta.map(|m| &m.annotations),
        ),
        ("labels", &meta.labels, wf_meta.map(|m| &m.labels)),
    ] {
        g.insert(format!("workflow.{}", kind));
        g.insert(format!("workflow.{}.json", kind));
        for (k, v) in own.iter().chain(extra.into_iter().flatten()) {
            g.insert_literal(format!("workflow.{}.{}", kind, k), v.as_str());
        }
    }
    g
}
