//! Template lookup capability consumed by the validator.

use std::collections::HashMap;

use crate::parse::types::{Template, WorkflowDoc};

/// Synchronous, deterministic lookup of a template by name.
pub trait TemplateResolver {
    fn by_name(&self, name: &str) -> Option<&Template>;
}

impl TemplateResolver for WorkflowDoc {
    fn by_name(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// A document layered over shared templates (workflow templates and
/// cluster-scoped templates resolved by the caller). Document templates win.
pub struct TemplatePool<'a> {
    doc: &'a WorkflowDoc,
    shared: HashMap<String, Template>,
}

impl<'a> TemplatePool<'a> {
    pub fn new(doc: &'a WorkflowDoc) -> Self {
        TemplatePool {
            doc,
            shared: HashMap::new(),
        }
    }

    /// Add shared templates. A later template replaces an earlier one of the same name.
    pub fn with_shared(mut self, templates: impl IntoIterator<Item = Template>) -> Self {
        for t in templates {
            self.shared.insert(t.name.clone(), t);
        }
        self
    }
}

impl TemplateResolver for TemplatePool<'_> {
    fn by_name(&self, name: &str) -> Option<&Template> {
        self.doc.by_name(name).or_else(|| self.shared.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::types::Suspend;

    fn template(name: &str, daemon: bool) -> Template {
        Template {
            name: name.into(),
            suspend: Some(Suspend::default()),
            daemon: Some(daemon),
            ..Default::default()
        }
    }

    #[test]
    fn document_templates_take_precedence() {
        let doc = WorkflowDoc {
            templates: vec![template("a", true)],
            ..Default::default()
        };
        let pool = TemplatePool::new(&doc).with_shared([template("a", false), template("b", false)]);
        assert!(pool.by_name("a").unwrap().is_daemon());
        assert!(pool.by_name("b").is_some());
        assert!(pool.by_name("c").is_none());
    }
}
