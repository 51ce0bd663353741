//! Variable scopes: dotted identifiers visible at a point in validation.

use std::collections::HashMap;

use tracing::trace;

/// Accepts any `{{item}}` / `{{item.<x>}}` reference when present.
pub const ANY_ITEM: &str = "item.*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeValue {
    /// Known to exist, value decided at runtime.
    Placeholder,
    /// Statically known value, used when simulating substitution.
    Literal(String),
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: HashMap<String, ScopeValue>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>) {
        let key = key.into();
        trace!(%key, "scope insert");
        self.entries.entry(key).or_insert(ScopeValue::Placeholder);
    }

    /// Insert a key with a known value. A literal replaces a placeholder.
    pub fn insert_literal(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into(), ScopeValue::Literal(value.into()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ScopeValue> {
        self.entries.get(key)
    }

    pub fn extend(&mut self, other: &Scope) {
        for (k, v) in &other.entries {
            self.entries.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Replace every `{{key}}` whose value is a known literal. Other tokens are left as is.
    pub fn substitute(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let token = rest[start + 2..start + 2 + len].trim();
            out.push_str(&rest[..start]);
            match self.entries.get(token) {
                Some(ScopeValue::Literal(v)) => out.push_str(v),
                _ => out.push_str(&rest[start..start + 2 + len + 2]),
            }
            rest = &rest[start + 2 + len + 2..];
        }
        out.push_str(rest);
        out
    }
}
