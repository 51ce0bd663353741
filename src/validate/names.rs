//! Name grammars and uniqueness of named collections.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Template, step and task names.
static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9]*$").expect("valid regex"));

/// Parameter and artifact names.
static PARAM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"));

pub const MAX_FIELD_NAME_LEN: usize = 128;
pub const MAX_WORKFLOW_NAME_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// `[A-Za-z0-9][-A-Za-z0-9]*`, at most 128 characters.
    Field,
    /// `[-A-Za-z0-9_]+`.
    Param,
}

/// Problems with a single name, empty when the name is valid.
pub fn name_errors(name: &str, grammar: Grammar) -> Vec<String> {
    let mut errs = Vec::new();
    match grammar {
        Grammar::Field => {
            if name.len() > MAX_FIELD_NAME_LEN {
                errs.push(format!(
                    "must be no more than {} characters",
                    MAX_FIELD_NAME_LEN
                ));
            }
            if !FIELD_NAME.is_match(name) {
                errs.push(
                    "name must consist of alpha-numeric characters or '-', and must start with an alpha-numeric character"
                        .to_string(),
                );
            }
        }
        Grammar::Param => {
            if !PARAM_NAME.is_match(name) {
                errs.push(
                    "name must consist of alpha-numeric characters, '_' or '-'".to_string(),
                );
            }
        }
    }
    errs
}

/// Check a collection of names for presence, grammar and uniqueness.
///
/// Returns the first offending item as `[index].name <problem>`.
pub fn check_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    grammar: Grammar,
) -> Option<String> {
    let mut seen = HashSet::new();
    for (i, name) in names.into_iter().enumerate() {
        if name.is_empty() {
            return Some(format!("[{}].name is required", i));
        }
        let errs = name_errors(name, grammar);
        if !errs.is_empty() {
            return Some(format!(
                "[{}].name: '{}' is invalid: {}",
                i,
                name,
                errs.join(";")
            ));
        }
        if !seen.insert(name) {
            return Some(format!("[{}].name '{}' is not unique", i, name));
        }
    }
    None
}
