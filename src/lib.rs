pub mod dag;
pub mod error;
pub mod parse;
pub mod resolver;
pub mod validate;
pub mod wasm;

pub use error::{Diagnostic, DiagnosticKind, ParseError, ValidationResult};
pub use resolver::{TemplatePool, TemplateResolver};
pub use validate::{ExecutorKind, ValidateOpts, validate};
