//! Structural compilation errors
//!
//! A [`CompileError`] means the suite itself is ill-formed: nothing is
//! resolved. Per-combination failures are `casegen_core::EvalError` instead.

use crate::parser::ParseError;
use casegen_core::codes;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Bad macro signature, duplicate or empty parameter, conflicting merge
    #[error("Malformed definition of '{name}': {message}")]
    MalformedDefinition { name: String, message: String },

    /// Unterminated or empty `${...}` marker, stray brace in a skeleton
    #[error("Malformed template at line {line}: {message}")]
    MalformedTemplate { line: usize, message: String },

    #[error("Template has {placeholders} placeholders but {expressions} expressions")]
    TemplateMismatch { placeholders: usize, expressions: usize },

    #[error("Cannot parse `{expression}` at {error}")]
    Parse {
        expression: String,
        #[source]
        error: ParseError,
    },

    #[error("In subject '{subject}': {error}")]
    InSubject {
        subject: String,
        error: Box<CompileError>,
    },
}

impl CompileError {
    pub fn malformed(name: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::MalformedDefinition {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Builder: attribute the error to a subject
    pub fn in_subject(self, subject: impl Into<String>) -> Self {
        CompileError::InSubject {
            subject: subject.into(),
            error: Box::new(self),
        }
    }

    /// Machine-readable error code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MalformedDefinition { .. } => codes::MALFORMED_DEFINITION,
            CompileError::MalformedTemplate { .. } => codes::MALFORMED_TEMPLATE,
            CompileError::TemplateMismatch { .. } => codes::TEMPLATE_MISMATCH,
            CompileError::Parse { .. } => codes::PARSE_ERROR,
            CompileError::InSubject { error, .. } => error.code(),
        }
    }
}
