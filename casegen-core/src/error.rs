//! Evaluation errors
//!
//! Every failure that can happen while rendering one combination of values is
//! an [`EvalError`]. The suite resolver recovers from these per combination;
//! they never abort a whole suite.

use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const SYMBOL_NOT_FOUND: &str = "SYMBOL_NOT_FOUND";
    pub const TYPE_ERROR: &str = "TYPE_ERROR";
    pub const ARITY_ERROR: &str = "ARITY_ERROR";
    pub const CYCLIC_EXPANSION: &str = "CYCLIC_EXPANSION";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const MALFORMED_DEFINITION: &str = "MALFORMED_DEFINITION";
    pub const MALFORMED_TEMPLATE: &str = "MALFORMED_TEMPLATE";
    pub const TEMPLATE_MISMATCH: &str = "TEMPLATE_MISMATCH";
    pub const PARSE_ERROR: &str = "PARSE_ERROR";
    pub const MULTIPLE_VALUES: &str = "MULTIPLE_VALUES";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Error raised while evaluating an expression against one context
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unknown symbol: {name}{}", suggestion_suffix(.suggestion))]
    SymbolNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("{name}() expects {expected} arguments, got {got}")]
    ArityError {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Macro expansion exceeded depth {limit}: {}", .path.join(" -> "))]
    CyclicExpansion { path: Vec<String>, limit: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed definition: {0}")]
    MalformedDefinition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (similar: {})", s),
        None => String::new(),
    }
}

impl EvalError {
    pub fn symbol_not_found(name: impl Into<String>) -> Self {
        EvalError::SymbolNotFound {
            name: name.into(),
            suggestion: None,
        }
    }

    /// Builder: attach a "did you mean" list to a `SymbolNotFound`
    pub fn with_suggestion(self, suggestion: impl Into<String>) -> Self {
        match self {
            EvalError::SymbolNotFound { name, .. } => EvalError::SymbolNotFound {
                name,
                suggestion: Some(suggestion.into()),
            },
            other => other,
        }
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        EvalError::TypeError(format!("expected {}, got {}", expected, got))
    }

    pub fn arity(name: impl Into<String>, expected: usize, got: usize) -> Self {
        EvalError::ArityError {
            name: name.into(),
            expected,
            got,
        }
    }

    pub fn invalid_argument(details: impl Into<String>) -> Self {
        EvalError::InvalidArgument(details.into())
    }

    pub fn internal(details: impl Into<String>) -> Self {
        EvalError::Internal(details.into())
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::SymbolNotFound { .. } => codes::SYMBOL_NOT_FOUND,
            EvalError::TypeError(_) => codes::TYPE_ERROR,
            EvalError::ArityError { .. } => codes::ARITY_ERROR,
            EvalError::CyclicExpansion { .. } => codes::CYCLIC_EXPANSION,
            EvalError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            EvalError::MalformedDefinition(_) => codes::MALFORMED_DEFINITION,
            EvalError::Internal(_) => codes::INTERNAL,
        }
    }
}
