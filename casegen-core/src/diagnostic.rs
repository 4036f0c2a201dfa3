//! Diagnostics emitted during compilation and resolution
//!
//! Diagnostics are values appended to a [`Diagnostics`] sink owned by one
//! compilation. The host decides how to surface them; every push is also
//! mirrored as a `tracing` event.

use crate::EvalError;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note
    Info,
    /// Resolution continued with a degraded result
    Warning,
    /// One instance was dropped
    Error,
}

/// Context about where a diagnostic originated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// Subject being resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Concrete bindings of the failing combination, in axis order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bindings: Vec<(String, String)>,

    /// Offending source text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Line number in the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Machine-readable code (see [`crate::codes`])
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub context: DiagnosticContext,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            context: DiagnosticContext::default(),
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Error diagnostic describing a failed evaluation
    pub fn from_eval_error(err: &EvalError) -> Self {
        Self::error(err.code(), err.to_string())
    }

    /// Builder: set subject context
    pub fn in_subject(mut self, subject: impl Into<String>) -> Self {
        self.context.subject = Some(subject.into());
        self
    }

    /// Builder: set bindings context
    pub fn with_bindings(mut self, bindings: Vec<(String, String)>) -> Self {
        self.context.bindings = bindings;
        self
    }

    /// Builder: set source context
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.context.source = Some(source.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.context.line = Some(line);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref subject) = self.context.subject {
            write!(f, " (subject: {})", subject)?;
        }
        if let Some(ref source) = self.context.source {
            write!(f, " in `{}`", source)?;
        }
        if !self.context.bindings.is_empty() {
            let bindings: Vec<String> = self
                .context
                .bindings
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " with {{{}}}", bindings.join(", "))?;
        }
        Ok(())
    }
}

/// Thread-safe, append-only diagnostic sink
#[derive(Debug, Default)]
pub struct Diagnostics {
    records: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A poisoned sink still holds every record pushed before the panic
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a diagnostic and mirror it to the tracing subscriber
    pub fn push(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::info!(code = %diagnostic.code, "{}", diagnostic),
            Severity::Warning => tracing::warn!(code = %diagnostic.code, "{}", diagnostic),
            Severity::Error => tracing::error!(code = %diagnostic.code, "{}", diagnostic),
        }
        self.lock().push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Copy of every record pushed so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
