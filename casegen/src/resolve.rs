//! Suite resolver
//!
//! Renders every subject of a compiled suite in every context of its
//! permutation space. A context whose rendering fails is dropped with an
//! error diagnostic; the rest of the suite is unaffected.

use crate::compile::{CompiledSubject, CompiledSuite};
use crate::config::ResolverConfig;
use crate::context::Context;
use crate::eval::Evaluator;
use crate::permute::needed_contexts;
use crate::template::RenderFailure;
use casegen_core::{Diagnostic, Diagnostics, Severity};
use casegen_plugin::FunctionRegistry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One concrete rendering of a subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedSubject {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<ResolvedOutcome>,
}

/// Distinct resolved subjects in first-seen order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedSuite {
    pub name: String,
    pub configuration: BTreeMap<String, String>,
    subjects: Vec<ResolvedSubject>,
    #[serde(skip)]
    seen: HashSet<ResolvedSubject>,
}

impl ResolvedSuite {
    pub fn new(name: impl Into<String>, configuration: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            configuration,
            subjects: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add a subject unless an equal one is already present
    pub fn insert(&mut self, subject: ResolvedSubject) -> bool {
        if self.contains(&subject) {
            return false;
        }
        self.seen.insert(subject.clone());
        self.subjects.push(subject);
        true
    }

    pub fn contains(&self, subject: &ResolvedSubject) -> bool {
        self.seen.contains(subject)
    }

    pub fn subjects(&self) -> &[ResolvedSubject] {
        &self.subjects
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedSubject> {
        self.subjects.iter()
    }
}

impl PartialEq for ResolvedSuite {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.configuration == other.configuration && self.subjects == other.subjects
    }
}

impl<'a> IntoIterator for &'a ResolvedSuite {
    type Item = &'a ResolvedSubject;
    type IntoIter = std::slice::Iter<'a, ResolvedSubject>;

    fn into_iter(self) -> Self::IntoIter {
        self.subjects.iter()
    }
}

const MIN_WORKER_STACK: usize = 8 * 1024 * 1024;
const STACK_PER_EXPANSION: usize = 128 * 1024;

/// Worker stack size for a given expansion depth bound
fn worker_stack_size(max_depth: usize) -> usize {
    max_depth
        .saturating_add(1)
        .saturating_mul(STACK_PER_EXPANSION)
        .max(MIN_WORKER_STACK)
}

pub struct SuiteResolver<'f> {
    functions: &'f FunctionRegistry,
    config: ResolverConfig,
}

impl<'f> SuiteResolver<'f> {
    pub fn new(functions: &'f FunctionRegistry, config: ResolverConfig) -> Self {
        Self { functions, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a suite; diagnostics are only logged
    pub fn resolve(&self, suite: &CompiledSuite) -> ResolvedSuite {
        self.resolve_with(suite, &Diagnostics::new())
    }

    /// Resolve a suite, collecting diagnostics into `diagnostics`
    pub fn resolve_with(&self, suite: &CompiledSuite, diagnostics: &Diagnostics) -> ResolvedSuite {
        let errors_before = diagnostics.count(Severity::Error);

        let sequential = || -> Vec<Vec<ResolvedSubject>> {
            suite
                .subjects
                .iter()
                .map(|subject| self.resolve_subject(subject, diagnostics))
                .collect()
        };

        let per_subject = if self.config.parallel {
            // Each macro nesting level recurses through evaluate and
            // resolve_one, so worker stacks grow with the depth bound
            match rayon::ThreadPoolBuilder::new()
                .stack_size(worker_stack_size(self.config.max_expansion_depth))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    suite
                        .subjects
                        .par_iter()
                        .map(|subject| self.resolve_subject(subject, diagnostics))
                        .collect()
                }),
                Err(e) => {
                    tracing::warn!("failed to create thread pool ({e}), resolving sequentially");
                    sequential()
                }
            }
        } else {
            sequential()
        };

        let mut resolved = ResolvedSuite::new(&suite.id, suite.configuration.clone());
        let mut rendered = 0usize;
        for subject in per_subject.into_iter().flatten() {
            rendered += 1;
            resolved.insert(subject);
        }

        tracing::info!(
            suite = %suite.id,
            rendered,
            distinct = resolved.len(),
            dropped = diagnostics.count(Severity::Error) - errors_before,
            "resolved suite"
        );
        resolved
    }

    /// Every successful rendering of one subject, in context order
    pub fn resolve_subject(&self, subject: &CompiledSubject, diagnostics: &Diagnostics) -> Vec<ResolvedSubject> {
        let space = match needed_contexts(subject, &self.config) {
            Ok(space) => space,
            Err(error) => {
                diagnostics.push(Diagnostic::from_eval_error(&error).in_subject(&subject.id));
                return Vec::new();
            }
        };

        let evaluator = Evaluator::new(self.functions, diagnostics)
            .with_max_depth(self.config.max_expansion_depth)
            .with_subject(&subject.id);

        let mut out = Vec::new();
        let mut dropped = 0usize;
        for context in space.contexts() {
            match self.render(subject, &evaluator, &context) {
                Ok(resolved) => out.push(resolved),
                Err(failure) => {
                    dropped += 1;
                    diagnostics.push(
                        Diagnostic::from_eval_error(&failure.error)
                            .in_subject(&subject.id)
                            .with_bindings(context.bindings())
                            .with_source(failure.expression)
                            .at_line(failure.line),
                    );
                }
            }
        }

        tracing::debug!(
            subject = %subject.id,
            contexts = space.len(),
            rendered = out.len(),
            dropped,
            "resolved subject"
        );
        out
    }

    fn render(
        &self,
        subject: &CompiledSubject,
        evaluator: &Evaluator<'_>,
        context: &Context<'_>,
    ) -> Result<ResolvedSubject, RenderFailure> {
        let name = subject.name.resolve_one(evaluator, context)?;
        let mut code = subject.code.resolve_one(evaluator, context)?;
        if let Some(preamble) = &self.config.preamble {
            code = format!("{}\n{}", preamble, code);
        }

        let outcomes = subject
            .outcomes
            .iter()
            .map(|outcome| {
                Ok(ResolvedOutcome {
                    warning: outcome
                        .warning
                        .as_ref()
                        .map(|t| t.resolve_one(evaluator, context))
                        .transpose()?,
                    error: outcome
                        .error
                        .as_ref()
                        .map(|t| t.resolve_one(evaluator, context))
                        .transpose()?,
                })
            })
            .collect::<Result<Vec<_>, RenderFailure>>()?;

        Ok(ResolvedSubject { name, code, outcomes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, MacroDefinition, ParameterDefinition, SubjectDefinition, SuiteDefinition};
    use casegen_core::codes;

    fn run(suite: SuiteDefinition, config: ResolverConfig) -> (ResolvedSuite, Diagnostics) {
        let functions = casegen_std::standard_registry();
        let compiled = compile(&suite, &functions, &Diagnostics::new()).unwrap();
        let diagnostics = Diagnostics::new();
        let resolved = SuiteResolver::new(&functions, config).resolve_with(&compiled, &diagnostics);
        (resolved, diagnostics)
    }

    #[test]
    fn test_renders_every_combination() {
        let suite = SuiteDefinition::new("ops").with_subject(
            SubjectDefinition::new("add", "add_${a}_${b}", "assert_eq!(${a} + ${b}, ${a + b});")
                .with_parameter(ParameterDefinition::new("a", [1i64, 2]))
                .with_parameter(ParameterDefinition::new("b", [10i64, 20])),
        );
        let (resolved, diagnostics) = run(suite, ResolverConfig::default());
        let names: Vec<&str> = resolved.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["add_1_10", "add_1_20", "add_2_10", "add_2_20"]);
        assert_eq!(resolved.subjects()[3].code, "assert_eq!(2 + 20, 22);");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let suite = SuiteDefinition::new("s").with_subject(
            SubjectDefinition::new("t", "same", "fn f() {}")
                .with_parameter(ParameterDefinition::new("unused", [1i64, 2, 3])),
        );
        let (resolved, _) = run(suite, ResolverConfig::default());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.subjects()[0].code, "fn f() {}");
        assert!(resolved.contains(&resolved.subjects()[0]));
    }

    #[test]
    fn test_worker_stack_grows_with_depth() {
        assert_eq!(worker_stack_size(0), MIN_WORKER_STACK);
        assert_eq!(worker_stack_size(255), 256 * STACK_PER_EXPANSION);
        assert_eq!(worker_stack_size(usize::MAX), usize::MAX);
    }

    #[test]
    fn test_failing_context_is_isolated() {
        let suite = SuiteDefinition::new("s").with_subject(
            SubjectDefinition::new("t", "case_${kind()}", "${kind()}")
                .with_macro(MacroDefinition::new("kind()", ["a", "${missing}", "c"])),
        );
        let (resolved, diagnostics) = run(suite, ResolverConfig::default());
        assert_eq!(resolved.len(), 2);
        let records = diagnostics.into_vec();
        let errors: Vec<&Diagnostic> = records.iter().filter(|d| d.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, codes::SYMBOL_NOT_FOUND);
        assert_eq!(errors[0].context.subject.as_deref(), Some("t"));
        assert_eq!(errors[0].context.source.as_deref(), Some("kind()"));
        assert_eq!(
            errors[0].context.bindings,
            vec![("kind()".to_string(), "body 1".to_string())]
        );
    }

    #[test]
    fn test_failing_subject_does_not_stop_the_suite() {
        let suite = SuiteDefinition::new("s")
            .with_subject(
                SubjectDefinition::new("bad", "b", "${xs[::0]}")
                    .with_parameter(ParameterDefinition::new("xs", [1i64])),
            )
            .with_subject(SubjectDefinition::new("good", "g", "ok"));
        let (resolved, diagnostics) = run(suite, ResolverConfig::default());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.subjects()[0].name, "g");
        assert_eq!(diagnostics.count(Severity::Error), 1);
    }

    #[test]
    fn test_constant_template_is_unchanged() {
        let code = "fn main() {\n    println!(\"{}\", 1);\n}";
        let suite = SuiteDefinition::new("s").with_subject(SubjectDefinition::new("t", "main", code));
        let (resolved, _) = run(suite, ResolverConfig::default());
        assert_eq!(resolved.subjects()[0].code, code);
    }

    #[test]
    fn test_outcomes_and_preamble() {
        let suite = SuiteDefinition::new("s").with_subject(
            SubjectDefinition::new("t", "n${x}", "body")
                .with_parameter(ParameterDefinition::new("x", [1i64]))
                .with_outcome(None, Some("E${x + 1}")),
        );
        let (resolved, _) = run(suite, ResolverConfig::default().with_preamble("use std::fmt;"));
        let subject = &resolved.subjects()[0];
        assert_eq!(subject.code, "use std::fmt;\nbody");
        assert_eq!(
            subject.outcomes,
            vec![ResolvedOutcome { warning: None, error: Some("E2".to_string()) }]
        );
    }

    #[test]
    fn test_slices_become_axes() {
        let suite = SuiteDefinition::new("s").with_subject(
            SubjectDefinition::new("t", "${xs[::-1]}", "")
                .with_parameter(ParameterDefinition::new("xs", ["a", "b", "c"])),
        );
        let (resolved, _) = run(suite, ResolverConfig::default().with_pruning(true));
        let names: Vec<&str> = resolved.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let suite = SuiteDefinition::new("s")
            .with_parameter(ParameterDefinition::new("n", [1i64, 2, 3]))
            .with_subject(SubjectDefinition::new("a", "a${n}", "${n * 2}"))
            .with_subject(SubjectDefinition::new("b", "b${n}", "${n * 3}"))
            .with_subject(SubjectDefinition::new("c", "a${n}", "${n + n}"));
        let (sequential, _) = run(suite.clone(), ResolverConfig::default());
        let (parallel, _) = run(suite, ResolverConfig::default().with_parallel(true));
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 6);
    }

    #[test]
    fn test_serialized_shape() {
        let suite = SuiteDefinition::new("s")
            .with_configuration("lang", "rust")
            .with_subject(SubjectDefinition::new("t", "n", "c"));
        let (resolved, _) = run(suite, ResolverConfig::default());
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "s",
                "configuration": {"lang": "rust"},
                "subjects": [{"name": "n", "code": "c"}]
            })
        );
    }
}
