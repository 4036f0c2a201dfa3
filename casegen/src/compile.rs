//! Suite compilation
//!
//! Turns a raw [`SuiteDefinition`] into a [`CompiledSuite`]: signatures and
//! templates parsed, symbol tables merged. Any structural problem aborts
//! the whole compilation with a [`CompileError`]. Calls that cannot succeed
//! (unknown functions, wrong macro arity) only produce warnings here; they
//! fail per context at resolution time.

use crate::error::CompileError;
use crate::ir::NodeKind;
use crate::symbols::{Macro, MacroSignature, Parameter, SymbolTable};
use crate::template::Template;
use casegen_core::{codes, Diagnostic, Diagnostics, Value};
use casegen_plugin::FunctionRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub identifier: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroDefinition {
    /// `name(arg, ...)`
    pub signature: String,
    pub bodies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDefinition {
    pub warning: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectDefinition {
    pub id: String,
    pub name: String,
    pub code: String,
    pub parameters: Vec<ParameterDefinition>,
    pub macros: Vec<MacroDefinition>,
    pub outcomes: Vec<OutcomeDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteDefinition {
    pub id: String,
    pub configuration: BTreeMap<String, String>,
    pub parameters: Vec<ParameterDefinition>,
    pub macros: Vec<MacroDefinition>,
    pub subjects: Vec<SubjectDefinition>,
}

impl ParameterDefinition {
    pub fn new(identifier: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            identifier: identifier.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl MacroDefinition {
    pub fn new(signature: impl Into<String>, bodies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            signature: signature.into(),
            bodies: bodies.into_iter().map(Into::into).collect(),
        }
    }
}

impl SubjectDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_macro(mut self, definition: MacroDefinition) -> Self {
        self.macros.push(definition);
        self
    }

    pub fn with_outcome(mut self, warning: Option<&str>, error: Option<&str>) -> Self {
        self.outcomes.push(OutcomeDefinition {
            warning: warning.map(str::to_string),
            error: error.map(str::to_string),
        });
        self
    }
}

impl SuiteDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_macro(mut self, definition: MacroDefinition) -> Self {
        self.macros.push(definition);
        self
    }

    pub fn with_subject(mut self, subject: SubjectDefinition) -> Self {
        self.subjects.push(subject);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOutcome {
    pub warning: Option<Template>,
    pub error: Option<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSubject {
    pub id: String,
    pub name: Template,
    pub code: Template,
    /// Suite-level and subject-level symbols, merged
    pub symbols: SymbolTable,
    pub outcomes: Vec<CompiledOutcome>,
}

impl CompiledSubject {
    /// Name, code and outcome templates in rendering order
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        [&self.name, &self.code].into_iter().chain(
            self.outcomes
                .iter()
                .flat_map(|o| o.warning.iter().chain(o.error.iter())),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSuite {
    pub id: String,
    pub configuration: BTreeMap<String, String>,
    pub subjects: Vec<CompiledSubject>,
}

/// Compile a suite, failing fast on the first structural error
pub fn compile(
    definition: &SuiteDefinition,
    functions: &FunctionRegistry,
    diagnostics: &Diagnostics,
) -> Result<CompiledSuite, CompileError> {
    let shared = symbol_table(&definition.parameters, &definition.macros)?;

    let subjects = definition
        .subjects
        .iter()
        .map(|subject| {
            compile_subject(subject, &shared, functions, diagnostics)
                .map_err(|e| e.in_subject(&subject.id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(suite = %definition.id, subjects = subjects.len(), "compiled suite");
    Ok(CompiledSuite {
        id: definition.id.clone(),
        configuration: definition.configuration.clone(),
        subjects,
    })
}

fn symbol_table(parameters: &[ParameterDefinition], macros: &[MacroDefinition]) -> Result<SymbolTable, CompileError> {
    let mut table = SymbolTable::new();
    for parameter in parameters {
        table.add_parameter(Parameter::new(&parameter.identifier, parameter.values.clone()))?;
    }
    for definition in macros {
        let signature = MacroSignature::parse(&definition.signature)?;
        let bodies = definition
            .bodies
            .iter()
            .map(|body| Template::compile(body))
            .collect::<Result<Vec<_>, _>>()?;
        table.add_macro(Macro::new(signature, bodies))?;
    }
    Ok(table)
}

fn compile_subject(
    subject: &SubjectDefinition,
    shared: &SymbolTable,
    functions: &FunctionRegistry,
    diagnostics: &Diagnostics,
) -> Result<CompiledSubject, CompileError> {
    let local = symbol_table(&subject.parameters, &subject.macros)?;
    let symbols = SymbolTable::merged(shared, &local)?;

    let optional = |raw: &Option<String>| raw.as_deref().map(Template::compile).transpose();
    let outcomes = subject
        .outcomes
        .iter()
        .map(|o| {
            Ok(CompiledOutcome {
                warning: optional(&o.warning)?,
                error: optional(&o.error)?,
            })
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let compiled = CompiledSubject {
        id: subject.id.clone(),
        name: Template::compile(&subject.name)?,
        code: Template::compile(&subject.code)?,
        symbols,
        outcomes,
    };
    check_references(&compiled, functions, diagnostics);
    Ok(compiled)
}

/// Warn about calls and names that will fail in every context
fn check_references(subject: &CompiledSubject, functions: &FunctionRegistry, diagnostics: &Diagnostics) {
    let symbols = &subject.symbols;
    let warn = |code: &str, message: String, source: String, line: usize| {
        diagnostics.push(
            Diagnostic::warning(code, message)
                .in_subject(&subject.id)
                .with_source(source)
                .at_line(line),
        );
    };

    let macro_bodies = symbols.macros().iter().flat_map(|m| m.bodies.iter());
    for (template, in_macro) in subject
        .templates()
        .map(|t| (t, false))
        .chain(macro_bodies.map(|t| (t, true)))
    {
        template.walk(&mut |node| match &node.kind {
            NodeKind::Call { identifier, args } => match symbols.macro_def(identifier) {
                Some(m) if m.formal_args.len() != args.len() => warn(
                    codes::ARITY_ERROR,
                    format!("{} called with {} arguments", m.signature(), args.len()),
                    node.to_string(),
                    node.line,
                ),
                Some(_) => {}
                None if functions.get_function(identifier).is_none() => {
                    let similar = functions.similar_functions(identifier);
                    let message = match similar.first() {
                        Some(best) => format!("no macro or function named '{}' (did you mean '{}'?)", identifier, best),
                        None => format!("no macro or function named '{}'", identifier),
                    };
                    warn(codes::SYMBOL_NOT_FOUND, message, node.to_string(), node.line)
                }
                None => {}
            },
            NodeKind::QualifiedCall { module, identifier, .. } => {
                if !functions.has_module(module) {
                    warn(
                        codes::SYMBOL_NOT_FOUND,
                        format!("no module named '{}'", module),
                        node.to_string(),
                        node.line,
                    );
                } else if functions.get_qualified(module, identifier).is_none() {
                    warn(
                        codes::SYMBOL_NOT_FOUND,
                        format!("no function '{}' in module '{}'", identifier, module),
                        node.to_string(),
                        node.line,
                    );
                }
            }
            NodeKind::Slice { identifier, .. } if symbols.parameter(identifier).is_none() => warn(
                codes::SYMBOL_NOT_FOUND,
                format!("slice of unknown parameter '{}'", identifier),
                node.to_string(),
                node.line,
            ),
            // Macro bodies may read their caller's bindings
            NodeKind::Identifier(name)
                if !in_macro && symbols.parameter(name).is_none() && symbols.macro_def(name).is_none() =>
            {
                warn(
                    codes::SYMBOL_NOT_FOUND,
                    format!("'{}' is not a parameter or macro", name),
                    node.to_string(),
                    node.line,
                )
            }
            _ => {}
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegen_core::Severity;

    fn compile_one(suite: SuiteDefinition) -> (Result<CompiledSuite, CompileError>, Vec<Diagnostic>) {
        let functions = casegen_std::standard_registry();
        let diagnostics = Diagnostics::new();
        let result = compile(&suite, &functions, &diagnostics);
        (result, diagnostics.into_vec())
    }

    #[test]
    fn test_compile_merges_symbols() {
        let suite = SuiteDefinition::new("s")
            .with_parameter(ParameterDefinition::new("x", [1i64, 2]))
            .with_macro(MacroDefinition::new("m(a)", ["${a}"]))
            .with_subject(
                SubjectDefinition::new("t", "case_${x}", "${m(x)}")
                    .with_parameter(ParameterDefinition::new("x", [2i64, 3]))
                    .with_outcome(Some("w${x}"), None),
            );
        let (result, diagnostics) = compile_one(suite);
        let compiled = result.unwrap();
        assert!(diagnostics.is_empty());
        let subject = &compiled.subjects[0];
        assert_eq!(subject.symbols.parameter("x").unwrap().values.len(), 3);
        assert_eq!(subject.templates().count(), 3);
    }

    #[test]
    fn test_structural_errors_name_the_subject() {
        let suite = SuiteDefinition::new("s").with_subject(
            SubjectDefinition::new("broken", "n", "x").with_macro(MacroDefinition::new("m(a, a)", ["x"])),
        );
        match compile_one(suite).0 {
            Err(CompileError::InSubject { subject, error }) => {
                assert_eq!(subject, "broken");
                assert!(matches!(*error, CompileError::MalformedDefinition { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let suite = SuiteDefinition::new("s").with_subject(SubjectDefinition::new("t", "n", "${1 +"));
        let err = compile_one(suite).0.unwrap_err();
        assert_eq!(err.code(), codes::MALFORMED_TEMPLATE);

        let suite = SuiteDefinition::new("s").with_parameter(ParameterDefinition::new("x", Vec::<i64>::new()));
        assert!(compile_one(suite).0.is_err());
    }

    #[test]
    fn test_static_reference_warnings() {
        let suite = SuiteDefinition::new("s")
            .with_parameter(ParameterDefinition::new("x", [1i64]))
            .with_macro(MacroDefinition::new("pair(a, b)", ["${a}${b}"]))
            .with_subject(SubjectDefinition::new(
                "t",
                "n",
                "${pair(x)} ${nope(1)} ${str.nope(1)} ${ys[1:]} ${missing}",
            ));
        let (result, diagnostics) = compile_one(suite);
        assert!(result.is_ok());
        let found: Vec<&str> = diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(
            found,
            vec![
                codes::ARITY_ERROR,
                codes::SYMBOL_NOT_FOUND,
                codes::SYMBOL_NOT_FOUND,
                codes::SYMBOL_NOT_FOUND,
                codes::SYMBOL_NOT_FOUND,
            ]
        );
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Warning));
        assert!(diagnostics.iter().all(|d| d.context.subject.as_deref() == Some("t")));
    }

    #[test]
    fn test_unknown_call_messages() {
        let suite = SuiteDefinition::new("s").with_subject(SubjectDefinition::new(
            "t",
            "n",
            "${uper('a')} ${text.upper('a')} ${str.uper('a')}",
        ));
        let (result, diagnostics) = compile_one(suite);
        assert!(result.is_ok());
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("did you mean 'upper'"));
        assert_eq!(messages[1], "no module named 'text'");
        assert_eq!(messages[2], "no function 'uper' in module 'str'");
    }
}
