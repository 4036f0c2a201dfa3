//! Symbol table
//!
//! Parameters and macros visible to one subject. Suite-level and
//! subject-level definitions are merged by union, suite-level first.

use crate::error::CompileError;
use crate::template::Template;
use casegen_core::Value;
use std::collections::HashMap;

/// A named, ordered list of candidate values
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub identifier: String,
    pub values: Vec<Value>,
}

impl Parameter {
    pub fn new(identifier: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            identifier: identifier.into(),
            values,
        }
    }
}

/// A named, parameterised template with alternative bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub identifier: String,
    pub formal_args: Vec<String>,
    pub bodies: Vec<Template>,
}

impl Macro {
    pub fn new(signature: MacroSignature, bodies: Vec<Template>) -> Self {
        Self {
            identifier: signature.identifier,
            formal_args: signature.formal_args,
            bodies,
        }
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.identifier, self.formal_args.join(", "))
    }
}

/// `name(a, b)` as written in a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSignature {
    pub identifier: String,
    pub formal_args: Vec<String>,
}

impl MacroSignature {
    pub fn parse(signature: &str) -> Result<Self, CompileError> {
        let signature = signature.trim();
        let malformed = |message: &str| CompileError::malformed(signature, message);

        let (name, rest) = signature
            .split_once('(')
            .ok_or_else(|| malformed("expected `name(args)`"))?;
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| malformed("missing closing `)`"))?;

        let identifier = name.trim();
        if !is_identifier(identifier) {
            return Err(malformed("invalid macro name"));
        }

        let mut formal_args: Vec<String> = Vec::new();
        if !args.trim().is_empty() {
            for arg in args.split(',').map(str::trim) {
                if !is_identifier(arg) {
                    return Err(malformed(&format!("invalid argument name '{}'", arg)));
                }
                if formal_args.iter().any(|a| a == arg) {
                    return Err(malformed(&format!("duplicate argument '{}'", arg)));
                }
                formal_args.push(arg.to_string());
            }
        }

        Ok(Self {
            identifier: identifier.to_string(),
            formal_args,
        })
    }
}

/// Same lexical rule as the expression grammar's identifiers
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && s != "as"
}

/// Parameters and macros in declaration order, indexed by identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    parameters: Vec<Parameter>,
    macros: Vec<Macro>,
    parameter_index: HashMap<String, usize>,
    macro_index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter; identifiers are unique within one table
    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<(), CompileError> {
        if parameter.values.is_empty() {
            return Err(CompileError::malformed(&parameter.identifier, "parameter has no values"));
        }
        self.check_free(&parameter.identifier)?;
        self.parameter_index
            .insert(parameter.identifier.clone(), self.parameters.len());
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn add_macro(&mut self, definition: Macro) -> Result<(), CompileError> {
        self.check_free(&definition.identifier)?;
        self.macro_index
            .insert(definition.identifier.clone(), self.macros.len());
        self.macros.push(definition);
        Ok(())
    }

    fn check_free(&self, identifier: &str) -> Result<(), CompileError> {
        if self.parameter_index.contains_key(identifier) || self.macro_index.contains_key(identifier) {
            return Err(CompileError::malformed(identifier, "defined more than once"));
        }
        Ok(())
    }

    /// Union of `shared` and `local`: shared entries first, equal values and
    /// bodies kept once
    pub fn merged(shared: &SymbolTable, local: &SymbolTable) -> Result<SymbolTable, CompileError> {
        let mut table = shared.clone();

        for parameter in &local.parameters {
            if table.macro_index.contains_key(&parameter.identifier) {
                return Err(CompileError::malformed(
                    &parameter.identifier,
                    "declared as both a parameter and a macro",
                ));
            }
            match table.parameter_index.get(&parameter.identifier) {
                Some(&i) => {
                    let values = &mut table.parameters[i].values;
                    for value in &parameter.values {
                        if !values.contains(value) {
                            values.push(value.clone());
                        }
                    }
                }
                None => table.add_parameter(parameter.clone())?,
            }
        }

        for definition in &local.macros {
            if table.parameter_index.contains_key(&definition.identifier) {
                return Err(CompileError::malformed(
                    &definition.identifier,
                    "declared as both a parameter and a macro",
                ));
            }
            match table.macro_index.get(&definition.identifier) {
                Some(&i) => {
                    let existing = &mut table.macros[i];
                    if existing.formal_args != definition.formal_args {
                        return Err(CompileError::malformed(
                            &definition.identifier,
                            format!(
                                "conflicting signatures {} and {}",
                                existing.signature(),
                                definition.signature()
                            ),
                        ));
                    }
                    for body in &definition.bodies {
                        if !existing.bodies.contains(body) {
                            existing.bodies.push(body.clone());
                        }
                    }
                }
                None => table.add_macro(definition.clone())?,
            }
        }

        Ok(table)
    }

    pub fn parameter(&self, identifier: &str) -> Option<&Parameter> {
        self.parameter_index.get(identifier).map(|&i| &self.parameters[i])
    }

    pub fn macro_def(&self, identifier: &str) -> Option<&Macro> {
        self.macro_index.get(identifier).map(|&i| &self.macros[i])
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.macros.is_empty()
    }
}
