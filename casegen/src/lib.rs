//! casegen - Combinatorial code generation
//!
//! A suite declares subjects whose name, code and outcomes are templates
//! with embedded `${ expression }` markers. Every combination of the
//! parameters and macro bodies a subject can see is rendered, and the
//! distinct results are collected into a [`ResolvedSuite`].

mod error;
pub mod ir;
pub mod parser;
pub mod slice;
pub mod symbols;
pub mod context;
pub mod eval;
mod expand;
pub mod template;
pub mod permute;
pub mod compile;
pub mod config;
pub mod resolve;
pub mod document;

pub use error::CompileError;
pub use ir::{BinaryOp, CastType, Node, NodeKind, UnaryOp};
pub use parser::ParseError;
pub use symbols::{Macro, MacroSignature, Parameter, SymbolTable};
pub use context::Context;
pub use eval::Evaluator;
pub use expand::MacroExpansion;
pub use template::{RenderFailure, Resolvable, Template};
pub use permute::{needed_contexts, Axis, AxisKind, AxisValues, ContextSpace, Permutations};
pub use compile::{
    compile, CompiledOutcome, CompiledSubject, CompiledSuite, MacroDefinition, OutcomeDefinition,
    ParameterDefinition, SubjectDefinition, SuiteDefinition,
};
pub use config::ResolverConfig;
pub use resolve::{ResolvedOutcome, ResolvedSubject, ResolvedSuite, SuiteResolver};
pub use document::{DocumentError, SuiteDocument};

use casegen_core::{Diagnostic, Diagnostics};
use casegen_plugin::{FunctionMeta, FunctionRegistry};
use std::sync::Arc;

/// Result of compiling and resolving one suite
#[derive(Debug, Clone)]
pub struct Resolution {
    pub suite: ResolvedSuite,
    /// Compile-time warnings followed by resolution diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

/// Main casegen engine
pub struct Casegen {
    functions: Arc<FunctionRegistry>,
    config: ResolverConfig,
}

impl Casegen {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self {
            functions: Arc::new(functions),
            config: ResolverConfig::default(),
        }
    }

    pub fn with_standard_library() -> Self {
        Self::new(casegen_std::standard_registry())
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn compile(&self, definition: &SuiteDefinition, diagnostics: &Diagnostics) -> Result<CompiledSuite, CompileError> {
        compile::compile(definition, &self.functions, diagnostics)
    }

    pub fn resolve(&self, suite: &CompiledSuite, diagnostics: &Diagnostics) -> ResolvedSuite {
        SuiteResolver::new(&self.functions, self.config.clone()).resolve_with(suite, diagnostics)
    }

    /// Compile and resolve in one step
    pub fn run(&self, definition: &SuiteDefinition) -> Result<Resolution, CompileError> {
        let diagnostics = Diagnostics::new();
        let compiled = self.compile(definition, &diagnostics)?;
        let suite = self.resolve(&compiled, &diagnostics);
        Ok(Resolution {
            suite,
            diagnostics: diagnostics.into_vec(),
        })
    }

    pub fn list_functions(&self, module: Option<&str>) -> Vec<FunctionMeta> {
        self.functions.list_functions(module)
    }
}

impl Default for Casegen {
    fn default() -> Self {
        Self::with_standard_library()
    }
}
