//! Macro expansion
//!
//! A call binds actual arguments to the macro's formal arguments in a child
//! context and renders one body there. Nesting is bounded by the evaluator's
//! maximum depth, which is what stops self- and mutually-recursive macros.

use crate::context::Context;
use crate::eval::Evaluator;
use crate::symbols::Macro;
use crate::template::Template;
use casegen_core::{EvalError, Value};

/// A checked call: arity and depth verified, body selected
#[derive(Debug)]
pub struct MacroExpansion<'m> {
    pub definition: &'m Macro,
    pub body_index: usize,
    pub body: &'m Template,
    pub arguments: Vec<(String, Value)>,
}

impl<'a> Evaluator<'a> {
    pub fn prepare_expansion<'m>(
        &self,
        definition: &'m Macro,
        args: Vec<Value>,
        caller: &Context<'_>,
    ) -> Result<MacroExpansion<'m>, EvalError> {
        if args.len() != definition.formal_args.len() {
            return Err(EvalError::arity(
                &definition.identifier,
                definition.formal_args.len(),
                args.len(),
            ));
        }

        if caller.depth() >= self.max_depth {
            let mut path = caller.call_path().to_vec();
            path.push(definition.identifier.clone());
            return Err(EvalError::CyclicExpansion {
                path,
                limit: self.max_depth,
            });
        }

        let body_index = match caller.macro_choice(&definition.identifier) {
            Some(index) => index,
            None => {
                if definition.bodies.is_empty() {
                    return Err(EvalError::invalid_argument(format!(
                        "macro '{}' has no bodies",
                        definition.identifier
                    )));
                }
                if definition.bodies.len() > 1 {
                    self.warn_multiple(
                        format!("macro '{}' has no body selected; using body 0", definition.identifier),
                        None,
                    );
                }
                0
            }
        };
        let body = definition.bodies.get(body_index).ok_or_else(|| {
            EvalError::internal(format!(
                "body {} selected for macro '{}' with {} bodies",
                body_index,
                definition.identifier,
                definition.bodies.len()
            ))
        })?;

        let arguments = definition.formal_args.iter().cloned().zip(args).collect();
        Ok(MacroExpansion {
            definition,
            body_index,
            body,
            arguments,
        })
    }

    /// Expand a macro call; the rendered body is always text
    pub fn expand_macro(&self, definition: &Macro, args: Vec<Value>, caller: &Context<'_>) -> Result<Value, EvalError> {
        let expansion = self.prepare_expansion(definition, args, caller)?;
        tracing::trace!(
            macro_name = %definition.identifier,
            body = expansion.body_index,
            depth = caller.depth() + 1,
            "expanding macro"
        );

        let child = caller.child(&definition.identifier, expansion.arguments);
        expansion
            .body
            .resolve_one(self, &child)
            .map(Value::Text)
            .map_err(|failure| failure.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::symbols::{MacroSignature, SymbolTable};
    use casegen_core::Diagnostics;
    use casegen_plugin::FunctionRegistry;

    fn table(macros: &[(&str, &[&str])]) -> SymbolTable {
        let mut symbols = SymbolTable::new();
        for (signature, bodies) in macros {
            let bodies = bodies.iter().map(|b| Template::compile(b).unwrap()).collect();
            symbols
                .add_macro(Macro::new(MacroSignature::parse(signature).unwrap(), bodies))
                .unwrap();
        }
        symbols
    }

    fn run(source: &str, ctx: &Context<'_>, max_depth: usize) -> Result<Value, EvalError> {
        let functions = casegen_std::standard_registry();
        let diagnostics = Diagnostics::new();
        Evaluator::new(&functions, &diagnostics)
            .with_max_depth(max_depth)
            .evaluate(&parse(source, 1).unwrap(), ctx)
    }

    #[test]
    fn test_formal_args_shadow_caller() {
        let symbols = table(&[("show(x)", &["${x}:${y}"])]);
        let ctx = Context::root(&symbols)
            .with_binding("x", Value::Integer(9))
            .with_binding("y", Value::from("caller"));
        assert_eq!(run("show(5)", &ctx, 8).unwrap(), Value::from("5:caller"));
        assert_eq!(run("x", &ctx, 8).unwrap(), Value::Integer(9));
    }

    #[test]
    fn test_result_is_text() {
        let symbols = table(&[("two()", &["${1 + 1}"])]);
        let ctx = Context::root(&symbols);
        assert_eq!(run("two()", &ctx, 8).unwrap(), Value::from("2"));
        assert_eq!(run("two", &ctx, 8).unwrap(), Value::from("2"));
        assert_eq!(run("two() + 1", &ctx, 8).unwrap(), Value::from("21"));
        assert_eq!(run("two() as int + 1", &ctx, 8).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_body_choice() {
        let symbols = table(&[("kind()", &["alpha", "beta"])]);
        let ctx = Context::root(&symbols).with_macro_choice("kind", 1);
        assert_eq!(run("kind()", &ctx, 8).unwrap(), Value::from("beta"));
        let unbound = Context::root(&symbols);
        assert_eq!(run("kind()", &unbound, 8).unwrap(), Value::from("alpha"));
    }

    #[test]
    fn test_nested_macros() {
        let symbols = table(&[
            ("inner(v)", &["<${v}>"]),
            ("outer(v)", &["${inner(v + 1)}!"]),
        ]);
        let ctx = Context::root(&symbols);
        assert_eq!(run("outer(1)", &ctx, 8).unwrap(), Value::from("<2>!"));
    }

    #[test]
    fn test_arity_mismatch() {
        let symbols = table(&[("pair(a, b)", &["${a}${b}"])]);
        let ctx = Context::root(&symbols);
        assert!(matches!(
            run("pair(1)", &ctx, 8),
            Err(EvalError::ArityError { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_self_recursion_is_bounded() {
        let symbols = table(&[("again(n)", &["${again(n + 1)}"])]);
        let ctx = Context::root(&symbols);
        match run("again(0)", &ctx, 16) {
            Err(EvalError::CyclicExpansion { path, limit }) => {
                assert_eq!(limit, 16);
                assert_eq!(path.len(), 17);
                assert!(path.iter().all(|m| m == "again"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_mutual_recursion_is_bounded() {
        let symbols = table(&[("ping()", &["${pong()}"]), ("pong()", &["${ping()}"])]);
        let ctx = Context::root(&symbols);
        match run("ping()", &ctx, 5) {
            Err(EvalError::CyclicExpansion { path, .. }) => {
                assert_eq!(&path[..3], &["ping", "pong", "ping"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_zero_bodies() {
        let symbols = table(&[("nothing()", &[])]);
        let ctx = Context::root(&symbols);
        assert!(matches!(run("nothing()", &ctx, 8), Err(EvalError::InvalidArgument(_))));
    }

    #[test]
    fn test_prepare_reports_selection() {
        let symbols = table(&[("m(a)", &["x", "y"])]);
        let functions = FunctionRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&functions, &diagnostics);
        let ctx = Context::root(&symbols).with_macro_choice("m", 1);
        let definition = symbols.macro_def("m").unwrap();
        let expansion = evaluator
            .prepare_expansion(definition, vec![Value::Integer(1)], &ctx)
            .unwrap();
        assert_eq!(expansion.body_index, 1);
        assert_eq!(expansion.arguments, vec![("a".to_string(), Value::Integer(1))]);
    }
}
