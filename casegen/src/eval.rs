//! Expression evaluator
//!
//! Evaluates IR against a [`Context`]. Every failure is an [`EvalError`]
//! scoped to the one context being rendered; the caller decides whether to
//! drop that instance.

use crate::context::Context;
use crate::ir::{slice_key, BinaryOp, CastType, Node, NodeKind, UnaryOp};
use crate::slice::slice;
use crate::symbols::SymbolTable;
use casegen_core::{codes, Diagnostic, Diagnostics, EvalError, Value};
use casegen_plugin::FunctionRegistry;

/// Default bound on nested macro expansions
pub const DEFAULT_MAX_DEPTH: usize = 256;

pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
    diagnostics: &'a Diagnostics,
    pub(crate) max_depth: usize,
    subject: Option<&'a str>,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry, diagnostics: &'a Diagnostics) -> Self {
        Self {
            functions,
            diagnostics,
            max_depth: DEFAULT_MAX_DEPTH,
            subject: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Attribute warnings to a subject
    pub fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn evaluate(&self, node: &Node, ctx: &Context<'_>) -> Result<Value, EvalError> {
        match &node.kind {
            NodeKind::Literal(value) => Ok(value.clone()),

            NodeKind::Identifier(name) => self.identifier(name, node, ctx),

            NodeKind::Binary { op, left, right } => {
                let left = self.evaluate(left, ctx)?;
                let right = self.evaluate(right, ctx)?;
                binary(*op, left, right)
            }

            NodeKind::Unary { op: UnaryOp::Neg, operand } => negate(self.evaluate(operand, ctx)?),

            NodeKind::Call { identifier, args } => {
                let args = self.evaluate_args(args, ctx)?;
                match ctx.symbols().macro_def(identifier) {
                    Some(definition) => self.expand_macro(definition, args, ctx),
                    None => self.functions.call_function(identifier, &args),
                }
            }

            NodeKind::QualifiedCall { module, identifier, args } => {
                let args = self.evaluate_args(args, ctx)?;
                self.functions.call_qualified(module, identifier, &args)
            }

            NodeKind::Cast { ty, operand } => cast(*ty, self.evaluate(operand, ctx)?),

            NodeKind::Slice { identifier, start, end, step } => {
                let key = slice_key(identifier, *start, *end, *step);
                if let Some(value) = ctx.slice_choice(&key) {
                    return Ok(value.clone());
                }
                let candidates = Self::candidates(node, ctx.symbols())?;
                let Some(first) = candidates.first() else {
                    return Err(EvalError::invalid_argument(format!("{} selects no values", key)));
                };
                if candidates.len() > 1 {
                    self.warn_multiple(
                        format!("{} is unbound; using its first value {}", key, first),
                        Some(node),
                    );
                }
                Ok(first.clone())
            }

            NodeKind::Error => Err(EvalError::internal("malformed expression reached the evaluator")),
        }
    }

    /// The narrowed value list a slice node selects from its parameter
    pub fn candidates(node: &Node, symbols: &SymbolTable) -> Result<Vec<Value>, EvalError> {
        match &node.kind {
            NodeKind::Slice { identifier, start, end, step } => {
                let parameter = symbols
                    .parameter(identifier)
                    .ok_or_else(|| EvalError::symbol_not_found(identifier.as_str()))?;
                slice(&parameter.values, *start, *end, *step)
            }
            _ => Err(EvalError::internal(format!("`{}` is not a slice", node))),
        }
    }

    fn evaluate_args(&self, args: &[Node], ctx: &Context<'_>) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|arg| self.evaluate(arg, ctx)).collect()
    }

    fn identifier(&self, name: &str, node: &Node, ctx: &Context<'_>) -> Result<Value, EvalError> {
        if let Some(value) = ctx.lookup(name) {
            return Ok(value.clone());
        }

        let symbols = ctx.symbols();
        if let Some(parameter) = symbols.parameter(name) {
            let Some(first) = parameter.values.first() else {
                return Err(EvalError::invalid_argument(format!("parameter '{}' has no values", name)));
            };
            if parameter.values.len() > 1 {
                self.warn_multiple(
                    format!("parameter '{}' is unbound; using its first value {}", name, first),
                    Some(node),
                );
            }
            return Ok(first.clone());
        }

        if let Some(definition) = symbols.macro_def(name) {
            return self.expand_macro(definition, Vec::new(), ctx);
        }

        Err(EvalError::symbol_not_found(name))
    }

    pub(crate) fn warn_multiple(&self, message: String, node: Option<&Node>) {
        let mut diagnostic = Diagnostic::warning(codes::MULTIPLE_VALUES, message);
        if let Some(node) = node {
            diagnostic = diagnostic.with_source(node.to_string()).at_line(node.line);
        }
        if let Some(subject) = self.subject {
            diagnostic = diagnostic.in_subject(subject);
        }
        self.diagnostics.push(diagnostic);
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
        (l, r) if l.is_numeric() && r.is_numeric() => {
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Err(EvalError::internal("numeric value without a float form"));
            };
            float_op(op, a, b)
        }
        _ if op == BinaryOp::Add => Ok(Value::Text(format!("{}{}", left, right))),
        _ => Err(EvalError::TypeError(format!(
            "'{}' needs numeric operands, got {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn integer_op(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => {
            return Err(EvalError::invalid_argument("division by zero"));
        }
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Rem => a.checked_rem(b),
    };
    result
        .map(Value::Integer)
        .ok_or_else(|| EvalError::invalid_argument(format!("integer overflow in {} {} {}", a, op.symbol(), b)))
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
            return Err(EvalError::invalid_argument("division by zero"));
        }
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
    };
    if !result.is_finite() {
        return Err(EvalError::invalid_argument(format!(
            "{} {} {} is not a finite number",
            a,
            op.symbol(),
            b
        )));
    }
    Ok(Value::Float(result))
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::invalid_argument(format!("integer overflow in -{}", i))),
        Value::Float(x) => Ok(Value::Float(-x)),
        Value::Text(_) => Err(EvalError::type_error("number", value.type_name())),
    }
}

/// Parse the display form of `value` as `ty`
fn cast(ty: CastType, value: Value) -> Result<Value, EvalError> {
    let text = value.to_string();
    match ty {
        CastType::Str => Ok(Value::Text(text)),
        CastType::Int => text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| EvalError::TypeError(format!("cannot cast '{}' to int", text))),
        CastType::Float => match text.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Value::Float(x)),
            _ => Err(EvalError::TypeError(format!("cannot cast '{}' to float", text))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::symbols::Parameter;
    use casegen_core::Severity;

    fn eval_in(source: &str, ctx: &Context<'_>) -> Result<Value, EvalError> {
        let functions = casegen_std::standard_registry();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&functions, &diagnostics);
        evaluator.evaluate(&parse(source, 1).unwrap(), ctx)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        let symbols = SymbolTable::new();
        eval_in(source, &Context::root(&symbols))
    }

    #[test]
    fn test_plus_is_polymorphic() {
        assert_eq!(eval("1 + 1").unwrap(), Value::Integer(2));
        assert_eq!(eval("\"a\" + 1").unwrap(), Value::from("a1"));
        assert_eq!(eval("1 + 0.5").unwrap(), Value::Float(1.5));
        assert_eq!(eval("'x' + 'y'").unwrap(), Value::from("xy"));
        assert_eq!(eval("2.0 + 'a'").unwrap(), Value::from("2.0a"));
    }

    #[test]
    fn test_numeric_operators() {
        assert_eq!(eval("7 / 2").unwrap(), Value::Integer(3));
        assert_eq!(eval("-7 / 2").unwrap(), Value::Integer(-3));
        assert_eq!(eval("7 % 3").unwrap(), Value::Integer(1));
        assert_eq!(eval("7.0 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(eval("2 * 3 - 1").unwrap(), Value::Integer(5));
        assert_eq!(eval("-(2 + 3)").unwrap(), Value::Integer(-5));
    }

    #[test]
    fn test_numeric_errors() {
        assert!(matches!(eval("'a' - 1"), Err(EvalError::TypeError(_))));
        assert!(matches!(eval("-'a'"), Err(EvalError::TypeError(_))));
        assert!(matches!(eval("1 / 0"), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(eval("1 % 0"), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(eval("1.5 / 0"), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(eval("9223372036854775807 + 1"), Err(EvalError::InvalidArgument(_))));
    }

    #[test]
    fn test_casts() {
        assert_eq!(eval("'42' as int").unwrap(), Value::Integer(42));
        assert_eq!(eval("3 as float").unwrap(), Value::Float(3.0));
        assert_eq!(eval("3 as str").unwrap(), Value::from("3"));
        assert_eq!(eval("('1' + '2') as int + 1").unwrap(), Value::Integer(13));
        assert!(matches!(eval("'4x' as int"), Err(EvalError::TypeError(_))));
        assert!(matches!(eval("2.5 as int"), Err(EvalError::TypeError(_))));
        assert!(matches!(eval("'nope' as float"), Err(EvalError::TypeError(_))));
    }

    #[test]
    fn test_calls() {
        assert_eq!(eval("upper('ab')").unwrap(), Value::from("AB"));
        assert_eq!(eval("str.upper('ab')").unwrap(), Value::from("AB"));
        assert_eq!(eval("math.max(1, 4, 2)").unwrap(), Value::Integer(4));
        assert!(matches!(eval("nope(1)"), Err(EvalError::SymbolNotFound { .. })));
        assert!(matches!(eval("math.upper('a')"), Err(EvalError::SymbolNotFound { .. })));
        assert!(matches!(eval("nomod.upper('a')"), Err(EvalError::SymbolNotFound { .. })));
    }

    #[test]
    fn test_identifiers() {
        let mut symbols = SymbolTable::new();
        symbols
            .add_parameter(Parameter::new("n", vec![Value::Integer(3), Value::Integer(4)]))
            .unwrap();
        let bound = Context::root(&symbols).with_binding("n", Value::Integer(4));
        assert_eq!(eval_in("n * 2", &bound).unwrap(), Value::Integer(8));
        assert!(matches!(eval_in("m", &bound), Err(EvalError::SymbolNotFound { .. })));
    }

    #[test]
    fn test_unbound_parameter_uses_first_value() {
        let mut symbols = SymbolTable::new();
        symbols
            .add_parameter(Parameter::new("n", vec![Value::Integer(3), Value::Integer(4)]))
            .unwrap();
        let functions = FunctionRegistry::new();
        let diagnostics = Diagnostics::new();
        let evaluator = Evaluator::new(&functions, &diagnostics).with_subject("s");
        let value = evaluator
            .evaluate(&parse("n", 1).unwrap(), &Context::root(&symbols))
            .unwrap();
        assert_eq!(value, Value::Integer(3));
        let records = diagnostics.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Warning);
        assert_eq!(records[0].code, codes::MULTIPLE_VALUES);
        assert_eq!(records[0].context.subject.as_deref(), Some("s"));
    }

    #[test]
    fn test_slices() {
        let mut symbols = SymbolTable::new();
        let letters = ["a", "b", "c", "d", "e"].iter().map(|s| Value::from(*s)).collect();
        symbols.add_parameter(Parameter::new("xs", letters)).unwrap();

        let node = parse("xs[1:4]", 1).unwrap();
        let candidates = Evaluator::candidates(&node, &symbols).unwrap();
        assert_eq!(candidates, vec![Value::from("b"), Value::from("c"), Value::from("d")]);

        let reversed = Evaluator::candidates(&parse("xs[::-1]", 1).unwrap(), &symbols).unwrap();
        assert_eq!(reversed.first(), Some(&Value::from("e")));

        let ctx = Context::root(&symbols).with_slice_choice("xs[1:4:1]", Value::from("c"));
        assert_eq!(eval_in("xs[1:4]", &ctx).unwrap(), Value::from("c"));
        assert_eq!(eval_in("xs[1:4:1]", &ctx).unwrap(), Value::from("c"));

        let root = Context::root(&symbols);
        assert_eq!(eval_in("xs[-1:]", &root).unwrap(), Value::from("e"));
        assert!(matches!(eval_in("xs[::0]", &root), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(eval_in("xs[4:1]", &root), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(eval_in("ys[1:]", &root), Err(EvalError::SymbolNotFound { .. })));
    }
}
