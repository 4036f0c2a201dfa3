//! Expression parser
//!
//! Turns the source text of one embedded expression into an IR [`Node`], or a
//! [`ParseError`] with line and column. Line numbers are offset by the line
//! the expression starts on inside its template.

use crate::ir::{BinaryOp, CastType, Node, NodeKind, UnaryOp};
use casegen_core::Value;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::cell::RefCell;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "parser/expression.pest"]
struct ExpressionParser;

/// Syntax error in an embedded expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    // Precedence is defined lowest to highest.
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::rem, Assoc::Left))
            .op(Op::prefix(Rule::neg))
            .op(Op::postfix(Rule::cast_op))
    })
}

/// Parse one expression. `line` is the 1-based template line it starts on.
pub fn parse(source: &str, line: usize) -> Result<Node, ParseError> {
    let mut pairs = ExpressionParser::parse(Rule::main, source).map_err(|e| {
        let (l, c) = match e.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        ParseError {
            message: e.variant.message().to_string(),
            line: line + l - 1,
            column: c,
        }
    })?;

    let builder = IrBuilder {
        base_line: line,
        errors: RefCell::new(Vec::new()),
    };
    let expression = pairs
        .next()
        .and_then(|main| main.into_inner().next())
        .ok_or_else(|| ParseError {
            message: "empty expression".to_string(),
            line,
            column: 1,
        })?;
    let node = builder.build(expression);

    if let Some(first) = builder.errors.into_inner().into_iter().next() {
        return Err(first);
    }
    debug_assert!(!node.contains_error());
    Ok(node)
}

/// Converts pest pairs into IR. Malformed leaves become `NodeKind::Error`
/// and are reported through `errors`.
struct IrBuilder {
    base_line: usize,
    errors: RefCell<Vec<ParseError>>,
}

impl IrBuilder {
    fn line_of(&self, pair: &Pair<Rule>) -> usize {
        self.base_line + pair.as_span().start_pos().line_col().0 - 1
    }

    fn error(&self, pair: &Pair<Rule>, message: impl Into<String>) -> Node {
        let (l, c) = pair.as_span().start_pos().line_col();
        self.errors.borrow_mut().push(ParseError {
            message: message.into(),
            line: self.base_line + l - 1,
            column: c,
        });
        Node::new(NodeKind::Error, self.line_of(pair))
    }

    fn build(&self, pair: Pair<Rule>) -> Node {
        let line = self.line_of(&pair);
        match pair.as_rule() {
            Rule::expression => self.build_expression(pair.into_inner()),

            Rule::integer => match pair.as_str().parse::<i64>() {
                Ok(i) => Node::new(NodeKind::Literal(Value::Integer(i)), line),
                Err(_) => self.error(&pair, format!("integer literal out of range: {}", pair.as_str())),
            },

            Rule::float => match pair.as_str().parse::<f64>() {
                Ok(x) if x.is_finite() => Node::new(NodeKind::Literal(Value::Float(x)), line),
                _ => self.error(&pair, format!("float literal out of range: {}", pair.as_str())),
            },

            Rule::string => {
                let raw = pair.clone().into_inner().next().map(|p| p.as_str()).unwrap_or("");
                Node::new(NodeKind::Literal(Value::Text(unescape(raw))), line)
            }

            Rule::identifier => Node::new(NodeKind::Identifier(pair.as_str().to_string()), line),

            Rule::call => {
                let mut inner = pair.into_inner();
                let identifier = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                let args = inner.map(|p| self.build(p)).collect();
                Node::new(NodeKind::Call { identifier, args }, line)
            }

            Rule::qualified_call => {
                let mut inner = pair.into_inner();
                let module = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                let identifier = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
                let args = inner.map(|p| self.build(p)).collect();
                Node::new(NodeKind::QualifiedCall { module, identifier, args }, line)
            }

            Rule::slice => self.build_slice(pair),

            _ => {
                let rule = pair.as_rule();
                self.error(&pair, format!("unexpected {:?}", rule))
            }
        }
    }

    fn build_expression(&self, pairs: Pairs<Rule>) -> Node {
        pratt()
            .map_primary(|primary| self.build(primary))
            .map_prefix(|op, operand| {
                let line = self.line_of(&op);
                match op.as_rule() {
                    Rule::neg => Node::new(
                        NodeKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) },
                        line,
                    ),
                    _ => self.error(&op, "unknown prefix operator"),
                }
            })
            .map_infix(|left, op, right| {
                let binary = match op.as_rule() {
                    Rule::add => BinaryOp::Add,
                    Rule::sub => BinaryOp::Sub,
                    Rule::mul => BinaryOp::Mul,
                    Rule::div => BinaryOp::Div,
                    Rule::rem => BinaryOp::Rem,
                    _ => return self.error(&op, "unknown binary operator"),
                };
                let line = left.line;
                Node::new(
                    NodeKind::Binary { op: binary, left: Box::new(left), right: Box::new(right) },
                    line,
                )
            })
            .map_postfix(|operand, op| {
                let ty = op
                    .clone()
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::cast_type)
                    .map(|p| match p.as_str() {
                        "int" => Some(CastType::Int),
                        "float" => Some(CastType::Float),
                        "str" => Some(CastType::Str),
                        _ => None,
                    });
                match ty.flatten() {
                    Some(ty) => {
                        let line = operand.line;
                        Node::new(NodeKind::Cast { ty, operand: Box::new(operand) }, line)
                    }
                    None => self.error(&op, "unknown cast type"),
                }
            })
            .parse(pairs)
    }

    fn build_slice(&self, pair: Pair<Rule>) -> Node {
        let line = self.line_of(&pair);
        let mut identifier = String::new();
        let (mut start, mut end, mut step) = (None, None, None);

        for part in pair.into_inner() {
            let rule = part.as_rule();
            if rule == Rule::identifier {
                identifier = part.as_str().to_string();
                continue;
            }
            let text = part.as_str().trim();
            let Ok(bound) = text.parse::<i64>() else {
                return self.error(&part, format!("slice bound out of range: {}", text));
            };
            match rule {
                Rule::slice_start => start = Some(bound),
                Rule::slice_end => end = Some(bound),
                Rule::slice_step => step = Some(bound),
                _ => return self.error(&part, "unexpected slice component"),
            }
        }

        Node::new(
            NodeKind::Slice { identifier, start, end, step: step.unwrap_or(1) },
            line,
        )
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
