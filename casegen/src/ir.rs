//! Expression IR
//!
//! The tree produced by the expression parser. Pure data: evaluation lives in
//! [`crate::eval`]. Every node carries the template line it came from.

use casegen_core::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Identifier(String),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Call {
        identifier: String,
        args: Vec<Node>,
    },
    QualifiedCall {
        module: String,
        identifier: String,
        args: Vec<Node>,
    },
    Cast {
        ty: CastType,
        operand: Box<Node>,
    },
    /// `identifier[start:end:step]` over a parameter's candidate values
    Slice {
        identifier: String,
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    /// Malformed input; only ever seen inside the parser
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp { Add, Sub, Mul, Div, Rem }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp { Neg }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastType { Int, Float, Str }

impl Node {
    pub fn new(kind: NodeKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Pre-order traversal over this node and all of its children
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        match &self.kind {
            NodeKind::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            NodeKind::Unary { operand, .. } | NodeKind::Cast { operand, .. } => operand.walk(f),
            NodeKind::Call { args, .. } | NodeKind::QualifiedCall { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            NodeKind::Identifier(_)
            | NodeKind::Literal(_)
            | NodeKind::Slice { .. }
            | NodeKind::Error => {}
        }
    }

    pub fn contains_error(&self) -> bool {
        let mut found = false;
        self.walk(&mut |n| found |= matches!(n.kind, NodeKind::Error));
        found
    }
}

/// Canonical text of a slice, shared by every spelling of the same slice
pub fn slice_key(identifier: &str, start: Option<i64>, end: Option<i64>, step: i64) -> String {
    let bound = |b: Option<i64>| b.map(|v| v.to_string()).unwrap_or_default();
    format!("{}[{}:{}:{}]", identifier, bound(start), bound(end), step)
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 2,
        }
    }
}

impl std::fmt::Display for CastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CastType::Int => write!(f, "int"),
            CastType::Float => write!(f, "float"),
            CastType::Str => write!(f, "str"),
        }
    }
}

fn write_args(f: &mut std::fmt::Formatter<'_>, args: &[Node]) -> std::fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

/// Re-renders the node as expression source; parenthesised where needed
impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            NodeKind::Identifier(name) => write!(f, "{}", name),
            NodeKind::Literal(Value::Text(s)) => write!(f, "{:?}", s),
            NodeKind::Literal(v) => write!(f, "{}", v),
            NodeKind::Binary { op, left, right } => {
                let wrap = |n: &Node, right_side: bool| match &n.kind {
                    NodeKind::Binary { op: inner, .. } => {
                        inner.precedence() < op.precedence()
                            || (right_side && inner.precedence() == op.precedence())
                    }
                    _ => false,
                };
                if wrap(left, false) {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", op.symbol())?;
                if wrap(right, true) {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
            NodeKind::Unary { op: UnaryOp::Neg, operand } => match operand.kind {
                NodeKind::Binary { .. } => write!(f, "-({})", operand),
                _ => write!(f, "-{}", operand),
            },
            NodeKind::Call { identifier, args } => {
                write!(f, "{}(", identifier)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            NodeKind::QualifiedCall { module, identifier, args } => {
                write!(f, "{}.{}(", module, identifier)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            NodeKind::Cast { ty, operand } => match operand.kind {
                NodeKind::Binary { .. } | NodeKind::Unary { .. } => write!(f, "({}) as {}", operand, ty),
                _ => write!(f, "{} as {}", operand, ty),
            },
            NodeKind::Slice { identifier, start, end, step } => {
                write!(f, "{}", slice_key(identifier, *start, *end, *step))
            }
            NodeKind::Error => write!(f, "<error>"),
        }
    }
}
