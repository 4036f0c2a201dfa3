//! Template resolver
//!
//! A raw template is text with embedded `${ expression }` markers. Parsing
//! splits it into a format skeleton with positional placeholders (`{0}`,
//! `{1}`, ...; literal braces doubled) and the ordered expression sources.
//! `$${` writes a literal `${`.

use crate::context::Context;
use crate::error::CompileError;
use crate::eval::Evaluator;
use crate::ir::Node;
use crate::parser;
use casegen_core::EvalError;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(usize),
}

/// Template fragment with embedded expressions, not yet evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct Resolvable {
    skeleton: String,
    expressions: Vec<String>,
    /// 1-based template line each expression starts on
    lines: Vec<usize>,
    segments: Vec<Segment>,
}

impl Resolvable {
    /// Scan a raw template for `${...}` markers
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let mut skeleton = String::with_capacity(raw.len());
        let mut expressions = Vec::new();
        let mut lines = Vec::new();
        let mut line = 1;
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '$' if chars.peek() == Some(&'$') => {
                    chars.next();
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        skeleton.push_str("${{");
                    } else {
                        skeleton.push_str("$$");
                    }
                }
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    let start_line = line;
                    let Some(body) = scan_expression(&mut chars, &mut line) else {
                        return Err(CompileError::MalformedTemplate {
                            line: start_line,
                            message: "unterminated `${`".to_string(),
                        });
                    };
                    let trimmed = body.trim();
                    if trimmed.is_empty() {
                        return Err(CompileError::MalformedTemplate {
                            line: start_line,
                            message: "empty `${}`".to_string(),
                        });
                    }
                    let leading = &body[..body.len() - body.trim_start().len()];
                    lines.push(start_line + leading.matches('\n').count());
                    skeleton.push_str(&format!("{{{}}}", expressions.len()));
                    expressions.push(trimmed.to_string());
                }
                '{' => skeleton.push_str("{{"),
                '}' => skeleton.push_str("}}"),
                '\n' => {
                    line += 1;
                    skeleton.push(c);
                }
                _ => skeleton.push(c),
            }
        }

        let mut resolvable = Self::from_parts(skeleton, expressions)?;
        resolvable.lines = lines;
        Ok(resolvable)
    }

    /// Build from a skeleton and its expressions, checking that placeholders
    /// `{0}..{n-1}` appear once each, in order, for `n` expressions
    pub fn from_parts(skeleton: impl Into<String>, expressions: Vec<String>) -> Result<Self, CompileError> {
        let skeleton = skeleton.into();
        let segments = split_skeleton(&skeleton)?;
        let placeholders: Vec<usize> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(i) => Some(*i),
                Segment::Text(_) => None,
            })
            .collect();

        let in_order = placeholders.iter().enumerate().all(|(pos, i)| pos == *i);
        if placeholders.len() != expressions.len() || !in_order {
            return Err(CompileError::TemplateMismatch {
                placeholders: placeholders.len(),
                expressions: expressions.len(),
            });
        }

        let lines = vec![1; expressions.len()];
        Ok(Self { skeleton, expressions, lines, segments })
    }

    pub fn skeleton(&self) -> &str {
        &self.skeleton
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn is_constant(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Substitute rendered expression values positionally
    pub fn render(&self, substitutions: &[String]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Placeholder(i) => {
                    if let Some(s) = substitutions.get(*i) {
                        out.push_str(s);
                    }
                }
            }
        }
        out
    }
}

/// Read up to the `}` closing a `${`; braces nest, quoted strings are opaque
fn scan_expression(chars: &mut Peekable<Chars<'_>>, line: &mut usize) -> Option<String> {
    let mut body = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if c == '\n' {
            *line += 1;
        }
        match quote {
            Some(q) => {
                body.push(c);
                if c == '\\' {
                    body.push(chars.next()?);
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    body.push(c);
                }
                '{' => {
                    depth += 1;
                    body.push(c);
                }
                '}' if depth == 0 => return Some(body),
                '}' => {
                    depth -= 1;
                    body.push(c);
                }
                _ => body.push(c),
            },
        }
    }
    None
}

fn split_skeleton(skeleton: &str) -> Result<Vec<Segment>, CompileError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut line = 1;
    let mut chars = skeleton.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(|d| d.is_ascii_digit()) {
                    digits.push(d);
                }
                let index = match (digits.parse::<usize>(), chars.next()) {
                    (Ok(i), Some('}')) => i,
                    _ => {
                        return Err(CompileError::MalformedTemplate {
                            line,
                            message: "placeholder must be `{N}`; write `{{` for a literal brace".to_string(),
                        })
                    }
                };
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(index));
            }
            '}' => {
                return Err(CompileError::MalformedTemplate {
                    line,
                    message: "unmatched `}`; write `}}` for a literal brace".to_string(),
                })
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                text.push(c);
            }
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Evaluation failure tied to the expression that caused it
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    pub error: EvalError,
    pub expression: String,
    pub line: usize,
}

/// A resolvable whose expressions have been parsed to IR
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    resolvable: Resolvable,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse the template text and every embedded expression
    pub fn compile(raw: &str) -> Result<Self, CompileError> {
        Self::from_resolvable(Resolvable::parse(raw)?)
    }

    pub fn from_resolvable(resolvable: Resolvable) -> Result<Self, CompileError> {
        let nodes = resolvable
            .expressions
            .iter()
            .zip(&resolvable.lines)
            .map(|(source, line)| {
                parser::parse(source, *line).map_err(|error| CompileError::Parse {
                    expression: source.clone(),
                    error,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { resolvable, nodes })
    }

    pub fn resolvable(&self) -> &Resolvable {
        &self.resolvable
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Visit every IR node of every expression
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        for node in &self.nodes {
            node.walk(f);
        }
    }

    /// Evaluate each expression once against `context` and substitute.
    ///
    /// Where an expression could take several values (an unbound parameter,
    /// slice or multi-body macro) the first is used and a warning recorded.
    pub fn resolve_one(&self, evaluator: &Evaluator<'_>, context: &Context<'_>) -> Result<String, RenderFailure> {
        let mut substitutions = Vec::with_capacity(self.nodes.len());
        for (node, source) in self.nodes.iter().zip(&self.resolvable.expressions) {
            let value = evaluator.evaluate(node, context).map_err(|error| RenderFailure {
                error,
                expression: source.clone(),
                line: node.line,
            })?;
            substitutions.push(value.to_string());
        }
        Ok(self.resolvable.render(&substitutions))
    }
}
