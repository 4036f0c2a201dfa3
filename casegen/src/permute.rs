//! Permutation engine
//!
//! Every parameter, macro and slice visible to a subject is an axis. The
//! contexts a subject is rendered in are the cartesian product of those
//! axes, enumerated lazily with the first axis as the outermost loop.

use crate::compile::CompiledSubject;
use crate::config::ResolverConfig;
use crate::context::Context;
use crate::eval::Evaluator;
use crate::ir::{slice_key, Node, NodeKind};
use crate::symbols::SymbolTable;
use crate::template::Template;
use casegen_core::{EvalError, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum AxisValues {
    /// Parameter values or slice candidates
    Values(Vec<Value>),
    /// Number of alternative bodies of a macro
    Bodies(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Parameter,
    Macro,
    Slice,
}

/// One dimension of the product
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub kind: AxisKind,
    /// Parameter or macro identifier, or the canonical slice key
    pub key: String,
    pub values: AxisValues,
}

impl Axis {
    pub fn len(&self) -> usize {
        match &self.values {
            AxisValues::Values(values) => values.len(),
            AxisValues::Bodies(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Odometer over index tuples; the last position turns fastest
#[derive(Debug, Clone)]
pub struct Permutations {
    sizes: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Permutations {
    pub fn new(sizes: Vec<usize>) -> Self {
        let next = if sizes.contains(&0) {
            None
        } else {
            Some(vec![0; sizes.len()])
        };
        Self { sizes, next }
    }

    /// Size of the full product, saturating at `usize::MAX`
    pub fn total(&self) -> usize {
        if self.sizes.contains(&0) {
            return 0;
        }
        self.sizes.iter().fold(1usize, |acc, &n| acc.saturating_mul(n))
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for position in (0..following.len()).rev() {
            following[position] += 1;
            if following[position] < self.sizes[position] {
                self.next = Some(following);
                break;
            }
            following[position] = 0;
        }
        Some(current)
    }
}

/// The axes of one subject together with the symbols contexts borrow
#[derive(Debug, Clone)]
pub struct ContextSpace<'s> {
    symbols: &'s SymbolTable,
    axes: Vec<Axis>,
}

impl<'s> ContextSpace<'s> {
    pub fn new(symbols: &'s SymbolTable, axes: Vec<Axis>) -> Self {
        Self { symbols, axes }
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn len(&self) -> usize {
        self.permutations().total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn permutations(&self) -> Permutations {
        Permutations::new(self.axes.iter().map(Axis::len).collect())
    }

    /// Every context of the product, lazily
    pub fn contexts(&self) -> impl Iterator<Item = Context<'s>> + '_ {
        self.permutations().map(move |indices| self.context_at(&indices))
    }

    /// Context selecting `indices[i]` on axis `i`
    pub fn context_at(&self, indices: &[usize]) -> Context<'s> {
        let mut context = Context::root(self.symbols);
        for (axis, &index) in self.axes.iter().zip(indices) {
            context = match (&axis.values, axis.kind) {
                (AxisValues::Bodies(_), _) => context.with_macro_choice(&axis.key, index),
                (AxisValues::Values(values), AxisKind::Slice) => match values.get(index) {
                    Some(value) => context.with_slice_choice(&axis.key, value.clone()),
                    None => context,
                },
                (AxisValues::Values(values), _) => match values.get(index) {
                    Some(value) => context.with_binding(&axis.key, value.clone()),
                    None => context,
                },
            };
        }
        context
    }
}

/// Build the context space a subject must be rendered over.
///
/// Axis order: parameters, then macros (both suite-level first), then each
/// distinct slice in order of first appearance.
pub fn needed_contexts<'s>(
    subject: &'s CompiledSubject,
    config: &ResolverConfig,
) -> Result<ContextSpace<'s>, EvalError> {
    let symbols = &subject.symbols;
    let reachable = if config.prune_unreferenced_axes {
        Some(References::collect(subject))
    } else {
        None
    };
    let keep = |name: &str| reachable.as_ref().map_or(true, |r| r.names.contains(name));

    let mut axes: Vec<Axis> = Vec::new();
    for parameter in symbols.parameters() {
        if keep(&parameter.identifier) {
            axes.push(Axis {
                kind: AxisKind::Parameter,
                key: parameter.identifier.clone(),
                values: AxisValues::Values(parameter.values.clone()),
            });
        }
    }
    for definition in symbols.macros() {
        if keep(&definition.identifier) {
            axes.push(Axis {
                kind: AxisKind::Macro,
                key: definition.identifier.clone(),
                values: AxisValues::Bodies(definition.bodies.len()),
            });
        }
    }

    let mut seen = HashSet::new();
    let mut slices: Vec<&Node> = Vec::new();
    let mut templates: Vec<&Template> = subject.templates().collect();
    templates.extend(
        symbols
            .macros()
            .iter()
            .filter(|m| keep(&m.identifier))
            .flat_map(|m| m.bodies.iter()),
    );
    for template in templates {
        template.walk(&mut |node| {
            if let NodeKind::Slice { identifier, start, end, step } = &node.kind {
                if seen.insert(slice_key(identifier, *start, *end, *step)) {
                    slices.push(node);
                }
            }
        });
    }
    for node in slices {
        axes.push(Axis {
            kind: AxisKind::Slice,
            key: node.to_string(),
            values: AxisValues::Values(Evaluator::candidates(node, symbols)?),
        });
    }

    let space = ContextSpace::new(symbols, axes);
    tracing::debug!(
        subject = %subject.id,
        axes = space.axes().len(),
        contexts = space.len(),
        "built context space"
    );
    Ok(space)
}

/// Parameter and macro names a subject can reach, following macro bodies
struct References {
    names: HashSet<String>,
}

impl References {
    fn collect(subject: &CompiledSubject) -> Self {
        let symbols = &subject.symbols;
        let mut names = HashSet::new();
        let mut pending: Vec<String> = Vec::new();

        let visit = |template: &Template, formal_args: &[String], names: &mut HashSet<String>, pending: &mut Vec<String>| {
            template.walk(&mut |node| {
                let name = match &node.kind {
                    NodeKind::Identifier(name) if !formal_args.contains(name) => name,
                    NodeKind::Call { identifier, .. } => identifier,
                    _ => return,
                };
                if names.insert(name.clone()) && symbols.macro_def(name).is_some() {
                    pending.push(name.clone());
                }
            });
        };

        for template in subject.templates() {
            visit(template, &[], &mut names, &mut pending);
        }
        while let Some(name) = pending.pop() {
            if let Some(definition) = symbols.macro_def(&name) {
                for body in &definition.bodies {
                    visit(body, &definition.formal_args, &mut names, &mut pending);
                }
            }
        }
        Self { names }
    }
}
