//! Evaluation context
//!
//! A context is immutable once built. Macro expansion layers a child over
//! its caller; lookups fall through to the parent unless shadowed.

use crate::symbols::SymbolTable;
use casegen_core::Value;

#[derive(Debug, Clone)]
pub struct Context<'a> {
    symbols: &'a SymbolTable,
    parent: Option<&'a Context<'a>>,
    scope: Vec<(String, Value)>,
    macro_choices: Vec<(String, usize)>,
    slice_choices: Vec<(String, Value)>,
    call_path: Vec<String>,
}

impl<'a> Context<'a> {
    /// Empty top-level context over a subject's symbols
    pub fn root(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            parent: None,
            scope: Vec::new(),
            macro_choices: Vec::new(),
            slice_choices: Vec::new(),
            call_path: Vec::new(),
        }
    }

    pub fn with_binding(mut self, identifier: impl Into<String>, value: Value) -> Self {
        self.bind(identifier.into(), value);
        self
    }

    /// Select body `index` for every expansion of `macro_name`
    pub fn with_macro_choice(mut self, macro_name: impl Into<String>, index: usize) -> Self {
        let macro_name = macro_name.into();
        self.macro_choices.retain(|(m, _)| *m != macro_name);
        self.macro_choices.push((macro_name, index));
        self
    }

    /// Fix the value of the slice with canonical key `key`
    pub fn with_slice_choice(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.slice_choices.retain(|(k, _)| *k != key);
        self.slice_choices.push((key, value));
        self
    }

    fn bind(&mut self, identifier: String, value: Value) {
        self.scope.retain(|(name, _)| *name != identifier);
        self.scope.push((identifier, value));
    }

    /// Child scope for one macro expansion. `args` shadow caller bindings of
    /// the same name; everything else stays visible.
    pub fn child(&self, macro_name: &str, args: Vec<(String, Value)>) -> Context<'_> {
        let mut call_path = self.call_path.clone();
        call_path.push(macro_name.to_string());

        let mut child = Context {
            symbols: self.symbols,
            parent: Some(self),
            scope: Vec::with_capacity(args.len()),
            macro_choices: Vec::new(),
            slice_choices: Vec::new(),
            call_path,
        };
        for (name, value) in args {
            child.bind(name, value);
        }
        child
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        self.symbols
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Value> {
        self.scope
            .iter()
            .find(|(name, _)| name == identifier)
            .map(|(_, v)| v)
            .or_else(|| self.parent.and_then(|p| p.lookup(identifier)))
    }

    pub fn macro_choice(&self, macro_name: &str) -> Option<usize> {
        self.macro_choices
            .iter()
            .find(|(name, _)| name == macro_name)
            .map(|(_, i)| *i)
            .or_else(|| self.parent.and_then(|p| p.macro_choice(macro_name)))
    }

    pub fn slice_choice(&self, key: &str) -> Option<&Value> {
        self.slice_choices
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .or_else(|| self.parent.and_then(|p| p.slice_choice(key)))
    }

    /// Macros currently being expanded, outermost first
    pub fn call_path(&self) -> &[String] {
        &self.call_path
    }

    pub fn depth(&self) -> usize {
        self.call_path.len()
    }

    /// Every selection visible from here rendered as text, root first
    pub fn bindings(&self) -> Vec<(String, String)> {
        let mut out = self.parent.map(|p| p.bindings()).unwrap_or_default();
        out.extend(self.scope.iter().map(|(k, v)| (k.clone(), v.to_string())));
        out.extend(
            self.macro_choices
                .iter()
                .map(|(m, i)| (format!("{}()", m), format!("body {}", i))),
        );
        out.extend(self.slice_choices.iter().map(|(k, v)| (k.clone(), v.to_string())));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_shadows_and_inherits() {
        let symbols = SymbolTable::new();
        let root = Context::root(&symbols)
            .with_binding("x", Value::Integer(9))
            .with_binding("y", Value::from("kept"))
            .with_macro_choice("m", 1);

        let child = root.child("m", vec![("x".to_string(), Value::Integer(5))]);
        assert_eq!(child.lookup("x"), Some(&Value::Integer(5)));
        assert_eq!(child.lookup("y"), Some(&Value::from("kept")));
        assert_eq!(child.macro_choice("m"), Some(1));
        assert_eq!(child.call_path(), &["m".to_string()]);

        assert_eq!(root.lookup("x"), Some(&Value::Integer(9)));
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn test_rebinding_replaces() {
        let symbols = SymbolTable::new();
        let ctx = Context::root(&symbols)
            .with_binding("x", Value::Integer(1))
            .with_binding("x", Value::Integer(2))
            .with_slice_choice("xs[1::1]", Value::Integer(7));
        assert_eq!(ctx.lookup("x"), Some(&Value::Integer(2)));
        assert_eq!(ctx.slice_choice("xs[1::1]"), Some(&Value::Integer(7)));
        assert_eq!(
            ctx.bindings(),
            vec![
                ("x".to_string(), "2".to_string()),
                ("xs[1::1]".to_string(), "7".to_string()),
            ]
        );
    }
}
