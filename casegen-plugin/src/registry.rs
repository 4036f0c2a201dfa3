//! Function Registry

use crate::{FunctionMeta, FunctionPlugin};
use casegen_core::{EvalError, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Central registry of built-in functions
///
/// Functions live in a module (`str`, `math`, ...) and may additionally be
/// visible globally for unqualified calls. Names are case-insensitive.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    globals: HashMap<String, Arc<dyn FunctionPlugin>>,
    modules: HashMap<String, HashMap<String, Arc<dyn FunctionPlugin>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function globally and under its module
    pub fn with_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let meta = f.meta();
        let f: Arc<dyn FunctionPlugin> = Arc::new(f);
        self.globals.insert(meta.name.to_lowercase(), Arc::clone(&f));
        self.insert_module_function(meta, f);
        self
    }

    /// Register a function reachable only through a qualified call
    pub fn with_module_function<F: FunctionPlugin + 'static>(mut self, f: F) -> Self {
        let meta = f.meta();
        self.insert_module_function(meta, Arc::new(f));
        self
    }

    fn insert_module_function(&mut self, meta: FunctionMeta, f: Arc<dyn FunctionPlugin>) {
        self.modules
            .entry(meta.module.to_lowercase())
            .or_default()
            .insert(meta.name.to_lowercase(), f);
    }

    pub fn get_function(&self, name: &str) -> Option<&dyn FunctionPlugin> {
        self.globals.get(&name.to_lowercase()).map(|f| f.as_ref())
    }

    pub fn get_qualified(&self, module: &str, name: &str) -> Option<&dyn FunctionPlugin> {
        self.modules
            .get(&module.to_lowercase())?
            .get(&name.to_lowercase())
            .map(|f| f.as_ref())
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains_key(&module.to_lowercase())
    }

    /// Call a globally visible function
    pub fn call_function(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match self.get_function(name) {
            Some(f) => f.call(args),
            None => Err(self.not_found(name, self.globals.keys())),
        }
    }

    /// Call a function restricted to one module
    pub fn call_qualified(&self, module: &str, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let Some(functions) = self.modules.get(&module.to_lowercase()) else {
            return Err(self.not_found(&format!("{}.{}", module, name), std::iter::empty()));
        };
        match functions.get(&name.to_lowercase()) {
            Some(f) => f.call(args),
            None => Err(self
                .not_found(name, functions.keys())
                .with_module_prefix(module)),
        }
    }

    fn not_found<'a>(&self, name: &str, candidates: impl Iterator<Item = &'a String>) -> EvalError {
        let similar = Self::find_similar(name, candidates);
        let err = EvalError::symbol_not_found(name);
        if similar.is_empty() {
            err
        } else {
            let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
            err.with_suggestion(suggestions.join(", "))
        }
    }

    /// Names similar to the given one, best match first
    pub fn similar_functions(&self, name: &str) -> Vec<String> {
        Self::find_similar(name, self.globals.keys())
    }

    fn find_similar<'a>(name: &str, candidates: impl Iterator<Item = &'a String>) -> Vec<String> {
        let name_lower = name.to_lowercase();
        let mut matches: Vec<(String, usize)> = candidates
            .filter_map(|candidate| {
                let score = Self::similarity_score(&name_lower, candidate);
                // Require more than incidental character overlap
                if score >= 10 {
                    Some((candidate.clone(), score))
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        matches.into_iter().map(|(name, _)| name).collect()
    }

    fn similarity_score(query: &str, candidate: &str) -> usize {
        let mut score = 0;

        if candidate.starts_with(query) {
            score += 100;
        } else if candidate.contains(query) {
            score += 50;
        } else if query.contains(candidate) {
            score += 30;
        }

        let query_chars: HashSet<char> = query.chars().collect();
        let candidate_chars: HashSet<char> = candidate.chars().collect();
        let common = query_chars.intersection(&candidate_chars).count();
        score += common * 2;

        let len_diff = query.len().abs_diff(candidate.len());
        if len_diff < 5 && score > 0 {
            score += 5 - len_diff;
        }

        score
    }

    /// Metadata of every function, optionally restricted to one module, sorted by name
    pub fn list_functions(&self, module: Option<&str>) -> Vec<FunctionMeta> {
        let mut metas: Vec<FunctionMeta> = self
            .modules
            .iter()
            .filter(|(m, _)| module.map_or(true, |wanted| m.as_str() == wanted.to_lowercase()))
            .flat_map(|(_, functions)| functions.values().map(|f| f.meta()))
            .collect();
        metas.sort_by(|a, b| (a.module, a.name).cmp(&(b.module, b.name)));
        metas
    }

    /// Registered module names, sorted
    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|m| m.as_str()).collect();
        names.sort_unstable();
        names
    }
}

trait ModulePrefix {
    fn with_module_prefix(self, module: &str) -> Self;
}

impl ModulePrefix for EvalError {
    fn with_module_prefix(self, module: &str) -> Self {
        match self {
            EvalError::SymbolNotFound { name, suggestion } => EvalError::SymbolNotFound {
                name: format!("{}.{}", module, name),
                suggestion,
            },
            other => other,
        }
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("globals", &self.globals.len())
            .field("modules", &self.modules())
            .finish()
    }
}
