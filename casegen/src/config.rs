//! Resolver configuration

use crate::eval::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Nested macro expansions allowed before `CyclicExpansion`
    pub max_expansion_depth: usize,
    /// Skip parameter and macro axes no template refers to
    pub prune_unreferenced_axes: bool,
    /// Resolve subjects on the rayon pool
    pub parallel: bool,
    /// Text prepended to every rendered code block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_expansion_depth: DEFAULT_MAX_DEPTH,
            prune_unreferenced_axes: false,
            parallel: false,
            preamble: None,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `CASEGEN_MAX_DEPTH`, `CASEGEN_PRUNE_AXES` and
    /// `CASEGEN_PARALLEL`
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable source; unparseable values are ignored
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = var("CASEGEN_MAX_DEPTH") {
            match raw.trim().parse() {
                Ok(depth) => self.max_expansion_depth = depth,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid CASEGEN_MAX_DEPTH"),
            }
        }
        if let Some(flag) = var("CASEGEN_PRUNE_AXES").as_deref().and_then(parse_flag) {
            self.prune_unreferenced_axes = flag;
        }
        if let Some(flag) = var("CASEGEN_PARALLEL").as_deref().and_then(parse_flag) {
            self.parallel = flag;
        }
        self
    }

    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    pub fn with_pruning(mut self, prune: bool) -> Self {
        self.prune_unreferenced_axes = prune;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(value = %other, "ignoring invalid boolean flag");
            None
        }
    }
}
