//! casegen Plugin System
//!
//! Provides the trait for extending casegen with built-in functions callable
//! from template expressions, either unqualified (`upper(x)`) or through their
//! module (`str.upper(x)`).

mod traits;
mod registry;

pub use traits::{FunctionPlugin, FunctionMeta, ArgMeta};
pub use registry::FunctionRegistry;

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{FunctionPlugin, FunctionMeta, ArgMeta, FunctionRegistry};
    pub use casegen_core::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Shout;
    struct Whisper;

    static TEXT_ARG: [ArgMeta; 1] = [ArgMeta::required("text", "Text", "Input")];

    impl FunctionPlugin for Shout {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "shout",
                module: "voice",
                description: "Uppercase",
                usage: "shout(text)",
                args: &TEXT_ARG,
                returns: "Text",
                examples: &[],
            }
        }

        fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
            match args {
                [v] => Ok(Value::Text(v.to_string().to_uppercase())),
                _ => Err(EvalError::arity("shout", 1, args.len())),
            }
        }
    }

    impl FunctionPlugin for Whisper {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "whisper",
                module: "voice",
                description: "Lowercase",
                usage: "whisper(text)",
                args: &TEXT_ARG,
                returns: "Text",
                examples: &[],
            }
        }

        fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
            match args {
                [v] => Ok(Value::Text(v.to_string().to_lowercase())),
                _ => Err(EvalError::arity("whisper", 1, args.len())),
            }
        }
    }

    fn registry() -> FunctionRegistry {
        FunctionRegistry::new()
            .with_function(Shout)
            .with_module_function(Whisper)
    }

    #[test]
    fn test_global_call() {
        let r = registry();
        assert_eq!(r.call_function("shout", &["hi".into()]), Ok(Value::Text("HI".into())));
        assert_eq!(r.call_function("SHOUT", &["hi".into()]), Ok(Value::Text("HI".into())));
    }

    #[test]
    fn test_module_only_function_is_not_global() {
        let r = registry();
        assert!(r.get_function("whisper").is_none());
        assert_eq!(
            r.call_qualified("voice", "whisper", &["HI".into()]),
            Ok(Value::Text("hi".into()))
        );
    }

    #[test]
    fn test_unknown_function_suggests_similar() {
        let r = registry();
        match r.call_function("shot", &[]) {
            Err(EvalError::SymbolNotFound { name, suggestion }) => {
                assert_eq!(name, "shot");
                assert_eq!(suggestion.as_deref(), Some("shout"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_module() {
        let r = registry();
        assert!(matches!(
            r.call_qualified("nope", "shout", &[]),
            Err(EvalError::SymbolNotFound { ref name, .. }) if name == "nope.shout"
        ));
        assert!(matches!(
            r.call_qualified("voice", "sing", &[]),
            Err(EvalError::SymbolNotFound { ref name, .. }) if name == "voice.sing"
        ));
    }

    #[test]
    fn test_arity_propagates() {
        let r = registry();
        assert_eq!(r.call_function("shout", &[]), Err(EvalError::arity("shout", 1, 0)));
    }

    #[test]
    fn test_listing() {
        let r = registry();
        let names: Vec<&str> = r.list_functions(Some("voice")).iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["shout", "whisper"]);
        assert_eq!(r.modules(), vec!["voice"]);
        assert!(r.list_functions(Some("math")).is_empty());
    }
}
