//! casegen Core - Fundamental types
//!
//! This crate provides the core types used throughout casegen:
//! - `Value`: Runtime scalars (text, integer, float)
//! - `EvalError`: Per-combination evaluation failures
//! - `Diagnostic`: Structured records collected during a compilation

mod value;
mod error;
mod diagnostic;

pub use value::Value;
pub use error::{EvalError, codes};
pub use diagnostic::{Diagnostic, DiagnosticContext, Diagnostics, Severity};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Value, EvalError, Diagnostic, Diagnostics, Severity};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod value_tests {
        use super::*;

        #[test]
        fn test_infer_integer() {
            assert_eq!(Value::infer("42"), Value::Integer(42));
            assert_eq!(Value::infer("-7"), Value::Integer(-7));
        }

        #[test]
        fn test_infer_float() {
            assert_eq!(Value::infer("3.5"), Value::Float(3.5));
            assert_eq!(Value::infer("1e3"), Value::Float(1000.0));
        }

        #[test]
        fn test_infer_text() {
            assert_eq!(Value::infer("abc"), Value::Text("abc".to_string()));
            assert_eq!(Value::infer(" 5"), Value::Text(" 5".to_string()));
            assert_eq!(Value::infer(""), Value::Text(String::new()));
        }

        #[test]
        fn test_infer_non_finite_stays_text() {
            assert_eq!(Value::infer("nan"), Value::Text("nan".to_string()));
            assert_eq!(Value::infer("inf"), Value::Text("inf".to_string()));
        }

        #[test]
        fn test_display() {
            assert_eq!(Value::Integer(2).to_string(), "2");
            assert_eq!(Value::Float(2.0).to_string(), "2.0");
            assert_eq!(Value::Float(0.25).to_string(), "0.25");
            assert_eq!(Value::Text("x y".into()).to_string(), "x y");
        }

        #[test]
        fn test_display_large_floats_use_exponent() {
            assert_eq!(Value::Float(1e16).to_string(), "1e16");
            assert_eq!(Value::Float(1e300).to_string(), "1e300");
            assert_eq!(Value::Float(-1.5e20).to_string(), "-1.5e20");
            assert_eq!(Value::Float(9e15).to_string(), "9000000000000000.0");
        }

        #[test]
        fn test_display_reinfers_to_same_type() {
            for v in [
                Value::Integer(-3),
                Value::Float(1.5),
                Value::Float(10.0),
                Value::Float(1e16),
                Value::Float(-2.5e300),
            ] {
                assert_eq!(Value::infer(&v.to_string()), v);
            }
        }

        #[test]
        fn test_numeric_view() {
            assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
            assert_eq!(Value::Text("3".into()).as_f64(), None);
            assert!(Value::Float(1.0).is_numeric());
            assert!(!Value::Text("1".into()).is_numeric());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_codes() {
            assert_eq!(EvalError::symbol_not_found("x").code(), codes::SYMBOL_NOT_FOUND);
            assert_eq!(EvalError::arity("f", 1, 2).code(), codes::ARITY_ERROR);
            assert_eq!(EvalError::invalid_argument("step").code(), codes::INVALID_ARGUMENT);
        }

        #[test]
        fn test_messages() {
            let err = EvalError::symbol_not_found("uper").with_suggestion("upper");
            assert_eq!(err.to_string(), "Unknown symbol: uper (similar: upper)");

            let err = EvalError::CyclicExpansion {
                path: vec!["a".into(), "b".into(), "a".into()],
                limit: 2,
            };
            assert_eq!(err.to_string(), "Macro expansion exceeded depth 2: a -> b -> a");

            assert_eq!(EvalError::arity("m", 2, 1).to_string(), "m() expects 2 arguments, got 1");
        }

        #[test]
        fn test_suggestion_only_applies_to_missing_symbols() {
            let err = EvalError::type_error("Integer", "Text").with_suggestion("nope");
            assert_eq!(err, EvalError::TypeError("expected Integer, got Text".into()));
        }
    }

    mod diagnostic_tests {
        use super::*;

        #[test]
        fn test_sink_counts() {
            let sink = Diagnostics::new();
            sink.push(Diagnostic::warning(codes::MULTIPLE_VALUES, "first value used"));
            sink.push(Diagnostic::from_eval_error(&EvalError::symbol_not_found("y")).in_subject("s"));
            assert_eq!(sink.len(), 2);
            assert_eq!(sink.count(Severity::Error), 1);
            assert!(sink.has_errors());

            let records = sink.into_vec();
            assert_eq!(records[1].context.subject.as_deref(), Some("s"));
            assert_eq!(records[1].code, codes::SYMBOL_NOT_FOUND);
        }

        #[test]
        fn test_display_includes_context() {
            let d = Diagnostic::error(codes::TYPE_ERROR, "bad")
                .in_subject("add")
                .with_source("a - b")
                .with_bindings(vec![("a".into(), "1".into()), ("b".into(), "x".into())]);
            assert_eq!(d.to_string(), "[TYPE_ERROR] bad (subject: add) in `a - b` with {a=1, b=x}");
        }

        #[test]
        fn test_serialize_skips_empty_context() {
            let d = Diagnostic::info("NOTE", "hello");
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, r#"{"severity":"info","code":"NOTE","message":"hello","context":{}}"#);
        }
    }
}
