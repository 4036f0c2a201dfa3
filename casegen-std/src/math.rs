//! Core math functions

use casegen_plugin::prelude::*;
use crate::helpers::{expect_args, finite, float_to_int, require_numeric};

const MODULE: &str = "math";

pub struct Abs;
pub struct Min;
pub struct Max;
pub struct Pow;
pub struct Floor;
pub struct Ceil;
pub struct Round;

static X_ARG: [ArgMeta; 1] = [ArgMeta::required("x", "Number", "Value")];
static VALUES_ARG: [ArgMeta; 1] = [ArgMeta::required("values", "Number...", "One or more values")];
static POW_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("base", "Number", "Base value"),
    ArgMeta::required("exponent", "Number", "Exponent"),
];

impl FunctionPlugin for Abs {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "abs",
            module: MODULE,
            description: "Absolute value",
            usage: "abs(x)",
            args: &X_ARG,
            returns: "Number",
            examples: &["abs(-5) → 5", "abs(-2.5) → 2.5"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("abs", args, 1)?;
        match require_numeric(&args[0], "abs", "x")? {
            Value::Integer(i) => i
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| EvalError::invalid_argument("abs(): integer overflow")),
            other => finite("abs", other.as_f64().unwrap_or_default().abs()),
        }
    }
}

/// Shared fold for min/max: integers stay integers unless a float is involved
fn extremum(func: &str, args: &[Value], pick_left: fn(f64, f64) -> bool) -> Result<Value, EvalError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(EvalError::arity(func, 1, 0));
    };
    let mut best = require_numeric(first, func, "values")?.clone();
    for arg in rest {
        let candidate = require_numeric(arg, func, "values")?;
        let (b, c) = (best.as_f64().unwrap_or_default(), candidate.as_f64().unwrap_or_default());
        if !pick_left(b, c) {
            best = candidate.clone();
        }
    }
    let any_float = args.iter().any(|v| matches!(v, Value::Float(_)));
    match best {
        Value::Integer(i) if any_float => Ok(Value::Float(i as f64)),
        other => Ok(other),
    }
}

impl FunctionPlugin for Min {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "min",
            module: MODULE,
            description: "Smallest of the arguments",
            usage: "min(a, b, ...)",
            args: &VALUES_ARG,
            returns: "Number",
            examples: &["min(3, 1, 2) → 1"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        extremum("min", args, |best, candidate| best <= candidate)
    }
}

impl FunctionPlugin for Max {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "max",
            module: MODULE,
            description: "Largest of the arguments",
            usage: "max(a, b, ...)",
            args: &VALUES_ARG,
            returns: "Number",
            examples: &["max(3, 1, 2) → 3"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        extremum("max", args, |best, candidate| best >= candidate)
    }
}

impl FunctionPlugin for Pow {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pow",
            module: MODULE,
            description: "Raise base to exponent; exact for integer base and non-negative integer exponent",
            usage: "pow(base, exponent)",
            args: &POW_ARGS,
            returns: "Number",
            examples: &["pow(2, 10) → 1024", "pow(2, -1) → 0.5"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("pow", args, 2)?;
        let base = require_numeric(&args[0], "pow", "base")?;
        let exponent = require_numeric(&args[1], "pow", "exponent")?;
        if let (Value::Integer(b), Value::Integer(e)) = (base, exponent) {
            if let Ok(e) = u32::try_from(*e) {
                return b
                    .checked_pow(e)
                    .map(Value::Integer)
                    .ok_or_else(|| EvalError::invalid_argument("pow(): integer overflow"));
            }
        }
        let (b, e) = (base.as_f64().unwrap_or_default(), exponent.as_f64().unwrap_or_default());
        finite("pow", b.powf(e))
    }
}

fn rounding(func: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value, EvalError> {
    expect_args(func, args, 1)?;
    match require_numeric(&args[0], func, "x")? {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        other => float_to_int(func, op(other.as_f64().unwrap_or_default())),
    }
}

impl FunctionPlugin for Floor {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "floor",
            module: MODULE,
            description: "Round down to an integer",
            usage: "floor(x)",
            args: &X_ARG,
            returns: "Integer",
            examples: &["floor(3.7) → 3", "floor(-2.3) → -3"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        rounding("floor", args, f64::floor)
    }
}

impl FunctionPlugin for Ceil {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "ceil",
            module: MODULE,
            description: "Round up to an integer",
            usage: "ceil(x)",
            args: &X_ARG,
            returns: "Integer",
            examples: &["ceil(3.2) → 4", "ceil(-2.7) → -2"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        rounding("ceil", args, f64::ceil)
    }
}

impl FunctionPlugin for Round {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "round",
            module: MODULE,
            description: "Round half away from zero to an integer",
            usage: "round(x)",
            args: &X_ARG,
            returns: "Integer",
            examples: &["round(2.5) → 3", "round(-2.5) → -3"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        rounding("round", args, f64::round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs() {
        assert_eq!(Abs.call(&[Value::Integer(-5)]), Ok(Value::Integer(5)));
        assert_eq!(Abs.call(&[Value::Float(-2.5)]), Ok(Value::Float(2.5)));
        assert!(matches!(Abs.call(&[Value::Integer(i64::MIN)]), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(Abs.call(&["x".into()]), Err(EvalError::TypeError(_))));
    }

    #[test]
    fn test_min_max() {
        let ints = [Value::Integer(3), Value::Integer(1), Value::Integer(2)];
        assert_eq!(Min.call(&ints), Ok(Value::Integer(1)));
        assert_eq!(Max.call(&ints), Ok(Value::Integer(3)));
        assert_eq!(Max.call(&[Value::Integer(3), Value::Float(1.5)]), Ok(Value::Float(3.0)));
        assert_eq!(Min.call(&[]), Err(EvalError::arity("min", 1, 0)));
    }

    #[test]
    fn test_pow() {
        assert_eq!(Pow.call(&[Value::Integer(2), Value::Integer(10)]), Ok(Value::Integer(1024)));
        assert_eq!(Pow.call(&[Value::Integer(2), Value::Integer(-1)]), Ok(Value::Float(0.5)));
        assert!(matches!(
            Pow.call(&[Value::Integer(10), Value::Integer(40)]),
            Err(EvalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(Floor.call(&[Value::Float(-2.3)]), Ok(Value::Integer(-3)));
        assert_eq!(Ceil.call(&[Value::Float(3.2)]), Ok(Value::Integer(4)));
        assert_eq!(Round.call(&[Value::Float(2.5)]), Ok(Value::Integer(3)));
        assert_eq!(Round.call(&[Value::Integer(7)]), Ok(Value::Integer(7)));
    }
}
