//! Helper functions for argument extraction
//!
//! Common utilities for checking argument counts and types.

use casegen_core::{EvalError, Value};

/// Fail unless exactly `expected` arguments were passed
pub fn expect_args(func: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::arity(func, expected, args.len()));
    }
    Ok(())
}

/// Fail unless between `min` and `max` arguments were passed
pub fn expect_args_between(func: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if args.len() < min { min } else { max };
        return Err(EvalError::arity(func, expected, args.len()));
    }
    Ok(())
}

/// Integer argument
pub fn require_int(value: &Value, func: &str, arg: &str) -> Result<i64, EvalError> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(arg_type(func, arg, "Integer", other.type_name())),
    }
}

/// Non-negative integer argument usable as a count
pub fn require_count(value: &Value, func: &str, arg: &str) -> Result<usize, EvalError> {
    let n = require_int(value, func, arg)?;
    usize::try_from(n).map_err(|_| {
        EvalError::invalid_argument(format!("{}(): {} must be non-negative, got {}", func, arg, n))
    })
}

/// Largest text, in bytes, a built-in may produce
pub const MAX_TEXT_LEN: usize = 1 << 24;

/// Byte length of `count` copies of `unit` bytes, bounded by [`MAX_TEXT_LEN`]
pub fn bounded_len(func: &str, unit: usize, count: usize) -> Result<usize, EvalError> {
    unit.checked_mul(count)
        .filter(|&n| n <= MAX_TEXT_LEN)
        .ok_or_else(|| {
            EvalError::invalid_argument(format!(
                "{}(): result would exceed {} bytes",
                func, MAX_TEXT_LEN
            ))
        })
}

/// Numeric argument (integer or float)
pub fn require_numeric<'a>(value: &'a Value, func: &str, arg: &str) -> Result<&'a Value, EvalError> {
    if value.is_numeric() {
        Ok(value)
    } else {
        Err(arg_type(func, arg, "Number", value.type_name()))
    }
}

pub fn arg_type(func: &str, arg: &str, expected: &str, got: &str) -> EvalError {
    EvalError::TypeError(format!(
        "{}() argument '{}': expected {}, got {}",
        func, arg, expected, got
    ))
}

/// Convert a finite float result back into a value, rejecting NaN/infinity
pub fn finite(func: &str, x: f64) -> Result<Value, EvalError> {
    if x.is_finite() {
        Ok(Value::Float(x))
    } else {
        Err(EvalError::invalid_argument(format!("{}(): result is not finite", func)))
    }
}

/// Integer result of rounding a float, if it fits
pub fn float_to_int(func: &str, x: f64) -> Result<Value, EvalError> {
    if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Ok(Value::Integer(x as i64))
    } else {
        Err(EvalError::invalid_argument(format!("{}(): {} does not fit an integer", func, x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_len() {
        assert_eq!(bounded_len("f", 2, 3), Ok(6));
        assert_eq!(bounded_len("f", 0, usize::MAX), Ok(0));
        assert!(matches!(bounded_len("f", 1, MAX_TEXT_LEN + 1), Err(EvalError::InvalidArgument(_))));
        assert!(matches!(bounded_len("f", 2, usize::MAX), Err(EvalError::InvalidArgument(_))));
    }
}
