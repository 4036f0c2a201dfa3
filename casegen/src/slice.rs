//! Slice engine
//!
//! `list[start:end:step]` over an ordered list, with Python's semantics:
//! negative bounds count from the end, out-of-range bounds are clamped, and
//! omitted bounds default by the sign of `step`.

use casegen_core::EvalError;

/// Slice `values`. `step == 0` is an `InvalidArgument`.
pub fn slice<T: Clone>(values: &[T], start: Option<i64>, end: Option<i64>, step: i64) -> Result<Vec<T>, EvalError> {
    if step == 0 {
        return Err(EvalError::invalid_argument("slice step cannot be zero"));
    }
    if values.is_empty() {
        return Ok(Vec::new());
    }

    // i128 keeps `index + len` and `i + step` free of overflow for any i64 input
    let len = values.len() as i128;
    let step = step as i128;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

    let normalize = |bound: Option<i64>, default: i128| -> i128 {
        match bound {
            None => default,
            Some(b) => {
                let b = b as i128;
                let b = if b < 0 { b + len } else { b };
                b.clamp(lower, upper)
            }
        }
    };

    let mut out = Vec::new();
    if step > 0 {
        let (mut i, stop) = (normalize(start, 0), normalize(end, len));
        while i < stop {
            out.push(values[i as usize].clone());
            i += step;
        }
    } else {
        let (mut i, stop) = (normalize(start, len - 1), normalize(end, -1));
        while i > stop {
            out.push(values[i as usize].clone());
            i += step;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABCDE: [char; 5] = ['a', 'b', 'c', 'd', 'e'];

    fn s(start: Option<i64>, end: Option<i64>, step: i64) -> String {
        slice(&ABCDE, start, end, step).unwrap().into_iter().collect()
    }

    #[test]
    fn test_forward_range() {
        assert_eq!(s(Some(1), Some(4), 1), "bcd");
        assert_eq!(s(None, None, 1), "abcde");
        assert_eq!(s(None, None, 2), "ace");
        assert_eq!(s(Some(1), None, 3), "be");
    }

    #[test]
    fn test_reverse() {
        assert_eq!(s(None, None, -1), "edcba");
        assert_eq!(s(None, None, -2), "eca");
        assert_eq!(s(Some(3), Some(0), -1), "dcb");
        assert_eq!(s(Some(3), None, -1), "dcba");
    }

    #[test]
    fn test_negative_bounds() {
        assert_eq!(s(Some(-2), None, 1), "de");
        assert_eq!(s(None, Some(-1), 1), "abcd");
        assert_eq!(s(Some(-1), Some(-4), -1), "edc");
        assert_eq!(s(Some(-10), Some(2), 1), "ab");
        assert_eq!(s(None, Some(-10), -1), "edcba");
    }

    #[test]
    fn test_out_of_range_bounds_clamp() {
        assert_eq!(s(Some(2), Some(100), 1), "cde");
        assert_eq!(s(Some(100), None, -1), "edcba");
        assert_eq!(s(Some(100), None, 1), "");
        assert_eq!(s(Some(i64::MIN), Some(i64::MAX), i64::MAX), "a");
    }

    #[test]
    fn test_empty_ranges() {
        assert_eq!(s(Some(3), Some(1), 1), "");
        assert_eq!(s(Some(1), Some(3), -1), "");
    }

    #[test]
    fn test_empty_input() {
        let empty: [char; 0] = [];
        assert!(slice(&empty, Some(0), Some(5), 1).unwrap().is_empty());
        assert!(slice(&empty, None, None, -1).unwrap().is_empty());
    }

    #[test]
    fn test_zero_step() {
        assert!(matches!(slice(&ABCDE, None, None, 0), Err(EvalError::InvalidArgument(_))));
    }
}
