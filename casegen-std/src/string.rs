//! String functions: case conversion, trimming, padding, joining
//!
//! Every argument is taken by its display form, so `upper(1)` is `"1"`.

use casegen_plugin::prelude::*;
use crate::helpers::{bounded_len, expect_args, expect_args_between, require_count};

const MODULE: &str = "str";

static TEXT_ARG: [ArgMeta; 1] = [ArgMeta::required("text", "Text", "Input text")];

// ============ Upper ============

pub struct Upper;

impl FunctionPlugin for Upper {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "upper",
            module: MODULE,
            description: "Convert text to uppercase",
            usage: "upper(text)",
            args: &TEXT_ARG,
            returns: "Text",
            examples: &["upper(\"int\") → \"INT\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("upper", args, 1)?;
        Ok(Value::Text(args[0].to_string().to_uppercase()))
    }
}

// ============ Lower ============

pub struct Lower;

impl FunctionPlugin for Lower {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "lower",
            module: MODULE,
            description: "Convert text to lowercase",
            usage: "lower(text)",
            args: &TEXT_ARG,
            returns: "Text",
            examples: &["lower(\"Int\") → \"int\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("lower", args, 1)?;
        Ok(Value::Text(args[0].to_string().to_lowercase()))
    }
}

// ============ Capitalize ============

pub struct Capitalize;

impl FunctionPlugin for Capitalize {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "capitalize",
            module: MODULE,
            description: "Uppercase the first character of text",
            usage: "capitalize(text)",
            args: &TEXT_ARG,
            returns: "Text",
            examples: &["capitalize(\"string\") → \"String\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("capitalize", args, 1)?;
        let s = args[0].to_string();
        let mut chars = s.chars();
        let out = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Ok(Value::Text(out))
    }
}

// ============ Trim ============

pub struct Trim;

impl FunctionPlugin for Trim {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "trim",
            module: MODULE,
            description: "Remove leading and trailing whitespace",
            usage: "trim(text)",
            args: &TEXT_ARG,
            returns: "Text",
            examples: &["trim(\"  a \") → \"a\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("trim", args, 1)?;
        Ok(Value::Text(args[0].to_string().trim().to_string()))
    }
}

// ============ Replace ============

pub struct Replace;

static REPLACE_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("text", "Text", "Input text"),
    ArgMeta::required("from", "Text", "Substring to replace"),
    ArgMeta::required("to", "Text", "Replacement"),
];

impl FunctionPlugin for Replace {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "replace",
            module: MODULE,
            description: "Replace every occurrence of a substring",
            usage: "replace(text, from, to)",
            args: &REPLACE_ARGS,
            returns: "Text",
            examples: &["replace(\"a-b-c\", \"-\", \"_\") → \"a_b_c\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("replace", args, 3)?;
        let from = args[1].to_string();
        if from.is_empty() {
            return Err(EvalError::invalid_argument("replace(): 'from' must not be empty"));
        }
        Ok(Value::Text(args[0].to_string().replace(&from, &args[2].to_string())))
    }
}

// ============ Repeat ============

pub struct Repeat;

static REPEAT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("text", "Text", "Text to repeat"),
    ArgMeta::required("count", "Integer", "Number of repetitions"),
];

impl FunctionPlugin for Repeat {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "repeat",
            module: MODULE,
            description: "Repeat text a number of times",
            usage: "repeat(text, count)",
            args: &REPEAT_ARGS,
            returns: "Text",
            examples: &["repeat(\"ab\", 3) → \"ababab\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("repeat", args, 2)?;
        let count = require_count(&args[1], "repeat", "count")?;
        let text = args[0].to_string();
        bounded_len("repeat", text.len(), count)?;
        Ok(Value::Text(text.repeat(count)))
    }
}

// ============ Len ============

pub struct Len;

impl FunctionPlugin for Len {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "len",
            module: MODULE,
            description: "Number of characters in text",
            usage: "len(text)",
            args: &TEXT_ARG,
            returns: "Integer",
            examples: &["len(\"héllo\") → 5"],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        expect_args("len", args, 1)?;
        let n = args[0].to_string().chars().count();
        i64::try_from(n)
            .map(Value::Integer)
            .map_err(|_| EvalError::invalid_argument("len(): text too long"))
    }
}

// ============ Concat ============

pub struct Concat;

static CONCAT_ARGS: [ArgMeta; 1] = [ArgMeta::required("values", "Any...", "Values to concatenate")];

impl FunctionPlugin for Concat {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "concat",
            module: MODULE,
            description: "Concatenate the display forms of all arguments",
            usage: "concat(a, b, ...)",
            args: &CONCAT_ARGS,
            returns: "Text",
            examples: &["concat(\"x\", 1, 2.5) → \"x12.5\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        Ok(Value::Text(args.iter().map(|v| v.to_string()).collect()))
    }
}

// ============ Join ============

pub struct Join;

static JOIN_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("separator", "Text", "Separator"),
    ArgMeta::required("values", "Any...", "Values to join"),
];

impl FunctionPlugin for Join {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "join",
            module: MODULE,
            description: "Join the remaining arguments with a separator",
            usage: "join(separator, a, b, ...)",
            args: &JOIN_ARGS,
            returns: "Text",
            examples: &["join(\", \", 1, 2, 3) → \"1, 2, 3\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let Some((separator, values)) = args.split_first() else {
            return Err(EvalError::arity("join", 1, 0));
        };
        let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Ok(Value::Text(parts.join(&separator.to_string())))
    }
}

// ============ PadLeft / PadRight ============

pub struct PadLeft;
pub struct PadRight;

static PAD_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("text", "Text", "Text to pad"),
    ArgMeta::required("width", "Integer", "Minimum width in characters"),
    ArgMeta::optional("fill", "Text", "Single fill character", "\" \""),
];

fn pad(func: &str, args: &[Value], left: bool) -> Result<Value, EvalError> {
    expect_args_between(func, args, 2, 3)?;
    let text = args[0].to_string();
    let width = require_count(&args[1], func, "width")?;
    let fill = match args.get(2) {
        Some(v) => {
            let s = v.to_string();
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(EvalError::invalid_argument(format!(
                        "{}(): fill must be a single character, got {:?}",
                        func, s
                    )))
                }
            }
        }
        None => ' ',
    };
    let missing = width.saturating_sub(text.chars().count());
    bounded_len(func, fill.len_utf8(), missing)?;
    let padding: String = std::iter::repeat(fill).take(missing).collect();
    Ok(Value::Text(if left { padding + &text } else { text + &padding }))
}

impl FunctionPlugin for PadLeft {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pad_left",
            module: MODULE,
            description: "Pad text on the left to a minimum width",
            usage: "pad_left(text, width, fill?)",
            args: &PAD_ARGS,
            returns: "Text",
            examples: &["pad_left(7, 3, \"0\") → \"007\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        pad("pad_left", args, true)
    }
}

impl FunctionPlugin for PadRight {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "pad_right",
            module: MODULE,
            description: "Pad text on the right to a minimum width",
            usage: "pad_right(text, width, fill?)",
            args: &PAD_ARGS,
            returns: "Text",
            examples: &["pad_right(\"ab\", 4, \".\") → \"ab..\""],
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        pad("pad_right", args, false)
    }
}
