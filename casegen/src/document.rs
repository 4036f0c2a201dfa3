//! JSON suite documents
//!
//! ```json
//! {
//!   "id": "arith",
//!   "configuration": {"lang": "rust"},
//!   "resolver": {"prune_unreferenced_axes": true},
//!   "parameters": [{"name": "a", "values": [1, 2]}],
//!   "macros": [{"signature": "check(x)", "bodies": ["assert!(${x});"]}],
//!   "subjects": [{
//!     "id": "add",
//!     "name": "add_${a}",
//!     "code": ["fn add_${a}() {", "    ${check(a + 1)}", "}"],
//!     "outcomes": [{"error": "E${a}"}]
//!   }]
//! }
//! ```
//!
//! Template text may be a string or a list of lines joined with `\n`.

use crate::compile::{MacroDefinition, OutcomeDefinition, ParameterDefinition, SubjectDefinition, SuiteDefinition};
use crate::config::ResolverConfig;
use casegen_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid suite document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parameter '{parameter}' has an unsupported value: {found}")]
    UnsupportedValue { parameter: String, found: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBlock {
    Text(String),
    Lines(Vec<String>),
}

impl TextBlock {
    fn into_text(self) -> String {
        match self {
            TextBlock::Text(text) => text,
            TextBlock::Lines(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDocument {
    pub name: String,
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDocument {
    pub signature: String,
    #[serde(default)]
    pub bodies: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDocument {
    #[serde(default)]
    pub warning: Option<TextBlock>,
    #[serde(default)]
    pub error: Option<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDocument {
    pub id: String,
    pub name: TextBlock,
    pub code: TextBlock,
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    #[serde(default)]
    pub macros: Vec<MacroDocument>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteDocument {
    pub id: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    /// Resolver settings embedded in the document
    #[serde(default)]
    pub resolver: Option<ResolverConfig>,
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    #[serde(default)]
    pub macros: Vec<MacroDocument>,
    #[serde(default)]
    pub subjects: Vec<SubjectDocument>,
}

impl SuiteDocument {
    pub fn from_json(source: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DocumentError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Split into the suite definition and the embedded resolver settings
    pub fn into_definition(self) -> Result<(SuiteDefinition, Option<ResolverConfig>), DocumentError> {
        let definition = SuiteDefinition {
            id: self.id,
            configuration: self.configuration,
            parameters: parameters(self.parameters)?,
            macros: macros(self.macros),
            subjects: self
                .subjects
                .into_iter()
                .map(|subject| {
                    Ok(SubjectDefinition {
                        id: subject.id,
                        name: subject.name.into_text(),
                        code: subject.code.into_text(),
                        parameters: parameters(subject.parameters)?,
                        macros: macros(subject.macros),
                        outcomes: subject
                            .outcomes
                            .into_iter()
                            .map(|o| OutcomeDefinition {
                                warning: o.warning.map(TextBlock::into_text),
                                error: o.error.map(TextBlock::into_text),
                            })
                            .collect(),
                    })
                })
                .collect::<Result<Vec<_>, DocumentError>>()?,
        };
        Ok((definition, self.resolver))
    }
}

fn parameters(documents: Vec<ParameterDocument>) -> Result<Vec<ParameterDefinition>, DocumentError> {
    documents
        .into_iter()
        .map(|doc| {
            let values = doc
                .values
                .iter()
                .map(|v| json_value(&doc.name, v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ParameterDefinition {
                identifier: doc.name,
                values,
            })
        })
        .collect()
}

fn macros(documents: Vec<MacroDocument>) -> Vec<MacroDefinition> {
    documents
        .into_iter()
        .map(|doc| MacroDefinition {
            signature: doc.signature,
            bodies: doc.bodies.into_iter().map(TextBlock::into_text).collect(),
        })
        .collect()
}

fn json_value(parameter: &str, value: &serde_json::Value) -> Result<Value, DocumentError> {
    let unsupported = |found| DocumentError::UnsupportedValue {
        parameter: parameter.to_string(),
        found,
    };
    match value {
        serde_json::Value::String(s) => Ok(Value::infer(s)),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Value::Integer(i)),
            (None, Some(x)) if x.is_finite() => Ok(Value::Float(x)),
            _ => Err(unsupported("number out of range")),
        },
        serde_json::Value::Bool(_) => Err(unsupported("boolean")),
        serde_json::Value::Null => Err(unsupported("null")),
        serde_json::Value::Array(_) => Err(unsupported("array")),
        serde_json::Value::Object(_) => Err(unsupported("object")),
    }
}
