//! Dynamic property values for both protocol versions.
//!
//! v0.8 carries literals in `literalString`/`literalNumber`/`literalBoolean`/
//! `literalArray` wrappers; v0.9 carries literals as native JSON and adds
//! function calls and logic expressions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::ProtocolVersion;

/// v0.8 bound value: a wrapped literal or a data-model path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    LiteralString {
        #[serde(rename = "literalString")]
        literal_string: String,
    },
    LiteralNumber {
        #[serde(rename = "literalNumber")]
        literal_number: f64,
    },
    LiteralBoolean {
        #[serde(rename = "literalBoolean")]
        literal_boolean: bool,
    },
    LiteralArray {
        #[serde(rename = "literalArray")]
        literal_array: Vec<Value>,
    },
    Path {
        path: String,
    },
}

impl BoundValue {
    pub fn string(value: impl Into<String>) -> Self {
        BoundValue::LiteralString { literal_string: value.into() }
    }

    pub fn number(value: f64) -> Self {
        BoundValue::LiteralNumber { literal_number: value }
    }

    pub fn boolean(value: bool) -> Self {
        BoundValue::LiteralBoolean { literal_boolean: value }
    }

    pub fn path(value: impl Into<String>) -> Self {
        BoundValue::Path { path: value.into() }
    }
}

/// v0.9 path reference, optionally carrying a default literal used when the
/// path resolves to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// v0.9 function call over named dynamic arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub call: String,
    #[serde(default)]
    pub args: HashMap<String, DynamicValue>,
}

/// v0.9 boolean composition nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogicExpr {
    And { and: Vec<DynamicValue> },
    Or { or: Vec<DynamicValue> },
    Not { not: Box<DynamicValue> },
}

/// v0.9 dynamic value. The `Literal` variant must stay last: untagged
/// deserialization tries variants in order, and any JSON is a valid literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    Path(PathRef),
    Call(FunctionCall),
    Logic(LogicExpr),
    Literal(Value),
}

impl DynamicValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        DynamicValue::Literal(value.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        DynamicValue::Path(PathRef { path: path.into(), default: None })
    }
}

/// v0.9 validation rule: a logic expression bundled with the message shown
/// when it fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub message: String,
    #[serde(flatten)]
    pub rule: DynamicValue,
}

/// Children of a container component, decoded from the version-specific wire
/// shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    /// Ordered component-id references.
    Explicit(Vec<String>),
    /// One instance of `component_id` per element at `data_binding`.
    Template { component_id: String, data_binding: String },
}

impl Children {
    /// Decode a `children` property value. v0.8 wraps the explicit list in
    /// `{explicitList: […]}` and the template in `{template: {…}}`; v0.9 uses
    /// a bare sequence and a flat `{path, componentId}` object.
    pub fn decode(value: &Value, version: ProtocolVersion) -> Option<Children> {
        match version {
            ProtocolVersion::V0_8 => Self::decode_v0_8(value),
            ProtocolVersion::V0_9 => Self::decode_v0_9(value),
        }
    }

    fn decode_v0_8(value: &Value) -> Option<Children> {
        let map = value.as_object()?;
        if let Some(list) = map.get("explicitList") {
            return Some(Children::Explicit(id_list(list)?));
        }
        let template = map.get("template")?.as_object()?;
        Some(Children::Template {
            component_id: template.get("componentId")?.as_str()?.to_string(),
            data_binding: template.get("dataBinding")?.as_str()?.to_string(),
        })
    }

    fn decode_v0_9(value: &Value) -> Option<Children> {
        if let Some(list) = value.as_array() {
            return Some(Children::Explicit(
                list.iter().map(|id| id.as_str().map(str::to_string)).collect::<Option<_>>()?,
            ));
        }
        let map = value.as_object()?;
        let binding = map.get("path").or_else(|| map.get("dataBinding"))?;
        Some(Children::Template {
            component_id: map.get("componentId")?.as_str()?.to_string(),
            data_binding: binding.as_str()?.to_string(),
        })
    }
}

fn id_list(value: &Value) -> Option<Vec<String>> {
    value.as_array()?.iter().map(|id| id.as_str().map(str::to_string)).collect()
}
