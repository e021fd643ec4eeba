//! Binding and expression evaluation.
//!
//! `resolve_*` never mutates its inputs. The per-version scoping rules are
//! dispatched once into a [`ScopingMode`] so surface and event code never
//! branch on the protocol version directly.
//!
//! The defining version quirk: a v0.8 path with a leading `/` is still
//! scope-relative whenever a non-empty scope path is present, while a v0.9
//! leading-`/` path is always root-relative.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use a2ui_core::pointer;
use a2ui_core::value::{BoundValue, Check, DynamicValue, FunctionCall, LogicExpr, PathRef};
use a2ui_core::{ErrorKind, ProtocolError, ProtocolVersion};

/// How relative and leading-`/` paths combine with the scope path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopingMode {
    /// v0.8: any path joins onto a non-empty scope path.
    ScopeFirst,
    /// v0.9: leading-`/` paths are root-relative, others join the scope.
    RootAbsolute,
}

impl ScopingMode {
    pub fn for_version(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V0_8 => ScopingMode::ScopeFirst,
            ProtocolVersion::V0_9 => ScopingMode::RootAbsolute,
        }
    }
}

/// The absolute pointer a read or write-back should use for `path` under
/// `scope`. Inverse of the read-time scoping rule.
pub fn expand_path(path: &str, scope: &str, mode: ScopingMode) -> String {
    match mode {
        ScopingMode::ScopeFirst => {
            if scope.is_empty() {
                absolute(path)
            } else {
                pointer::join(scope, path)
            }
        }
        ScopingMode::RootAbsolute => {
            if path.starts_with('/') {
                path.to_string()
            } else {
                pointer::join(scope, path)
            }
        }
    }
}

fn absolute(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Read the value `path` names under `scope`. Missing segments yield `Null`.
pub fn read_scoped(data: &Value, path: &str, scope: &str, mode: ScopingMode) -> Value {
    let abs = expand_path(path, scope, mode);
    pointer::read(data, &abs).cloned().unwrap_or(Value::Null)
}

/// Resolve a v0.8 bound value.
pub fn resolve_bound(value: &BoundValue, data: &Value, scope: &str) -> Value {
    match value {
        BoundValue::LiteralString { literal_string } => Value::String(literal_string.clone()),
        BoundValue::LiteralNumber { literal_number } => serde_json::Number::from_f64(*literal_number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        BoundValue::LiteralBoolean { literal_boolean } => Value::Bool(*literal_boolean),
        BoundValue::LiteralArray { literal_array } => Value::Array(literal_array.clone()),
        BoundValue::Path { path } => read_scoped(data, path, scope, ScopingMode::ScopeFirst),
    }
}

/// Resolve a v0.9 dynamic value.
pub fn resolve_dynamic(value: &DynamicValue, data: &Value, scope: &str) -> Value {
    match value {
        DynamicValue::Literal(literal) => literal.clone(),
        DynamicValue::Path(PathRef { path, default }) => {
            let resolved = read_scoped(data, path, scope, ScopingMode::RootAbsolute);
            match (&resolved, default) {
                (Value::Null, Some(default)) => default.clone(),
                _ => resolved,
            }
        }
        DynamicValue::Call(call) => Value::Bool(evaluate_call(call, data, scope)),
        DynamicValue::Logic(logic) => Value::Bool(evaluate_logic(logic, data, scope)),
    }
}

/// Resolve a raw property value under the version's grammar. Values that do
/// not decode as bindings pass through unchanged.
pub fn resolve_prop(raw: &Value, data: &Value, scope: &str, version: ProtocolVersion) -> Value {
    match version {
        ProtocolVersion::V0_8 => match serde_json::from_value::<BoundValue>(raw.clone()) {
            Ok(bound) => resolve_bound(&bound, data, scope),
            Err(_) => raw.clone(),
        },
        ProtocolVersion::V0_9 => match serde_json::from_value::<DynamicValue>(raw.clone()) {
            Ok(dynamic) => resolve_dynamic(&dynamic, data, scope),
            Err(_) => raw.clone(),
        },
    }
}

/// Evaluate a boolean expression to its truth value.
pub fn evaluate(value: &DynamicValue, data: &Value, scope: &str) -> bool {
    truthy(&resolve_dynamic(value, data, scope))
}

fn evaluate_logic(logic: &LogicExpr, data: &Value, scope: &str) -> bool {
    match logic {
        LogicExpr::And { and } => and.iter().all(|term| evaluate(term, data, scope)),
        LogicExpr::Or { or } => or.iter().any(|term| evaluate(term, data, scope)),
        LogicExpr::Not { not } => !evaluate(not, data, scope),
    }
}

fn evaluate_call(call: &FunctionCall, data: &Value, scope: &str) -> bool {
    let arg = |name: &str| {
        call.args.get(name).map(|value| resolve_dynamic(value, data, scope)).unwrap_or(Value::Null)
    };

    match call.call.as_str() {
        "required" => {
            let value = arg("value");
            !value.is_null() && value.as_str().map(|s| !s.is_empty()).unwrap_or(true)
        }
        "email" => arg("value").as_str().map(|s| email_regex().is_match(s)).unwrap_or(false),
        "regex" => {
            let Some(pattern) = call.args.get("pattern").and_then(literal_str) else {
                warn!(call = %call.call, "regex rule without a literal pattern");
                return true;
            };
            let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) else {
                warn!(%pattern, "invalid regex pattern, rule passes");
                return true;
            };
            arg("value").as_str().map(|s| re.is_match(s)).unwrap_or(false)
        }
        "length" => {
            let value = arg("value");
            let len = match &value {
                Value::String(s) => s.chars().count() as f64,
                Value::Array(items) => items.len() as f64,
                _ => return false,
            };
            in_range(len, &arg("min"), &arg("max"))
        }
        "numeric" => {
            let value = arg("value");
            let number = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match number {
                Some(n) => in_range(n, &arg("min"), &arg("max")),
                None => false,
            }
        }
        // Unknown function names evaluate to true.
        other => {
            warn!(call = other, "unknown check function, rule passes");
            true
        }
    }
}

fn literal_str(value: &DynamicValue) -> Option<String> {
    match value {
        DynamicValue::Literal(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn in_range(value: f64, min: &Value, max: &Value) -> bool {
    if let Some(min) = min.as_f64() {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max.as_f64() {
        if value > max {
            return false;
        }
    }
    true
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"))
}

/// Loose JSON truthiness used by logic nodes.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Messages of all failing checks. Empty means the component is enabled.
pub fn evaluate_checks(checks: &[Check], data: &Value, scope: &str) -> Vec<String> {
    checks
        .iter()
        .filter(|check| !evaluate(&check.rule, data, scope))
        .map(|check| check.message.clone())
        .collect()
}

/// One expanded template instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateInstance {
    pub component_id: String,
    pub scope_path: String,
}

/// Instantiate a template child once per element at the bound path. Maps
/// iterate by key, sequences by index; each instance's scope path is
/// `<base>/<index-or-key>`.
pub fn expand_template(
    data_binding: &str,
    component_id: &str,
    data: &Value,
    scope: &str,
    mode: ScopingMode,
    max_items: usize,
) -> Result<Vec<TemplateInstance>, ProtocolError> {
    let base = expand_path(data_binding, scope, mode);
    let bound = pointer::read(data, &base).cloned().unwrap_or(Value::Null);

    let keys: Vec<String> = match &bound {
        Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        Value::Object(map) => map.keys().map(|k| pointer::escape(k)).collect(),
        Value::Null => Vec::new(),
        _ => Vec::new(),
    };

    if keys.len() > max_items {
        return Err(ProtocolError::new(
            ErrorKind::ValidationError,
            format!("template at {base:?} expands to {} items", keys.len()),
        )
        .with_details(json!({ "count": keys.len(), "limit": max_items })));
    }

    Ok(keys
        .into_iter()
        .map(|key| TemplateInstance {
            component_id: component_id.to_string(),
            scope_path: pointer::join(&base, &key),
        })
        .collect())
}
