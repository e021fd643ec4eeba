//! Outbound event construction.
//!
//! Builds version-correct `userAction` / `action` envelopes, resolving the
//! component's context definition through the binding evaluator, and `error`
//! envelopes with fresh timestamps.

use chrono::Utc;
use serde_json::{json, Map, Value};

use a2ui_core::envelope::{Envelope, UserAction};
use a2ui_core::value::{BoundValue, DynamicValue};
use a2ui_core::{ErrorKind, ProtocolError, ProtocolVersion};

use crate::binding;
use crate::surface::Surface;

/// A user action fired by an interactive component.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub name: String,
    pub component_id: String,
    /// Scope path of the firing template instance, empty outside templates.
    pub scope: String,
    /// Raw context definition from the component: a `{key, value}` pair list
    /// in v0.8, a map of dynamic values in v0.9.
    pub context: Option<Value>,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>, component_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_id: component_id.into(),
            scope: String::new(),
            context: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Build the outbound action envelope for `request` against `surface`.
pub fn build_action(surface: &Surface, request: &ActionRequest) -> Result<Envelope, ProtocolError> {
    let context = match &request.context {
        Some(raw) => resolve_context(surface, raw, &request.scope)
            .map_err(|err| err.with_surface(surface.id().to_string()))?,
        None => Map::new(),
    };

    let payload = UserAction {
        name: request.name.clone(),
        surface_id: surface.id().to_string(),
        source_component_id: request.component_id.clone(),
        timestamp: Utc::now().to_rfc3339(),
        context,
    };

    Ok(match surface.version() {
        ProtocolVersion::V0_8 => Envelope::UserAction(payload),
        ProtocolVersion::V0_9 => Envelope::Action(payload),
    })
}

/// Build an `{error: …}` envelope.
pub fn build_error(
    kind: ErrorKind,
    message: impl Into<String>,
    surface_id: Option<&str>,
    details: Option<Value>,
) -> Envelope {
    let mut error = ProtocolError::new(kind, message);
    if let Some(surface_id) = surface_id {
        error = error.with_surface(surface_id);
    }
    if let Some(details) = details {
        error = error.with_details(details);
    }
    Envelope::Error(error)
}

fn resolve_context(
    surface: &Surface,
    raw: &Value,
    scope: &str,
) -> Result<Map<String, Value>, ProtocolError> {
    let data = surface.data_model();
    let mut context = Map::new();

    match surface.version() {
        ProtocolVersion::V0_8 => {
            let Some(entries) = raw.as_array() else {
                return Err(context_shape_error("a sequence of {key, value} pairs"));
            };
            for entry in entries {
                let Some(key) = entry.get("key").and_then(Value::as_str) else {
                    return Err(context_shape_error("entries with a string key"));
                };
                let bound: BoundValue = serde_json::from_value(
                    entry.get("value").cloned().unwrap_or(Value::Null),
                )
                .map_err(|e| {
                    ProtocolError::new(
                        ErrorKind::BindingError,
                        format!("context entry {key:?} is not a bound value: {e}"),
                    )
                })?;
                let resolved = binding::resolve_bound(&bound, data, scope);
                require_resolved(key, &bound_path(&bound), &resolved)?;
                context.insert(key.to_string(), resolved);
            }
        }
        ProtocolVersion::V0_9 => {
            let Some(entries) = raw.as_object() else {
                return Err(context_shape_error("a map of dynamic values"));
            };
            for (key, value) in entries {
                let dynamic: DynamicValue =
                    serde_json::from_value(value.clone()).map_err(|e| {
                        ProtocolError::new(
                            ErrorKind::BindingError,
                            format!("context entry {key:?} is not a dynamic value: {e}"),
                        )
                    })?;
                let resolved = binding::resolve_dynamic(&dynamic, data, scope);
                require_resolved(key, &dynamic_path(&dynamic), &resolved)?;
                context.insert(key.clone(), resolved);
            }
        }
    }

    Ok(context)
}

fn context_shape_error(expected: &str) -> ProtocolError {
    ProtocolError::new(ErrorKind::BindingError, format!("action context must be {expected}"))
}

/// Event context requires path entries to resolve; `null` from a path is a
/// binding error rather than a silently empty field.
fn require_resolved(key: &str, path: &Option<String>, resolved: &Value) -> Result<(), ProtocolError> {
    match path {
        Some(path) if resolved.is_null() => Err(ProtocolError::new(
            ErrorKind::BindingError,
            format!("context entry {key:?} path {path:?} resolved to null"),
        )
        .with_details(json!({ "key": key, "path": path }))),
        _ => Ok(()),
    }
}

fn bound_path(value: &BoundValue) -> Option<String> {
    match value {
        BoundValue::Path { path } => Some(path.clone()),
        _ => None,
    }
}

fn dynamic_path(value: &DynamicValue) -> Option<String> {
    match value {
        DynamicValue::Path(path_ref) if path_ref.default.is_none() => Some(path_ref.path.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2ui_core::{Limits, ProtocolVersion};
    use serde_json::json;

    fn v0_9_surface() -> Surface {
        let mut surface = Surface::new("s", ProtocolVersion::V0_9, Limits::default());
        surface.apply_data_value(None, json!({ "counter": 1, "user": { "name": "Alice" } })).unwrap();
        surface
    }

    #[test]
    fn v0_9_action_uses_action_key_and_resolved_map_context() {
        let surface = v0_9_surface();
        let request = ActionRequest::new("increment", "btn")
            .with_context(json!({ "count": { "path": "/counter" }, "label": "inc" }));
        let envelope = build_action(&surface, &request).unwrap();

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["action"]["name"], "increment");
        assert_eq!(value["action"]["surfaceId"], "s");
        assert_eq!(value["action"]["sourceComponentId"], "btn");
        assert_eq!(value["action"]["context"]["count"], 1);
        assert_eq!(value["action"]["context"]["label"], "inc");
        assert!(value["action"]["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn empty_context_yields_empty_map() {
        let surface = v0_9_surface();
        let envelope = build_action(&surface, &ActionRequest::new("increment", "btn")).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["action"]["context"], json!({}));
    }

    #[test]
    fn v0_8_action_uses_user_action_key_and_pair_list() {
        let mut surface = Surface::new("s", ProtocolVersion::V0_8, Limits::default());
        surface
            .apply_data_entries(Some("/items/0"), &[a2ui_core::DataEntry::string("n", "a")])
            .unwrap();

        let request = ActionRequest::new("select", "row")
            .with_scope("/items/0")
            .with_context(json!([ { "key": "n", "value": { "path": "/n" } } ]));
        let envelope = build_action(&surface, &request).unwrap();

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["userAction"]["context"]["n"], "a");
    }

    #[test]
    fn unresolvable_context_path_is_a_binding_error() {
        let surface = v0_9_surface();
        let request = ActionRequest::new("submit", "btn")
            .with_context(json!({ "missing": { "path": "/nope" } }));
        let err = build_action(&surface, &request).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BindingError);
        assert_eq!(err.details.as_ref().unwrap()["key"], "missing");
    }

    #[test]
    fn path_with_default_never_binds_error() {
        let surface = v0_9_surface();
        let request = ActionRequest::new("submit", "btn")
            .with_context(json!({ "opt": { "path": "/nope", "default": "fallback" } }));
        let envelope = build_action(&surface, &request).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["action"]["context"]["opt"], "fallback");
    }

    #[test]
    fn build_error_carries_kind_and_details() {
        let envelope = build_error(
            ErrorKind::ValidationError,
            "too many components",
            Some("s"),
            Some(json!({ "count": 1001, "limit": 1000 })),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["error"]["type"], "validation_error");
        assert_eq!(value["error"]["surfaceId"], "s");
        assert_eq!(value["error"]["details"]["limit"], 1000);
    }
}
