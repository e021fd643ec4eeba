//! Typed envelope payloads for both protocol versions.
//!
//! Every envelope is a JSON object with exactly one top-level key naming its
//! kind; the externally-tagged [`Envelope`] enum reproduces that shape
//! byte-compatibly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::version::ProtocolVersion;

/// v0.8 adjacency-list entry of a `dataModelUpdate`. Exactly one of the
/// `value*` fields is expected to be set; `valueMap` nests recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_map: Option<Vec<DataEntry>>,
}

impl DataEntry {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_string: Some(value.into()),
            value_number: None,
            value_boolean: None,
            value_map: None,
        }
    }

    pub fn number(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value_string: None,
            value_number: Some(value),
            value_boolean: None,
            value_map: None,
        }
    }

    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self {
            key: key.into(),
            value_string: None,
            value_number: None,
            value_boolean: Some(value),
            value_map: None,
        }
    }

    pub fn map(key: impl Into<String>, entries: Vec<DataEntry>) -> Self {
        Self {
            key: key.into(),
            value_string: None,
            value_number: None,
            value_boolean: None,
            value_map: Some(entries),
        }
    }

    /// Convert the entry's payload into a native JSON value.
    pub fn to_value(&self) -> Value {
        if let Some(s) = &self.value_string {
            return Value::String(s.clone());
        }
        if let Some(n) = self.value_number {
            return serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
        }
        if let Some(b) = self.value_boolean {
            return Value::Bool(b);
        }
        if let Some(entries) = &self.value_map {
            let mut map = Map::new();
            for entry in entries {
                map.insert(entry.key.clone(), entry.to_value());
            }
            return Value::Object(map);
        }
        Value::Null
    }
}

/// v0.8 component record: `component` is a single-key `{TypeName: {props}}`
/// wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentWrapper {
    pub id: String,
    pub component: Value,
}

impl ComponentWrapper {
    /// The wrapped type name, when the wrapper is well-formed.
    pub fn type_name(&self) -> Option<&str> {
        let map = self.component.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.keys().next().map(String::as_str)
    }

    pub fn props(&self) -> Option<&Map<String, Value>> {
        let map = self.component.as_object()?;
        map.values().next()?.as_object()
    }
}

/// v0.9 component record: type name plus flat prop fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub id: String,
    pub component: String,
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceUpdate {
    pub surface_id: String,
    pub components: Vec<ComponentWrapper>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelUpdate {
    pub surface_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub contents: Vec<DataEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRendering {
    pub surface_id: String,
    pub root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurface {
    pub surface_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_data_model: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComponents {
    pub surface_id: String,
    pub components: Vec<ComponentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDataModel {
    pub surface_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurface {
    pub surface_id: String,
}

/// Outbound client action. v0.8 emits it under `userAction`, v0.9 under
/// `action`; the payload shape is shared, context entries already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    pub name: String,
    pub surface_id: String,
    pub source_component_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

/// The closed set of protocol envelopes. External tagging reproduces the
/// single-key wire shape exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    #[serde(rename = "surfaceUpdate")]
    SurfaceUpdate(SurfaceUpdate),
    #[serde(rename = "dataModelUpdate")]
    DataModelUpdate(DataModelUpdate),
    #[serde(rename = "beginRendering")]
    BeginRendering(BeginRendering),
    #[serde(rename = "createSurface")]
    CreateSurface(CreateSurface),
    #[serde(rename = "updateComponents")]
    UpdateComponents(UpdateComponents),
    #[serde(rename = "updateDataModel")]
    UpdateDataModel(UpdateDataModel),
    #[serde(rename = "deleteSurface")]
    DeleteSurface(DeleteSurface),
    #[serde(rename = "userAction")]
    UserAction(UserAction),
    #[serde(rename = "action")]
    Action(UserAction),
    #[serde(rename = "error")]
    Error(ProtocolError),
}

/// Envelope keys recognized by the parser, with the protocol version each
/// one pins (`None` for version-neutral kinds).
pub const ENVELOPE_KEYS: &[(&str, Option<ProtocolVersion>)] = &[
    ("surfaceUpdate", Some(ProtocolVersion::V0_8)),
    ("dataModelUpdate", Some(ProtocolVersion::V0_8)),
    ("beginRendering", Some(ProtocolVersion::V0_8)),
    ("userAction", Some(ProtocolVersion::V0_8)),
    ("createSurface", Some(ProtocolVersion::V0_9)),
    ("updateComponents", Some(ProtocolVersion::V0_9)),
    ("updateDataModel", Some(ProtocolVersion::V0_9)),
    ("action", Some(ProtocolVersion::V0_9)),
    ("deleteSurface", None),
    ("error", None),
];

/// The version pinned by an envelope key, or `Err(())` if the key is unknown.
pub fn key_version(key: &str) -> std::result::Result<Option<ProtocolVersion>, ()> {
    ENVELOPE_KEYS.iter().find(|(k, _)| *k == key).map(|(_, v)| *v).ok_or(())
}

impl Envelope {
    /// The wire key of this envelope.
    pub fn key(&self) -> &'static str {
        match self {
            Envelope::SurfaceUpdate(_) => "surfaceUpdate",
            Envelope::DataModelUpdate(_) => "dataModelUpdate",
            Envelope::BeginRendering(_) => "beginRendering",
            Envelope::CreateSurface(_) => "createSurface",
            Envelope::UpdateComponents(_) => "updateComponents",
            Envelope::UpdateDataModel(_) => "updateDataModel",
            Envelope::DeleteSurface(_) => "deleteSurface",
            Envelope::UserAction(_) => "userAction",
            Envelope::Action(_) => "action",
            Envelope::Error(_) => "error",
        }
    }

    /// The protocol version this envelope pins, if any.
    pub fn version(&self) -> Option<ProtocolVersion> {
        key_version(self.key()).unwrap_or(None)
    }

    /// The surface this envelope targets, when it targets one.
    pub fn surface_id(&self) -> Option<&str> {
        match self {
            Envelope::SurfaceUpdate(p) => Some(&p.surface_id),
            Envelope::DataModelUpdate(p) => Some(&p.surface_id),
            Envelope::BeginRendering(p) => Some(&p.surface_id),
            Envelope::CreateSurface(p) => Some(&p.surface_id),
            Envelope::UpdateComponents(p) => Some(&p.surface_id),
            Envelope::UpdateDataModel(p) => Some(&p.surface_id),
            Envelope::DeleteSurface(p) => Some(&p.surface_id),
            Envelope::UserAction(p) => Some(&p.surface_id),
            Envelope::Action(p) => Some(&p.surface_id),
            Envelope::Error(p) => p.surface_id.as_deref(),
        }
    }

    /// Encode as a JSON line (newline-terminated).
    pub fn to_line(&self) -> std::result::Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Encode an iterator of envelopes as JSONL.
pub fn encode_jsonl<I>(envelopes: I) -> std::result::Result<String, serde_json::Error>
where
    I: IntoIterator<Item = Envelope>,
{
    let mut output = String::new();
    for envelope in envelopes {
        output.push_str(&serde_json::to_string(&envelope)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_surface_round_trips_wire_shape() {
        let raw = json!({
            "createSurface": {
                "surfaceId": "main",
                "catalogId": "catalog",
                "broadcastDataModel": true
            }
        });
        let envelope: Envelope = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(envelope.key(), "createSurface");
        assert_eq!(envelope.version(), Some(ProtocolVersion::V0_9));
        assert_eq!(envelope.surface_id(), Some("main"));
        assert_eq!(serde_json::to_value(&envelope).unwrap(), raw);
    }

    #[test]
    fn v0_9_component_entry_keeps_flat_props() {
        let raw = json!({
            "updateComponents": {
                "surfaceId": "s",
                "components": [ { "id": "root", "component": "Text", "text": "hi" } ]
            }
        });
        let Envelope::UpdateComponents(update) = serde_json::from_value(raw).unwrap() else {
            panic!("expected updateComponents");
        };
        assert_eq!(update.components[0].component, "Text");
        assert_eq!(update.components[0].props["text"], json!("hi"));
    }

    #[test]
    fn v0_8_component_wrapper_exposes_type_name() {
        let wrapper = ComponentWrapper {
            id: "x".to_string(),
            component: json!({ "Text": { "text": { "literalString": "hi" } } }),
        };
        assert_eq!(wrapper.type_name(), Some("Text"));
        assert!(wrapper.props().unwrap().contains_key("text"));

        let malformed = ComponentWrapper {
            id: "y".to_string(),
            component: json!({ "Text": {}, "Image": {} }),
        };
        assert_eq!(malformed.type_name(), None);
    }

    #[test]
    fn data_entry_converts_to_native_json() {
        let entry = DataEntry::map(
            "user",
            vec![DataEntry::string("name", "Alice"), DataEntry::number("age", 30.0)],
        );
        assert_eq!(entry.to_value(), json!({ "name": "Alice", "age": 30.0 }));
    }

    #[test]
    fn delete_surface_is_version_neutral() {
        let envelope: Envelope =
            serde_json::from_value(json!({ "deleteSurface": { "surfaceId": "s" } })).unwrap();
        assert_eq!(envelope.version(), None);
    }

    #[test]
    fn encodes_jsonl_lines() {
        let jsonl = encode_jsonl(vec![
            Envelope::DeleteSurface(DeleteSurface { surface_id: "a".to_string() }),
            Envelope::DeleteSurface(DeleteSurface { surface_id: "b".to_string() }),
        ])
        .unwrap();
        let lines: Vec<&str> = jsonl.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("deleteSurface"));
    }
}
