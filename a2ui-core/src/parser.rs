//! Envelope parsing: raw text line → [`Envelope`].
//!
//! Classification is by the single top-level key; every failure is returned
//! as a structured [`ProtocolError`], never a panic.

use serde_json::{json, Value};
use tracing::debug;

use crate::envelope::{key_version, Envelope};
use crate::error::{ErrorKind, ProtocolError};
use crate::limits::Limits;
use crate::pointer;
use crate::schema::EnvelopeValidator;
use crate::version::ProtocolVersion;

pub struct EnvelopeParser {
    validator: EnvelopeValidator,
    limits: Limits,
}

impl EnvelopeParser {
    pub fn new() -> Result<Self, ProtocolError> {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Result<Self, ProtocolError> {
        Ok(Self { validator: EnvelopeValidator::new()?, limits })
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Parse one line of the stream into a typed envelope.
    pub fn parse_line(&self, line: &str) -> Result<Envelope, ProtocolError> {
        let value: Value = serde_json::from_str(line.trim()).map_err(|e| {
            ProtocolError::new(ErrorKind::ParseError, format!("invalid JSON: {e}"))
        })?;
        self.parse_value(value)
    }

    /// Parse an already-decoded JSON value into a typed envelope.
    pub fn parse_value(&self, value: Value) -> Result<Envelope, ProtocolError> {
        let Some(object) = value.as_object() else {
            return Err(ProtocolError::new(
                ErrorKind::ParseError,
                "envelope must be a JSON object",
            ));
        };
        if object.len() != 1 {
            return Err(ProtocolError::new(
                ErrorKind::ParseError,
                format!("envelope must have exactly one top-level key, found {}", object.len()),
            ));
        }

        let key = object.keys().next().cloned().unwrap_or_default();
        let surface_id = object
            .get(&key)
            .and_then(|payload| payload.get("surfaceId"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let attach = |err: ProtocolError| match &surface_id {
            Some(id) => err.with_surface(id.clone()),
            None => err,
        };

        let Ok(version) = key_version(&key) else {
            return Err(attach(
                ProtocolError::new(
                    ErrorKind::UnknownMessageType,
                    format!("unknown envelope key {key:?}"),
                )
                .with_details(json!({ "key": key })),
            ));
        };

        let depth = json_depth(&value);
        if depth > self.limits.max_depth {
            return Err(attach(
                ProtocolError::new(ErrorKind::ValidationError, "envelope nesting too deep")
                    .with_details(json!({ "depth": depth, "limit": self.limits.max_depth })),
            ));
        }

        // Version-neutral kinds validate identically under either schema.
        let schema_version = version.unwrap_or(ProtocolVersion::V0_9);
        self.validator.validate(&value, schema_version).map_err(&attach)?;

        let envelope: Envelope = serde_json::from_value(value).map_err(|e| {
            attach(ProtocolError::new(
                ErrorKind::ParseError,
                format!("malformed {key} payload: {e}"),
            ))
        })?;

        self.check_limits(&envelope).map_err(attach)?;
        debug!(key = envelope.key(), surface = ?envelope.surface_id(), "parsed envelope");
        Ok(envelope)
    }

    fn check_limits(&self, envelope: &Envelope) -> Result<(), ProtocolError> {
        match envelope {
            Envelope::SurfaceUpdate(update) => {
                self.check_component_count(update.components.len())?;
                for component in &update.components {
                    if component.type_name().is_none() {
                        return Err(ProtocolError::new(
                            ErrorKind::ValidationError,
                            format!(
                                "component {:?} must wrap exactly one type name",
                                component.id
                            ),
                        ));
                    }
                }
                Ok(())
            }
            Envelope::UpdateComponents(update) => {
                self.check_component_count(update.components.len())
            }
            Envelope::DataModelUpdate(update) => self.check_path(update.path.as_deref()),
            Envelope::UpdateDataModel(update) => self.check_path(update.path.as_deref()),
            _ => Ok(()),
        }
    }

    fn check_component_count(&self, count: usize) -> Result<(), ProtocolError> {
        if count > self.limits.max_components {
            return Err(ProtocolError::new(
                ErrorKind::ValidationError,
                format!("update carries {count} components"),
            )
            .with_details(json!({ "count": count, "limit": self.limits.max_components })));
        }
        Ok(())
    }

    fn check_path(&self, path: Option<&str>) -> Result<(), ProtocolError> {
        let Some(path) = path else { return Ok(()) };
        let count = pointer::segment_count(path);
        if count > self.limits.max_path_segments {
            return Err(ProtocolError::new(
                ErrorKind::ValidationError,
                format!("path {path:?} has {count} segments"),
            )
            .with_details(json!({ "count": count, "limit": self.limits.max_path_segments })));
        }
        Ok(())
    }
}

fn json_depth(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(json_depth).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(json_depth).max().unwrap_or(0),
        _ => 1,
    }
}
