//! JSON-Schema envelope validation.
//!
//! Structural required-field validation runs against a per-version schema
//! before typed decoding; numeric limits are enforced separately on the
//! decoded form.

use jsonschema::Validator;
use serde_json::{json, Value};

use crate::error::{ErrorKind, ProtocolError};
use crate::version::ProtocolVersion;

pub struct EnvelopeValidator {
    v0_8: Validator,
    v0_9: Validator,
}

impl EnvelopeValidator {
    pub fn new() -> Result<Self, ProtocolError> {
        let v0_8 = Validator::new(&schema_v0_8()).map_err(|e| {
            ProtocolError::new(ErrorKind::ValidationError, format!("invalid v0.8 schema: {e}"))
        })?;
        let v0_9 = Validator::new(&schema_v0_9()).map_err(|e| {
            ProtocolError::new(ErrorKind::ValidationError, format!("invalid v0.9 schema: {e}"))
        })?;
        Ok(Self { v0_8, v0_9 })
    }

    /// Validate a raw envelope against the schema of `version`.
    /// Version-neutral envelopes may be validated against either schema.
    pub fn validate(&self, value: &Value, version: ProtocolVersion) -> Result<(), ProtocolError> {
        let validator = match version {
            ProtocolVersion::V0_8 => &self.v0_8,
            ProtocolVersion::V0_9 => &self.v0_9,
        };

        let errors: Vec<Value> = validator
            .iter_errors(value)
            .map(|e| json!({ "message": e.to_string(), "path": e.instance_path().to_string() }))
            .collect();

        if errors.is_empty() {
            return Ok(());
        }
        Err(ProtocolError::new(
            ErrorKind::ValidationError,
            format!("envelope failed {} schema validation", version.as_str()),
        )
        .with_details(json!({ "errors": errors })))
    }
}

fn surface_id_schema() -> Value {
    json!({ "type": "string", "minLength": 1 })
}

fn delete_surface_schema() -> Value {
    json!({
        "required": ["deleteSurface"],
        "properties": {
            "deleteSurface": {
                "type": "object",
                "required": ["surfaceId"],
                "properties": { "surfaceId": surface_id_schema() }
            }
        }
    })
}

fn error_schema() -> Value {
    json!({
        "required": ["error"],
        "properties": {
            "error": {
                "type": "object",
                "required": ["type", "message"],
                "properties": {
                    "type": { "type": "string" },
                    "message": { "type": "string" },
                    "surfaceId": { "type": "string" },
                    "timestamp": { "type": "string" },
                    "details": {}
                }
            }
        }
    })
}

fn action_schema(key: &str) -> Value {
    let payload = json!({
        "type": "object",
        "required": ["name", "surfaceId", "sourceComponentId"],
        "properties": {
            "name": { "type": "string" },
            "surfaceId": surface_id_schema(),
            "sourceComponentId": { "type": "string" },
            "timestamp": { "type": "string" },
            "context": { "type": "object" }
        }
    });
    let mut properties = serde_json::Map::new();
    properties.insert(key.to_string(), payload);
    json!({ "required": [key], "properties": properties })
}

fn schema_v0_8() -> Value {
    json!({
        "type": "object",
        "oneOf": [
            {
                "required": ["surfaceUpdate"],
                "properties": {
                    "surfaceUpdate": {
                        "type": "object",
                        "required": ["surfaceId", "components"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "components": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["id", "component"],
                                    "properties": {
                                        "id": { "type": "string", "minLength": 1 },
                                        "component": { "type": "object" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            {
                "required": ["dataModelUpdate"],
                "properties": {
                    "dataModelUpdate": {
                        "type": "object",
                        "required": ["surfaceId"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "path": { "type": "string" },
                            "contents": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["key"],
                                    "properties": { "key": { "type": "string" } }
                                }
                            }
                        }
                    }
                }
            },
            {
                "required": ["beginRendering"],
                "properties": {
                    "beginRendering": {
                        "type": "object",
                        "required": ["surfaceId", "root"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "root": { "type": "string", "minLength": 1 },
                            "catalogId": { "type": "string" },
                            "styles": { "type": "object" }
                        }
                    }
                }
            },
            action_schema("userAction"),
            delete_surface_schema(),
            error_schema()
        ]
    })
}

fn schema_v0_9() -> Value {
    json!({
        "type": "object",
        "oneOf": [
            {
                "required": ["createSurface"],
                "properties": {
                    "createSurface": {
                        "type": "object",
                        "required": ["surfaceId"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "catalogId": { "type": "string" },
                            "broadcastDataModel": { "type": "boolean" }
                        }
                    }
                }
            },
            {
                "required": ["updateComponents"],
                "properties": {
                    "updateComponents": {
                        "type": "object",
                        "required": ["surfaceId", "components"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "components": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["id", "component"],
                                    "properties": {
                                        "id": { "type": "string", "minLength": 1 },
                                        "component": { "type": "string", "minLength": 1 }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            {
                "required": ["updateDataModel"],
                "properties": {
                    "updateDataModel": {
                        "type": "object",
                        "required": ["surfaceId", "value"],
                        "properties": {
                            "surfaceId": surface_id_schema(),
                            "path": { "type": "string" },
                            "value": {}
                        }
                    }
                }
            },
            action_schema("action"),
            delete_surface_schema(),
            error_schema()
        ]
    })
}
