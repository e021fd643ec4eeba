use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum A2uiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, A2uiError>;

/// Wire-visible error taxonomy. Serialized snake_case in `{error: {type: …}}`
/// envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    UnknownComponent,
    UnknownMessageType,
    ValidationError,
    VersionMismatch,
    BindingError,
    UnsupportedCatalog,
    InlineCatalogNotSupported,
    MissingCatalogId,
    CatalogNotInCapabilities,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::UnknownComponent => "unknown_component",
            ErrorKind::UnknownMessageType => "unknown_message_type",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::VersionMismatch => "version_mismatch",
            ErrorKind::BindingError => "binding_error",
            ErrorKind::UnsupportedCatalog => "unsupported_catalog",
            ErrorKind::InlineCatalogNotSupported => "inline_catalog_not_supported",
            ErrorKind::MissingCatalogId => "missing_catalog_id",
            ErrorKind::CatalogNotInCapabilities => "catalog_not_in_capabilities",
        }
    }
}

/// Structured protocol error surfaced to the host and posted back to the
/// server as an `{error: …}` envelope. Applying an envelope that produces one
/// of these leaves the surface state untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default)]
    pub timestamp: String,
}

impl ProtocolError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            surface_id: None,
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_surface(mut self, surface_id: impl Into<String>) -> Self {
        self.surface_id = Some(surface_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.surface_id {
            Some(surface) => write!(f, "{} ({}): {}", self.kind.as_str(), surface, self.message),
            None => write!(f, "{}: {}", self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for ProtocolError {}
