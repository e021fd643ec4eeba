use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata key under which client capabilities travel on outbound messages.
pub const CLIENT_CAPABILITIES_METADATA_KEY: &str = "a2uiClientCapabilities";

/// Metadata key under which data-model broadcasts travel on outbound messages.
pub const DATA_BROADCAST_METADATA_KEY: &str = "a2uiDataBroadcast";

/// Capabilities negotiated once per session and attached to every outbound
/// event envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    #[serde(default)]
    pub supported_catalog_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_catalogs: Option<Vec<Value>>,
}

impl ClientCapabilities {
    pub fn new(supported_catalog_ids: Vec<String>) -> Self {
        Self { supported_catalog_ids, inline_catalogs: None }
    }

    pub fn with_inline_catalogs(mut self, inline_catalogs: Vec<Value>) -> Self {
        self.inline_catalogs = Some(inline_catalogs);
        self
    }

    /// Whether the client advertised `catalog_id` in its supported set.
    /// An empty supported set means "no restriction was negotiated".
    pub fn advertises(&self, catalog_id: &str) -> bool {
        self.supported_catalog_ids.iter().any(|id| id == catalog_id)
    }

    pub fn is_negotiated(&self) -> bool {
        !self.supported_catalog_ids.is_empty() || self.inline_catalogs.is_some()
    }

    /// Whether `catalog_id` names one of the inline catalog descriptors.
    pub fn has_inline(&self, catalog_id: &str) -> bool {
        self.inline_catalogs
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|descriptor| {
                descriptor
                    .get("catalogId")
                    .or_else(|| descriptor.get("id"))
                    .and_then(Value::as_str)
                    == Some(catalog_id)
            })
    }
}
