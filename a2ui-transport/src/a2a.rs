//! A2A message structures shared by the server and client transports.
//!
//! A2UI envelopes ride inside A2A messages as DataParts whose metadata
//! carries `mimeType: application/json+a2ui`. Client-sent messages attach
//! the negotiated capabilities under `a2uiClientCapabilities` and, when
//! surfaces opted in, a data-model broadcast under `a2uiDataBroadcast`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use a2ui_core::envelope::Envelope;
use a2ui_core::{A2uiError, Result, A2UI_MIME_TYPE};
use a2ui_session::{
    ClientCapabilities, DataBroadcast, CLIENT_CAPABILITIES_METADATA_KEY,
    DATA_BROADCAST_METADATA_KEY,
};

/// Header naming the A2A extensions a request speaks.
pub const A2A_EXTENSIONS_HEADER: &str = "X-A2A-Extensions";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<Map<String, Value>>,
    },
    Data {
        data: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<Map<String, Value>>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into(), metadata: None }
    }

    /// A DataPart carrying one A2UI envelope.
    pub fn a2ui(envelope: &Envelope) -> Result<Self> {
        let data = serde_json::to_value(envelope)?;
        let mut metadata = Map::new();
        metadata.insert("mimeType".to_string(), Value::String(A2UI_MIME_TYPE.to_string()));
        Ok(Part::Data { data, metadata: Some(metadata) })
    }

    /// Whether this part carries A2UI payload.
    pub fn is_a2ui(&self) -> bool {
        match self {
            Part::Data { metadata: Some(metadata), .. } => {
                metadata.get("mimeType").and_then(Value::as_str) == Some(A2UI_MIME_TYPE)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "taskId")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "contextId")]
    pub context_id: Option<String>,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// A2UI payloads extracted from this message's DataParts, in order.
    pub fn a2ui_payloads(&self) -> Vec<Value> {
        self.parts
            .iter()
            .filter(|part| part.is_a2ui())
            .filter_map(|part| match part {
                Part::Data { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
pub struct MessageBuilder {
    role: Option<Role>,
    parts: Vec<Part>,
    metadata: Option<Map<String, Value>>,
    message_id: Option<String>,
    task_id: Option<String>,
    context_id: Option<String>,
}

impl MessageBuilder {
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn metadata(mut self, metadata: Option<Map<String, Value>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Attach client capabilities under the A2UI metadata key.
    pub fn client_capabilities(mut self, capabilities: &ClientCapabilities) -> Result<Self> {
        let value = serde_json::to_value(capabilities)?;
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(CLIENT_CAPABILITIES_METADATA_KEY.to_string(), value);
        Ok(self)
    }

    /// Attach a data-model broadcast under the A2UI metadata key.
    pub fn data_broadcast(mut self, broadcast: DataBroadcast) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(DATA_BROADCAST_METADATA_KEY.to_string(), Value::Object(broadcast));
        self
    }

    pub fn build(self) -> Message {
        Message {
            role: self.role.unwrap_or(Role::User),
            parts: self.parts,
            metadata: self.metadata,
            message_id: self.message_id.unwrap_or_default(),
            task_id: self.task_id,
            context_id: self.context_id,
        }
    }
}

/// One advertised A2A extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExtension {
    pub uri: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<AgentExtension>>,
}

/// Descriptor served at `/.well-known/agent.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub protocol_version: String,
    pub capabilities: AgentCapabilities,
}

impl AgentCard {
    /// Whether the agent advertises `extension_uri`.
    pub fn supports_extension(&self, extension_uri: &str) -> bool {
        self.capabilities
            .extensions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|extension| extension.uri == extension_uri)
    }
}

/// Wrap envelopes into a server-side A2A message for one task.
pub fn wrap_envelopes(
    envelopes: &[Envelope],
    task_id: &str,
    message_id: impl Into<String>,
) -> Result<Message> {
    let parts = envelopes.iter().map(Part::a2ui).collect::<Result<Vec<_>>>()?;
    Ok(Message::builder()
        .role(Role::Agent)
        .parts(parts)
        .message_id(message_id)
        .task_id(task_id)
        .build())
}

/// Decode an A2A message from a raw SSE data frame.
pub fn decode_message(raw: &str) -> Result<Message> {
    serde_json::from_str(raw).map_err(A2uiError::Serde)
}
