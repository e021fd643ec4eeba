//! A2A client: agent discovery, task lifecycle, action posting.
//!
//! Every request carries the `X-A2A-Extensions` header naming the A2UI
//! extension for the client's protocol version. Agents that do not advertise
//! the extension can still be contacted; interoperability is then
//! best-effort.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use a2ui_core::{A2uiError, Envelope, EnvelopeParser, ProtocolVersion, Result};
use a2ui_session::{ClientCapabilities, DataBroadcast};
use a2ui_transport::a2a::{
    decode_message, AgentCard, Message, Part, Role, A2A_EXTENSIONS_HEADER,
};
use a2ui_transport::{EnvelopeStream, StreamItem};

use crate::sse::SseParser;

#[derive(Debug, Clone)]
pub struct A2aClientConfig {
    pub base_url: String,
    pub route_prefix: String,
    pub version: ProtocolVersion,
    /// Initial reconnect delay for task streams.
    pub retry_ms: u64,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl A2aClientConfig {
    pub fn new(base_url: impl Into<String>, version: ProtocolVersion) -> Self {
        Self {
            base_url: base_url.into(),
            route_prefix: String::new(),
            version,
            retry_ms: 3000,
            max_backoff: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_route_prefix(mut self, route_prefix: impl Into<String>) -> Self {
        self.route_prefix = route_prefix.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url.trim_end_matches('/'), self.route_prefix, path)
    }
}

/// Client for the A2A transport.
pub struct A2aUiClient {
    http: reqwest::Client,
    config: A2aClientConfig,
    capabilities: ClientCapabilities,
    parser: Arc<EnvelopeParser>,
    card: Option<AgentCard>,
}

impl A2aUiClient {
    pub fn new(config: A2aClientConfig, capabilities: ClientCapabilities) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            capabilities,
            parser: Arc::new(EnvelopeParser::new()?),
            card: None,
        })
    }

    pub fn agent_card(&self) -> Option<&AgentCard> {
        self.card.as_ref()
    }

    /// Fetch `/.well-known/agent.json` and check the a2ui extension.
    pub async fn discover(&mut self) -> Result<&AgentCard> {
        let url = format!(
            "{}/.well-known/agent.json",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .request(self.http.get(&url))
            .send()
            .await
            .map_err(|e| A2uiError::Http(format!("agent card fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(A2uiError::Http(format!(
                "agent card fetch failed: HTTP {}",
                response.status()
            )));
        }
        let card: AgentCard = response
            .json()
            .await
            .map_err(|e| A2uiError::Http(format!("agent card parse failed: {e}")))?;

        let extension = self.config.version.extension_uri();
        if card.supports_extension(extension) {
            info!(agent = %card.name, extension, "agent advertises a2ui extension");
        } else {
            warn!(agent = %card.name, extension, "agent does not advertise a2ui extension, best-effort interop");
        }
        Ok(&*self.card.insert(card))
    }

    /// Open a task with an initial text part. Returns the task id.
    pub async fn create_task(&self, prompt: impl Into<String>) -> Result<String> {
        let message = Message::builder()
            .role(Role::User)
            .part(Part::text(prompt))
            .client_capabilities(&self.capabilities)?
            .message_id(Uuid::new_v4().to_string())
            .build();

        let response = self
            .request(self.http.post(self.config.endpoint("/a2a/tasks")))
            .json(&message)
            .send()
            .await
            .map_err(|e| A2uiError::Http(format!("task create failed: {e}")))?;
        if !response.status().is_success() {
            return Err(A2uiError::Http(format!(
                "task create failed: HTTP {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| A2uiError::Http(format!("task create response: {e}")))?;
        body["taskId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| A2uiError::Http("task create response missing taskId".to_string()))
    }

    /// Stream a task: each SSE data frame is a complete A2A message from
    /// which A2UI envelopes are extracted by MIME type. Reconnects with
    /// `Last-Event-ID` on transport faults; a clean close completes.
    pub fn open_task_stream(&self, task_id: impl Into<String>) -> EnvelopeStream {
        let http = self.http.clone();
        let config = self.config.clone();
        let parser = self.parser.clone();
        let task_id = task_id.into();
        let extension = self.config.version.extension_uri();

        let stream = async_stream::stream! {
            let url = config.endpoint(&format!("/a2a/tasks/{task_id}"));
            let mut last_event_id: Option<String> = None;
            let mut retry_ms = config.retry_ms;
            let mut backoff = Duration::from_millis(config.retry_ms);

            'connect: loop {
                let mut request = http
                    .get(&url)
                    .header(A2A_EXTENSIONS_HEADER, extension)
                    .header("Accept", "text/event-stream");
                if let Some(id) = &last_event_id {
                    request = request.header("Last-Event-ID", id.clone());
                }

                let response = match request.send().await {
                    Ok(response) if response.status().is_success() => response,
                    Ok(response) => {
                        yield Err(A2uiError::Http(format!(
                            "task stream rejected: HTTP {}",
                            response.status()
                        )));
                        yield Ok(StreamItem::Done);
                        break;
                    }
                    Err(error) => {
                        warn!(task = %task_id, %error, backoff = ?backoff, "task stream connect failed");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(config.max_backoff);
                        continue;
                    }
                };

                debug!(task = %task_id, resumed_from = ?last_event_id, "task stream open");
                backoff = Duration::from_millis(retry_ms);
                let mut bytes = response.bytes_stream();
                let mut sse = SseParser::new();

                loop {
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            for event in sse.feed(&chunk) {
                                if let Some(id) = &event.id {
                                    last_event_id = Some(id.clone());
                                }
                                if let Some(retry) = event.retry {
                                    retry_ms = retry;
                                }
                                if event.data.is_empty() {
                                    continue;
                                }
                                match decode_message(&event.data) {
                                    Ok(message) => {
                                        for payload in message.a2ui_payloads() {
                                            match parser.parse_value(payload) {
                                                Ok(envelope) => {
                                                    yield Ok(StreamItem::Envelope(envelope))
                                                }
                                                Err(error) => {
                                                    yield Err(A2uiError::Protocol(error))
                                                }
                                            }
                                        }
                                    }
                                    Err(error) => yield Err(error),
                                }
                            }
                        }
                        Some(Err(error)) => {
                            warn!(task = %task_id, %error, "task stream read failed, reconnecting");
                            tokio::time::sleep(Duration::from_millis(retry_ms)).await;
                            continue 'connect;
                        }
                        None => {
                            info!(task = %task_id, "task stream completed");
                            yield Ok(StreamItem::Done);
                            break 'connect;
                        }
                    }
                }
            }
        };
        Box::pin(stream)
    }

    /// Post an action envelope against a task; returns the follow-up task id
    /// the server wants the client to stream next.
    pub async fn post_action(
        &self,
        task_id: &str,
        envelope: &Envelope,
        broadcast: Option<DataBroadcast>,
    ) -> Result<String> {
        let mut builder = Message::builder()
            .role(Role::User)
            .part(Part::a2ui(envelope)?)
            .task_id(task_id)
            .client_capabilities(&self.capabilities)?
            .message_id(Uuid::new_v4().to_string());
        if let Some(broadcast) = broadcast {
            builder = builder.data_broadcast(broadcast);
        }
        let message = builder.build();

        let response = self
            .request(self.http.post(self.config.endpoint(&format!("/a2a/tasks/{task_id}"))))
            .json(&message)
            .send()
            .await
            .map_err(|e| A2uiError::Http(format!("action post failed: {e}")))?;
        if !response.status().is_success() {
            return Err(A2uiError::Http(format!(
                "action post failed: HTTP {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| A2uiError::Http(format!("action response: {e}")))?;
        body["taskId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| A2uiError::Http("action response missing taskId".to_string()))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .timeout(self.config.request_timeout)
            .header(A2A_EXTENSIONS_HEADER, self.config.version.extension_uri())
    }
}
