//! HTTP+SSE client: session create, resumable stream consumption, event
//! posting.
//!
//! The stream reconnects after the server's `retry` hint (default 3 s) with
//! bounded exponential backoff and replays missed events via
//! `Last-Event-ID`. A clean server close is the completion signal; transport
//! faults reconnect.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use a2ui_core::{A2uiError, EnvelopeParser, ProtocolError, Result};
use a2ui_session::DataBroadcast;
use a2ui_transport::{EnvelopeStream, Events, StreamItem, UiStream};

use crate::sse::SseParser;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub route_prefix: String,
    /// Initial reconnect delay; the server's `retry:` hint overrides it.
    pub retry_ms: u64,
    /// Upper bound for exponential reconnect backoff.
    pub max_backoff: Duration,
    /// Timeout for `POST /events`.
    pub event_timeout: Duration,
    /// Timeout for `POST /sessions`.
    pub session_timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            route_prefix: String::new(),
            retry_ms: 3000,
            max_backoff: Duration::from_secs(30),
            event_timeout: Duration::from_secs(5),
            session_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_route_prefix(mut self, route_prefix: impl Into<String>) -> Self {
        self.route_prefix = route_prefix.into();
        self
    }

    pub fn with_retry_ms(mut self, retry_ms: u64) -> Self {
        self.retry_ms = retry_ms;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.route_prefix,
            path
        )
    }
}

/// Client for the HTTP+SSE transport.
pub struct HttpStreamClient {
    http: reqwest::Client,
    config: HttpClientConfig,
    parser: Arc<EnvelopeParser>,
}

impl HttpStreamClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            parser: Arc::new(EnvelopeParser::new()?),
        })
    }

    /// `POST /sessions` → the new session id.
    pub async fn create_session(&self) -> Result<String> {
        let response = self
            .http
            .post(self.config.endpoint("/sessions"))
            .timeout(self.config.session_timeout)
            .send()
            .await
            .map_err(|e| A2uiError::Http(format!("session create failed: {e}")))?;
        if !response.status().is_success() {
            return Err(A2uiError::Http(format!(
                "session create failed: HTTP {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| A2uiError::Http(format!("session create response: {e}")))?;
        body["sessionId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| A2uiError::Http("session create response missing sessionId".to_string()))
    }

    /// The server→client stream for one session.
    pub fn stream(&self, session_id: impl Into<String>) -> HttpUiStream {
        let (close_tx, _) = watch::channel(false);
        HttpUiStream {
            http: self.http.clone(),
            config: self.config.clone(),
            parser: self.parser.clone(),
            session_id: session_id.into(),
            close_tx,
        }
    }

    /// The client→server events conduit for one session.
    pub fn events(&self, session_id: impl Into<String>) -> HttpEvents {
        HttpEvents {
            http: self.http.clone(),
            config: self.config.clone(),
            session_id: session_id.into(),
        }
    }
}

/// Resumable SSE consumer for one session.
pub struct HttpUiStream {
    http: reqwest::Client,
    config: HttpClientConfig,
    parser: Arc<EnvelopeParser>,
    session_id: String,
    close_tx: watch::Sender<bool>,
}

#[async_trait]
impl UiStream for HttpUiStream {
    async fn open(&self) -> Result<EnvelopeStream> {
        let http = self.http.clone();
        let config = self.config.clone();
        let parser = self.parser.clone();
        let session_id = self.session_id.clone();
        let mut closed = self.close_tx.subscribe();

        let stream = async_stream::stream! {
            let url = config.endpoint("/stream");
            let mut last_event_id: Option<String> = None;
            let mut retry_ms = config.retry_ms;
            let mut backoff = Duration::from_millis(config.retry_ms);

            'connect: loop {
                if *closed.borrow() {
                    yield Ok(StreamItem::Done);
                    break;
                }

                let mut request = http
                    .get(&url)
                    .query(&[("session_id", session_id.as_str())])
                    .header("Accept", "text/event-stream");
                if let Some(id) = &last_event_id {
                    request = request.header("Last-Event-ID", id.clone());
                }

                let response = match request.send().await {
                    Ok(response) if response.status().is_success() => response,
                    Ok(response) => {
                        warn!(session = %session_id, status = %response.status(), "stream rejected");
                        yield Err(A2uiError::Http(format!(
                            "stream rejected: HTTP {}",
                            response.status()
                        )));
                        yield Ok(StreamItem::Done);
                        break;
                    }
                    Err(error) => {
                        warn!(session = %session_id, %error, backoff = ?backoff, "stream connect failed");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(config.max_backoff);
                        continue;
                    }
                };

                debug!(session = %session_id, resumed_from = ?last_event_id, "stream open");
                backoff = Duration::from_millis(retry_ms);
                let mut bytes = response.bytes_stream();
                let mut sse = SseParser::new();

                loop {
                    // None marks an explicit close; the inner Option is the
                    // byte stream's own end-of-stream.
                    let next = tokio::select! {
                        _ = closed.changed() => None,
                        chunk = bytes.next() => Some(chunk),
                    };
                    let Some(chunk) = next else {
                        yield Ok(StreamItem::Done);
                        break 'connect;
                    };
                    match chunk {
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
                                match parser.parse_line(&event.data) {
                                    Ok(envelope) => yield Ok(StreamItem::Envelope(envelope)),
                                    Err(error) => yield Err(A2uiError::Protocol(error)),
                                }
                            }
                        }
                        Some(Err(error)) => {
                            warn!(session = %session_id, %error, "stream read failed, reconnecting");
                            tokio::time::sleep(Duration::from_millis(retry_ms)).await;
                            backoff = Duration::from_millis(retry_ms);
                            continue 'connect;
                        }
                        None => {
                            // Clean close is the server's completion signal.
                            info!(session = %session_id, "stream completed");
                            yield Ok(StreamItem::Done);
                            break 'connect;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

/// Posts action and error envelopes for one session.
#[derive(Clone)]
pub struct HttpEvents {
    http: reqwest::Client,
    config: HttpClientConfig,
    session_id: String,
}

impl HttpEvents {
    async fn post(&self, event: Value, broadcast: Option<DataBroadcast>) -> Result<()> {
        let mut body = json!({ "sessionId": self.session_id, "event": event });
        if let Some(broadcast) = broadcast {
            body["broadcast"] = Value::Object(broadcast);
        }

        let response = self
            .http
            .post(self.config.endpoint("/events"))
            .timeout(self.config.event_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| A2uiError::Http(format!("event post failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // 4xx is surfaced to the caller and never retried.
        Err(A2uiError::Http(format!("event post rejected: HTTP {status}")))
    }
}

#[async_trait]
impl Events for HttpEvents {
    async fn post_action(
        &self,
        envelope: a2ui_core::Envelope,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()> {
        self.post(serde_json::to_value(&envelope)?, broadcast).await
    }

    async fn post_error(
        &self,
        error: ProtocolError,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()> {
        self.post(serde_json::to_value(a2ui_core::Envelope::Error(error))?, broadcast).await
    }
}
