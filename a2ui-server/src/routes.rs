//! HTTP+SSE endpoints.
//!
//! Mounted under the configured prefix:
//! - `POST /sessions` → `201 {sessionId}`
//! - `POST /message` → publish an envelope to a session's stream
//! - `POST /events` → hand a client event to the configured [`EventSink`]
//! - `POST /done` → publish the completion marker
//! - `GET /stream?session_id=…` → SSE with ids, retry hint, heartbeats and
//!   `Last-Event-ID` replay

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::registry::{RegistryError, SessionRegistry, StoredEvent, StreamMessage};

/// Receives client events posted to `/events`.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle_event(
        &self,
        session_id: &str,
        event: Value,
        broadcast: Option<Value>,
    ) -> a2ui_core::Result<()>;
}

/// An event received by a [`ChannelEventSink`].
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub session_id: String,
    pub event: Value,
    pub broadcast: Option<Value>,
}

/// Event sink that forwards into an mpsc channel.
pub struct ChannelEventSink {
    tx: mpsc::Sender<InboundEvent>,
}

pub fn channel_event_sink(buffer: usize) -> (ChannelEventSink, mpsc::Receiver<InboundEvent>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ChannelEventSink { tx }, rx)
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn handle_event(
        &self,
        session_id: &str,
        event: Value,
        broadcast: Option<Value>,
    ) -> a2ui_core::Result<()> {
        self.tx
            .send(InboundEvent { session_id: session_id.to_string(), event, broadcast })
            .await
            .map_err(|_| a2ui_core::A2uiError::Channel("event sink receiver gone".to_string()))
    }
}

/// Controller for the stream endpoints.
#[derive(Clone)]
pub struct StreamController {
    registry: Arc<SessionRegistry>,
    events: Arc<dyn EventSink>,
    config: ServerConfig,
}

impl StreamController {
    pub fn new(config: ServerConfig, events: Arc<dyn EventSink>) -> Self {
        let registry =
            Arc::new(SessionRegistry::new(config.ring_capacity, config.topic_prefix.clone()));
        Self { registry, events, config }
    }

    /// The registry hosts publish envelopes through.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Assemble the router for the stream endpoints.
pub fn create_app(controller: StreamController) -> Router {
    let prefix = controller.config.route_prefix.clone();
    Router::new()
        .route(&format!("{prefix}/sessions"), post(create_session))
        .route(&format!("{prefix}/message"), post(publish_message))
        .route(&format!("{prefix}/events"), post(post_event))
        .route(&format!("{prefix}/done"), post(post_done))
        .route(&format!("{prefix}/stream"), get(open_stream))
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest {
    session_id: String,
    message: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest {
    session_id: String,
    event: Value,
    #[serde(default)]
    broadcast: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoneRequest {
    session_id: String,
}

#[derive(Deserialize)]
struct StreamQuery {
    session_id: String,
}

async fn create_session(State(controller): State<StreamController>) -> impl IntoResponse {
    let session_id = controller.registry.create_session().await;
    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

async fn publish_message(
    State(controller): State<StreamController>,
    Json(request): Json<PublishRequest>,
) -> impl IntoResponse {
    match controller.registry.broadcast(&request.session_id, request.message).await {
        Ok(event_id) => (StatusCode::OK, Json(json!({ "eventId": event_id }))),
        Err(RegistryError::NotFound(_)) => not_found(),
    }
}

async fn post_event(
    State(controller): State<StreamController>,
    Json(request): Json<EventRequest>,
) -> impl IntoResponse {
    if !controller.registry.contains(&request.session_id).await {
        return not_found();
    }
    match controller
        .events
        .handle_event(&request.session_id, request.event, request.broadcast)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "accepted" }))),
        Err(err) => {
            warn!(error = %err, "event handler rejected event");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
        }
    }
}

async fn post_done(
    State(controller): State<StreamController>,
    Json(request): Json<DoneRequest>,
) -> impl IntoResponse {
    match controller.registry.broadcast_done(&request.session_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "done" }))),
        Err(RegistryError::NotFound(_)) => not_found(),
    }
}

async fn open_stream(
    State(controller): State<StreamController>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let last_event_id = parse_last_event_id(&headers);
    sse_response(controller.registry.clone(), &controller.config, &query.session_id, last_event_id)
        .await
        .map_err(|_| not_found())
}

pub(crate) fn parse_last_event_id(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("last-event-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Build the SSE response for one subscriber: retry hint, replay, then live
/// delivery until a done/error marker or the subscriber falls behind.
pub(crate) async fn sse_response(
    registry: Arc<SessionRegistry>,
    config: &ServerConfig,
    session_id: &str,
    last_event_id: Option<u64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, RegistryError> {
    let (replay, mut live) = registry.subscribe(session_id, last_event_id).await?;
    let retry = Duration::from_millis(config.retry_ms);
    let session = session_id.to_string();

    let stream = async_stream::stream! {
        yield Ok(Event::default().retry(retry));
        for event in replay {
            yield Ok(sse_event(&event));
        }
        loop {
            match live.recv().await {
                Ok(StreamMessage::Event(event)) => yield Ok(sse_event(&event)),
                Ok(StreamMessage::Done) => break,
                Ok(StreamMessage::Error(message)) => {
                    warn!(session = %session, %message, "stream closed on error");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session = %session, skipped, "slow subscriber disconnected");
                    break;
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(config.heartbeat).text("heartbeat")))
}

fn sse_event(event: &StoredEvent) -> Event {
    Event::default().id(event.id.to_string()).data(event.data.to_string())
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
}
