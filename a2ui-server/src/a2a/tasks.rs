//! A2A task endpoints.
//!
//! - `GET /.well-known/agent.json` → agent descriptor
//! - `POST {prefix}/a2a/tasks` → open a task from an initial message
//! - `GET {prefix}/a2a/tasks/{task_id}` → SSE stream of A2A messages with
//!   the same replay/heartbeat semantics as the plain stream endpoint
//! - `POST {prefix}/a2a/tasks/{task_id}` → action message; the handler
//!   answers with a follow-up task id the client then streams
//!
//! The LLM bridge producing envelopes is a host concern: it receives tasks
//! through [`TaskHandler`] and streams messages back via
//! [`A2aController::publish`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use a2ui_core::envelope::Envelope;
use a2ui_transport::a2a::{wrap_envelopes, AgentCard, Message};

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::routes::{parse_last_event_id, sse_response};

/// One open task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub created_at: String,
}

/// In-memory task storage.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn store(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn remove(&self, task_id: &str) -> Option<Task> {
        self.tasks.write().await.remove(task_id)
    }
}

/// Host hooks driving what tasks actually do.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// A client opened `task_id` with an initial message.
    async fn on_task_created(&self, task_id: &str, message: &Message) -> a2ui_core::Result<()>;

    /// A client posted an action message against `task_id`. Returns the id
    /// of the follow-up task the client should stream next.
    async fn on_action(&self, task_id: &str, message: &Message) -> a2ui_core::Result<String>;
}

/// Controller for the A2A protocol endpoints.
#[derive(Clone)]
pub struct A2aController {
    card: AgentCard,
    store: Arc<TaskStore>,
    registry: Arc<SessionRegistry>,
    handler: Arc<dyn TaskHandler>,
    config: ServerConfig,
}

impl A2aController {
    pub fn new(card: AgentCard, handler: Arc<dyn TaskHandler>, config: ServerConfig) -> Self {
        let registry =
            Arc::new(SessionRegistry::new(config.ring_capacity, "a2ui:task:".to_string()));
        Self { card, store: Arc::new(TaskStore::new()), registry, handler, config }
    }

    pub fn agent_card(&self) -> &AgentCard {
        &self.card
    }

    /// Open a task under a fresh id and register its stream topic.
    pub async fn open_task(&self, context_id: Option<String>) -> Task {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            context_id,
            created_at: Utc::now().to_rfc3339(),
        };
        self.registry.create_session_with_id(&task.id).await;
        self.store.store(task.clone()).await;
        info!(task = %task.id, "task opened");
        task
    }

    /// Stream one A2A message to the task's subscribers.
    pub async fn publish(&self, task_id: &str, message: &Message) -> a2ui_core::Result<u64> {
        let value = serde_json::to_value(message)?;
        self.registry
            .broadcast(task_id, value)
            .await
            .map_err(|err| a2ui_core::A2uiError::Transport(err.to_string()))
    }

    /// Convenience: wrap envelopes into one message and stream it.
    pub async fn publish_envelopes(
        &self,
        task_id: &str,
        envelopes: &[Envelope],
    ) -> a2ui_core::Result<u64> {
        let message = wrap_envelopes(envelopes, task_id, Uuid::new_v4().to_string())?;
        self.publish(task_id, &message).await
    }

    /// Complete the task's stream; subscribers observe the connection close.
    pub async fn complete(&self, task_id: &str) -> a2ui_core::Result<()> {
        self.registry
            .broadcast_done(task_id)
            .await
            .map_err(|err| a2ui_core::A2uiError::Transport(err.to_string()))
    }
}

/// Assemble the router for the A2A endpoints.
pub fn create_a2a_router(controller: A2aController) -> Router {
    let prefix = controller.config.route_prefix.clone();
    Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route(&format!("{prefix}/a2a/tasks"), post(create_task))
        .route(
            &format!("{prefix}/a2a/tasks/{{task_id}}"),
            get(open_task_stream).post(post_task_message),
        )
        .with_state(controller)
}

async fn get_agent_card(State(controller): State<A2aController>) -> impl IntoResponse {
    Json(controller.card.clone())
}

async fn create_task(
    State(controller): State<A2aController>,
    Json(message): Json<Message>,
) -> impl IntoResponse {
    let task = controller.open_task(message.context_id.clone()).await;
    if let Err(err) = controller.handler.on_task_created(&task.id, &message).await {
        warn!(task = %task.id, error = %err, "task handler failed");
        controller.store.remove(&task.id).await;
        controller.registry.remove(&task.id).await;
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "taskId": task.id })))
}

async fn open_task_stream(
    State(controller): State<A2aController>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if controller.store.get(&task_id).await.is_none() {
        return Err((StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))));
    }
    let last_event_id = parse_last_event_id(&headers);
    sse_response(controller.registry.clone(), &controller.config, &task_id, last_event_id)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))))
}

async fn post_task_message(
    State(controller): State<A2aController>,
    Path(task_id): Path<String>,
    Json(message): Json<Message>,
) -> impl IntoResponse {
    if controller.store.get(&task_id).await.is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })));
    }
    match controller.handler.on_action(&task_id, &message).await {
        Ok(follow_up) => {
            // Typical flow: the action spawns a follow-up task the client
            // opens a fresh stream on.
            if controller.store.get(&follow_up).await.is_none() {
                let task = Task {
                    id: follow_up.clone(),
                    context_id: message.context_id.clone(),
                    created_at: Utc::now().to_rfc3339(),
                };
                controller.registry.create_session_with_id(&task.id).await;
                controller.store.store(task).await;
            }
            (StatusCode::OK, Json(json!({ "taskId": follow_up })))
        }
        Err(err) => {
            warn!(task = %task_id, error = %err, "action handler failed");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
        }
    }
}
