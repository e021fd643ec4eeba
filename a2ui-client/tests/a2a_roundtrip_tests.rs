//! A2A client↔server round trip over a live listener.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::Mutex;

use a2ui_client::{A2aClientConfig, A2aUiClient};
use a2ui_core::envelope::Envelope;
use a2ui_core::ProtocolVersion;
use a2ui_server::{build_agent_card, create_a2a_router, A2aController, ServerConfig, TaskHandler};
use a2ui_session::ClientCapabilities;
use a2ui_transport::a2a::Message;
use a2ui_transport::StreamItem;

struct RecordingHandler {
    last_action: Arc<Mutex<Option<Message>>>,
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    async fn on_task_created(&self, _task_id: &str, _message: &Message) -> a2ui_core::Result<()> {
        Ok(())
    }

    async fn on_action(&self, task_id: &str, message: &Message) -> a2ui_core::Result<String> {
        *self.last_action.lock().await = Some(message.clone());
        Ok(format!("{task_id}-next"))
    }
}

struct Harness {
    controller: A2aController,
    client: A2aUiClient,
    last_action: Arc<Mutex<Option<Message>>>,
}

async fn start() -> Harness {
    let last_action = Arc::new(Mutex::new(None));
    let card = build_agent_card(
        "counter-agent",
        "streams a counter surface",
        "http://localhost",
        &[ProtocolVersion::V0_9],
    );
    let controller = A2aController::new(
        card,
        Arc::new(RecordingHandler { last_action: last_action.clone() }),
        ServerConfig::default(),
    );
    let app = create_a2a_router(controller.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let capabilities =
        ClientCapabilities::new(vec![a2ui_core::V0_9_STANDARD_CATALOG_ID.to_string()]);
    let client = A2aUiClient::new(
        A2aClientConfig::new(format!("http://{addr}"), ProtocolVersion::V0_9),
        capabilities,
    )
    .unwrap();

    Harness { controller, client, last_action }
}

#[tokio::test]
async fn discovery_checks_extension() {
    let mut harness = start().await;
    let card = harness.client.discover().await.unwrap();
    assert_eq!(card.name, "counter-agent");
    assert!(card.supports_extension(a2ui_core::V0_9_EXTENSION_URI));
}

#[tokio::test]
async fn task_stream_delivers_envelopes_from_data_parts() {
    let harness = start().await;
    let task_id = harness.client.create_task("render a counter").await.unwrap();

    let envelopes: Vec<Envelope> = [
        json!({
            "createSurface": {
                "surfaceId": "main",
                "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID
            }
        }),
        json!({ "updateDataModel": { "surfaceId": "main", "value": { "counter": 0 } } }),
    ]
    .into_iter()
    .map(|raw| serde_json::from_value(raw).unwrap())
    .collect();
    harness.controller.publish_envelopes(&task_id, &envelopes).await.unwrap();

    let mut stream = harness.client.open_task_stream(&task_id);

    let first = stream.next().await.unwrap().unwrap();
    let StreamItem::Envelope(Envelope::CreateSurface(create)) = first else {
        panic!("expected createSurface, got {first:?}");
    };
    assert_eq!(create.surface_id, "main");

    let second = stream.next().await.unwrap().unwrap();
    assert!(matches!(second, StreamItem::Envelope(Envelope::UpdateDataModel(_))));

    harness.controller.complete(&task_id).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Done);
}

#[tokio::test]
async fn action_message_carries_capabilities_and_broadcast() {
    let harness = start().await;
    let task_id = harness.client.create_task("render").await.unwrap();

    let action: Envelope = serde_json::from_value(json!({
        "action": {
            "name": "increment",
            "surfaceId": "main",
            "sourceComponentId": "btn",
            "timestamp": "2026-01-01T00:00:00Z",
            "context": {}
        }
    }))
    .unwrap();
    let mut broadcast = a2ui_session::DataBroadcast::new();
    broadcast.insert("main".to_string(), json!({ "counter": 2 }));

    let follow_up =
        harness.client.post_action(&task_id, &action, Some(broadcast)).await.unwrap();
    assert_eq!(follow_up, format!("{task_id}-next"));

    let message = harness.last_action.lock().await.clone().unwrap();
    let payloads = message.a2ui_payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["action"]["name"], "increment");

    let metadata = message.metadata.unwrap();
    assert_eq!(
        metadata["a2uiClientCapabilities"]["supportedCatalogIds"][0],
        a2ui_core::V0_9_STANDARD_CATALOG_ID
    );
    assert_eq!(metadata["a2uiDataBroadcast"]["main"]["counter"], 2);
}
