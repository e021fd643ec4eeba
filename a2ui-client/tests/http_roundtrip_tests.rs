//! Client↔server round trip over a live listener.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;

use a2ui_client::{HttpClientConfig, HttpStreamClient};
use a2ui_core::envelope::Envelope;
use a2ui_core::ErrorKind;
use a2ui_server::{channel_event_sink, create_app, InboundEvent, ServerConfig, StreamController};
use a2ui_transport::{Events, StreamItem, UiStream};

struct Harness {
    client: HttpStreamClient,
    controller: StreamController,
    inbound: mpsc::Receiver<InboundEvent>,
}

async fn start() -> Harness {
    let (sink, inbound) = channel_event_sink(16);
    let controller = StreamController::new(
        ServerConfig::default().with_heartbeat(Duration::from_secs(5)),
        Arc::new(sink),
    );
    let app = create_app(controller.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = HttpStreamClient::new(HttpClientConfig::new(format!("http://{addr}"))).unwrap();
    Harness { client, controller, inbound }
}

#[tokio::test]
async fn envelopes_flow_server_to_client_until_done() {
    let harness = start().await;
    let session_id = harness.client.create_session().await.unwrap();
    let registry = harness.controller.registry();

    let stream_handle = harness.client.stream(&session_id);
    let mut stream = stream_handle.open().await.unwrap();

    registry
        .broadcast(
            &session_id,
            json!({ "createSurface": { "surfaceId": "s", "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID } }),
        )
        .await
        .unwrap();
    registry
        .broadcast(
            &session_id,
            json!({ "updateDataModel": { "surfaceId": "s", "value": { "counter": 0 } } }),
        )
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    let StreamItem::Envelope(Envelope::CreateSurface(create)) = first else {
        panic!("expected createSurface, got {first:?}");
    };
    assert_eq!(create.surface_id, "s");

    let second = stream.next().await.unwrap().unwrap();
    let StreamItem::Envelope(Envelope::UpdateDataModel(update)) = second else {
        panic!("expected updateDataModel, got {second:?}");
    };
    assert_eq!(update.value["counter"], 0);

    // The consumer is live now, so the completion marker reaches it.
    registry.broadcast_done(&session_id).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Done);
}

#[tokio::test]
async fn malformed_frames_surface_as_protocol_errors_without_killing_stream() {
    let harness = start().await;
    let session_id = harness.client.create_session().await.unwrap();
    let registry = harness.controller.registry();

    let stream_handle = harness.client.stream(&session_id);
    let mut stream = stream_handle.open().await.unwrap();

    registry.broadcast(&session_id, json!({ "bogusKind": { "surfaceId": "s" } })).await.unwrap();
    registry.broadcast(&session_id, json!({ "deleteSurface": { "surfaceId": "s" } })).await.unwrap();

    let first = stream.next().await.unwrap();
    let Err(a2ui_core::A2uiError::Protocol(err)) = first else {
        panic!("expected protocol error, got {first:?}");
    };
    assert_eq!(err.kind, ErrorKind::UnknownMessageType);

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(
        second,
        StreamItem::Envelope(Envelope::DeleteSurface(a2ui_core::DeleteSurface {
            surface_id: "s".to_string()
        }))
    );
}

#[tokio::test]
async fn posted_actions_arrive_at_the_server_sink() {
    let mut harness = start().await;
    let session_id = harness.client.create_session().await.unwrap();

    let events = harness.client.events(&session_id);
    let envelope: Envelope = serde_json::from_value(json!({
        "action": {
            "name": "increment",
            "surfaceId": "s",
            "sourceComponentId": "btn",
            "timestamp": "2026-01-01T00:00:00Z",
            "context": {}
        }
    }))
    .unwrap();

    let mut broadcast = a2ui_session::DataBroadcast::new();
    broadcast.insert("s".to_string(), json!({ "counter": 1 }));
    events.post_action(envelope, Some(broadcast)).await.unwrap();

    let inbound = harness.inbound.recv().await.unwrap();
    assert_eq!(inbound.session_id, session_id);
    assert_eq!(inbound.event["action"]["name"], "increment");
    assert_eq!(inbound.broadcast.unwrap()["s"]["counter"], 1);
}

#[tokio::test]
async fn post_to_unknown_session_is_surfaced_not_retried() {
    let harness = start().await;
    let events = harness.client.events("ghost");
    let envelope: Envelope =
        serde_json::from_value(json!({ "deleteSurface": { "surfaceId": "s" } })).unwrap();

    let err = events.post_action(envelope, None).await.unwrap_err();
    let a2ui_core::A2uiError::Http(message) = err else { panic!("expected http error") };
    assert!(message.contains("404"), "got {message}");
}

#[tokio::test]
async fn close_yields_done_promptly() {
    let harness = start().await;
    let session_id = harness.client.create_session().await.unwrap();

    let stream_handle = harness.client.stream(&session_id);
    let mut stream = stream_handle.open().await.unwrap();
    stream_handle.close().await;

    let item = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("close must not hang")
        .unwrap()
        .unwrap();
    assert_eq!(item, StreamItem::Done);
}
