//! Minimal A2UI stream server.
//!
//! Serves the stream endpoints on port 8080 and pushes a v0.9 counter
//! surface to every session, incrementing once per second. Received client
//! events are logged.
//!
//! Run with: cargo run -p a2ui-server --example counter_server

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use a2ui_server::{channel_event_sink, create_app, ServerConfig, StreamController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (sink, mut events) = channel_event_sink(64);
    let controller = StreamController::new(ServerConfig::default(), Arc::new(sink));
    let registry = controller.registry();
    let app = create_app(controller);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("client event on {}: {}", event.session_id, event.event);
        }
    });

    let producer_registry = registry.clone();
    tokio::spawn(async move {
        let mut seeded: HashSet<String> = HashSet::new();
        let mut counter = 0i64;
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter += 1;
            for session_id in producer_registry.session_ids().await {
                if seeded.insert(session_id.clone()) {
                    for envelope in surface_setup() {
                        let _ = producer_registry.broadcast(&session_id, envelope).await;
                    }
                }
                let _ = producer_registry
                    .broadcast(
                        &session_id,
                        json!({
                            "updateDataModel": {
                                "surfaceId": "main",
                                "path": "/counter",
                                "value": counter
                            }
                        }),
                    )
                    .await;
            }
        }
    });

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    println!("listening on http://0.0.0.0:8080 (POST /sessions, GET /stream?session_id=…)");
    axum::serve(listener, app).await?;
    Ok(())
}

fn surface_setup() -> Vec<serde_json::Value> {
    vec![
        json!({
            "createSurface": {
                "surfaceId": "main",
                "catalogId": "https://a2ui.org/specification/v0.9/standard_catalog.json"
            }
        }),
        json!({
            "updateComponents": {
                "surfaceId": "main",
                "components": [
                    { "id": "root", "component": "Column", "children": ["label", "btn"] },
                    { "id": "label", "component": "Text", "text": { "path": "/counter" } },
                    { "id": "btn", "component": "Button", "child": "btnLabel",
                      "action": { "event": { "name": "reset" } } },
                    { "id": "btnLabel", "component": "Text", "text": "Reset" }
                ]
            }
        }),
        json!({ "updateDataModel": { "surfaceId": "main", "value": { "counter": 0 } } }),
    ]
}
