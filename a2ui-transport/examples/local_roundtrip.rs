//! Full in-process round trip: producer → session → action → event sink.
//!
//! Run with: cargo run -p a2ui-transport --example local_roundtrip

use futures::StreamExt;
use serde_json::json;

use a2ui_core::{EnvelopeParser, V0_9_STANDARD_CATALOG_ID};
use a2ui_session::{build_data_broadcast, ActionRequest, Session};
use a2ui_transport::local::{local_events_pair, local_pair};
use a2ui_transport::{Events, StreamItem, UiStream};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let parser = EnvelopeParser::new()?;
    let (producer, consumer) = local_pair(16);
    let (events, mut inbound) = local_events_pair(16);

    // Server half: emit a small surface, then finish.
    let lines = [
        json!({
            "createSurface": {
                "surfaceId": "main",
                "catalogId": V0_9_STANDARD_CATALOG_ID,
                "broadcastDataModel": true
            }
        }),
        json!({ "updateDataModel": { "surfaceId": "main", "value": { "counter": 41 } } }),
        json!({
            "updateComponents": {
                "surfaceId": "main",
                "components": [
                    { "id": "root", "component": "Column", "children": ["btn"] },
                    { "id": "btn", "component": "Button", "child": "label",
                      "action": { "event": { "name": "increment" } } },
                    { "id": "label", "component": "Text", "text": { "path": "/counter" } }
                ]
            }
        }),
    ];
    for line in lines {
        producer.emit(parser.parse_value(line)?).await?;
    }
    producer.done();

    // Client half: apply the stream, then fire the button's action.
    let mut session = Session::new();
    let mut stream = consumer.open().await?;
    while let Some(item) = stream.next().await {
        match item? {
            StreamItem::Envelope(envelope) => {
                session.apply_envelope(&envelope)?;
            }
            StreamItem::Done => break,
        }
    }

    let surface = session.surface("main").expect("surface applied");
    println!("counter renders as {:?}", surface.resolve_prop("label", "text", ""));

    let action = session.build_action("main", &ActionRequest::new("increment", "btn"))?;
    events.post_action(action, build_data_broadcast(&session)).await?;

    let posted = inbound.recv().await.expect("event posted");
    println!("outbound event: {}", serde_json::to_string(&posted.envelope)?);
    if let Some(broadcast) = posted.broadcast {
        println!("data broadcast: {}", serde_json::to_string(&broadcast)?);
    }
    Ok(())
}
