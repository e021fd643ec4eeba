//! Stream-to-session pump.
//!
//! Applies every envelope a [`UiStream`] delivers to a session and posts
//! envelope-level protocol errors back through an [`Events`] conduit, so the
//! server observes client-side faults. The host keeps its own view through
//! the session handle (snapshots, error subscription).

use tracing::{debug, info, warn};

use a2ui_core::{A2uiError, Result};
use a2ui_session::SessionHandle;

use crate::{Events, StreamItem, UiStream};

/// Drain `transport`'s stream into `session` until `Done`. Protocol errors
/// (malformed frames, rejected envelopes) are posted through `events` with
/// the current data broadcast attached; transport-level errors abort.
pub async fn drive_ui_stream(
    transport: &dyn UiStream,
    session: &SessionHandle,
    events: &dyn Events,
) -> Result<()> {
    use futures::StreamExt;

    let mut stream = transport.open().await?;
    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamItem::Envelope(envelope)) => {
                let key = envelope.key();
                match session.apply_envelope(envelope).await {
                    Ok(outcome) => debug!(key, ?outcome, "envelope applied"),
                    Err(A2uiError::Protocol(error)) => {
                        warn!(key, %error, "envelope rejected");
                        post_error(session, events, error).await;
                    }
                    Err(other) => return Err(other),
                }
            }
            Ok(StreamItem::Done) => {
                info!("ui stream done");
                break;
            }
            Err(A2uiError::Protocol(error)) => {
                warn!(%error, "stream frame rejected");
                post_error(session, events, error).await;
            }
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

async fn post_error(
    session: &SessionHandle,
    events: &dyn Events,
    error: a2ui_core::ProtocolError,
) {
    let broadcast = session.data_broadcast().await.unwrap_or(None);
    if let Err(post_error) = events.post_error(error, broadcast).await {
        warn!(%post_error, "failed to post error envelope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{local_events_pair, local_pair};
    use a2ui_core::envelope::Envelope;
    use a2ui_core::{ErrorKind, V0_9_STANDARD_CATALOG_ID};
    use a2ui_session::Session;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> Envelope {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn applies_stream_and_posts_rejections() {
        let (producer, consumer) = local_pair(8);
        let (events, mut inbound) = local_events_pair(8);
        let session = SessionHandle::spawn(Session::new());

        producer
            .emit(parse(json!({
                "createSurface": { "surfaceId": "s", "catalogId": V0_9_STANDARD_CATALOG_ID }
            })))
            .await
            .unwrap();
        // Rejected: missing catalog on a second surface.
        producer
            .emit(parse(json!({ "createSurface": { "surfaceId": "bad" } })))
            .await
            .unwrap();
        producer
            .emit(parse(json!({
                "updateDataModel": { "surfaceId": "s", "value": { "ok": true } }
            })))
            .await
            .unwrap();
        producer.done();

        drive_ui_stream(&consumer, &session, &events).await.unwrap();

        let surface = session.surface("s").await.unwrap().unwrap();
        assert_eq!(surface.read("/ok"), Some(&json!(true)));
        assert!(session.surface("bad").await.unwrap().is_none());

        let posted = inbound.recv().await.unwrap();
        let Envelope::Error(error) = posted.envelope else {
            panic!("expected error envelope, got {:?}", posted.envelope)
        };
        assert_eq!(error.kind, ErrorKind::MissingCatalogId);
    }
}
