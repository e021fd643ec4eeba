//! In-process transport: a producer and a consumer joined by a channel.
//!
//! No reordering, no loss. Dropping the producer or calling
//! [`LocalProducer::done`] delivers a single `Done` to the consumer.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use a2ui_core::envelope::Envelope;
use a2ui_core::{A2uiError, ProtocolError, Result};
use a2ui_session::DataBroadcast;

use crate::{EnvelopeStream, Events, StreamItem, UiStream};

/// Create a connected producer/consumer pair with the given channel capacity.
pub fn local_pair(buffer: usize) -> (LocalProducer, LocalUiStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let (close_tx, close_rx) = watch::channel(false);
    (
        LocalProducer { tx },
        LocalUiStream { rx: Mutex::new(Some(rx)), close_tx, close_rx },
    )
}

/// Server half of the local transport.
#[derive(Clone)]
pub struct LocalProducer {
    tx: mpsc::Sender<Envelope>,
}

impl LocalProducer {
    pub async fn emit(&self, envelope: Envelope) -> Result<()> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| A2uiError::Channel("local consumer is gone".to_string()))
    }

    /// Signal completion by consuming the producer (the consumer observes a
    /// single `Done`).
    pub fn done(self) {}
}

/// Client half of the local transport.
pub struct LocalUiStream {
    rx: Mutex<Option<mpsc::Receiver<Envelope>>>,
    close_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
}

#[async_trait]
impl UiStream for LocalUiStream {
    async fn open(&self) -> Result<EnvelopeStream> {
        let mut receiver = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| A2uiError::Transport("local stream already opened".to_string()))?;
        let mut closed = self.close_rx.clone();

        enum Next {
            Item(Option<Envelope>),
            Closed,
        }

        let stream = async_stream::stream! {
            loop {
                let next = tokio::select! {
                    item = receiver.recv() => Next::Item(item),
                    // Either an explicit close or the stream handle is gone.
                    _ = closed.changed() => Next::Closed,
                };
                match next {
                    Next::Item(Some(envelope)) => yield Ok(StreamItem::Envelope(envelope)),
                    Next::Item(None) => {
                        yield Ok(StreamItem::Done);
                        break;
                    }
                    Next::Closed => {
                        debug!("local stream closed");
                        yield Ok(StreamItem::Done);
                        break;
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

/// One event posted through [`LocalEvents`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostedEvent {
    pub envelope: Envelope,
    pub broadcast: Option<DataBroadcast>,
}

/// Create a connected client→server events pair; the receiver sees every
/// posted event in order.
pub fn local_events_pair(buffer: usize) -> (LocalEvents, mpsc::Receiver<PostedEvent>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (LocalEvents { tx }, rx)
}

#[derive(Clone)]
pub struct LocalEvents {
    tx: mpsc::Sender<PostedEvent>,
}

#[async_trait]
impl Events for LocalEvents {
    async fn post_action(
        &self,
        envelope: Envelope,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()> {
        self.tx
            .send(PostedEvent { envelope, broadcast })
            .await
            .map_err(|_| A2uiError::Channel("local event sink is gone".to_string()))
    }

    async fn post_error(
        &self,
        error: ProtocolError,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()> {
        self.post_action(Envelope::Error(error), broadcast).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2ui_core::envelope::DeleteSurface;
    use futures::StreamExt;

    fn delete(id: &str) -> Envelope {
        Envelope::DeleteSurface(DeleteSurface { surface_id: id.to_string() })
    }

    #[tokio::test]
    async fn delivers_in_order_then_done_on_producer_drop() {
        let (producer, consumer) = local_pair(8);
        let mut stream = consumer.open().await.unwrap();

        producer.emit(delete("a")).await.unwrap();
        producer.emit(delete("b")).await.unwrap();
        producer.done();

        assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Envelope(delete("a")));
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Envelope(delete("b")));
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn close_delivers_single_done() {
        let (_producer, consumer) = local_pair(8);
        let mut stream = consumer.open().await.unwrap();
        consumer.close().await;
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamItem::Done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn open_twice_fails() {
        let (_producer, consumer) = local_pair(1);
        let _stream = consumer.open().await.unwrap();
        assert!(consumer.open().await.is_err());
    }

    #[tokio::test]
    async fn events_loop_back_with_broadcast() {
        let (events, mut rx) = local_events_pair(4);
        let mut broadcast = DataBroadcast::new();
        broadcast.insert("s".to_string(), serde_json::json!({ "counter": 1 }));

        events.post_action(delete("s"), Some(broadcast.clone())).await.unwrap();
        let posted = rx.recv().await.unwrap();
        assert_eq!(posted.envelope, delete("s"));
        assert_eq!(posted.broadcast, Some(broadcast));
    }
}
