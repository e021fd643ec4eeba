//! Single-writer session actor.
//!
//! A [`SessionHandle`] owns nothing but channels; the [`Session`] itself
//! lives on a dedicated tokio task that drains a command mailbox, so exactly
//! one logical writer ever touches a surface. Envelope-level protocol errors
//! are additionally fanned out on a broadcast channel for the host and for
//! transports that post them back to the server.

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;

use a2ui_core::envelope::Envelope;
use a2ui_core::{A2uiError, ProtocolError, Result};

use crate::broadcast::{build_data_broadcast, DataBroadcast};
use crate::capabilities::ClientCapabilities;
use crate::events::ActionRequest;
use crate::session::{ApplyOutcome, Session};
use crate::surface::Surface;

const MAILBOX_CAPACITY: usize = 64;
const ERROR_CHANNEL_CAPACITY: usize = 32;

enum Command {
    Apply { envelope: Envelope, reply: oneshot::Sender<std::result::Result<ApplyOutcome, ProtocolError>> },
    UpdateData {
        surface_id: String,
        path: String,
        value: Value,
        reply: oneshot::Sender<std::result::Result<(), ProtocolError>>,
    },
    BuildAction {
        surface_id: String,
        request: ActionRequest,
        reply: oneshot::Sender<std::result::Result<Envelope, ProtocolError>>,
    },
    Snapshot { surface_id: String, reply: oneshot::Sender<Option<Surface>> },
    DataBroadcast { reply: oneshot::Sender<Option<DataBroadcast>> },
    Capabilities { reply: oneshot::Sender<ClientCapabilities> },
    Reset { reply: oneshot::Sender<()> },
}

/// Cheap, clonable handle to a session running on its own task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    errors: broadcast::Sender<ProtocolError>,
}

impl SessionHandle {
    /// Move `session` onto its own task and return the handle. The task ends
    /// when the last handle is dropped.
    pub fn spawn(session: Session) -> Self {
        let (commands, mut mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let error_sender = errors.clone();

        tokio::spawn(async move {
            let mut session = session;
            while let Some(command) = mailbox.recv().await {
                match command {
                    Command::Apply { envelope, reply } => {
                        let result = session.apply_envelope(&envelope);
                        if let Err(err) = &result {
                            let _ = error_sender.send(err.clone());
                        }
                        let _ = reply.send(result);
                    }
                    Command::UpdateData { surface_id, path, value, reply } => {
                        let result = session.update_data_at_path(&surface_id, &path, value);
                        if let Err(err) = &result {
                            let _ = error_sender.send(err.clone());
                        }
                        let _ = reply.send(result);
                    }
                    Command::BuildAction { surface_id, request, reply } => {
                        let result = session.build_action(&surface_id, &request);
                        if let Err(err) = &result {
                            let _ = error_sender.send(err.clone());
                        }
                        let _ = reply.send(result);
                    }
                    Command::Snapshot { surface_id, reply } => {
                        let _ = reply.send(session.surface(&surface_id).cloned());
                    }
                    Command::DataBroadcast { reply } => {
                        let _ = reply.send(build_data_broadcast(&session));
                    }
                    Command::Capabilities { reply } => {
                        let _ = reply.send(session.capabilities().clone());
                    }
                    Command::Reset { reply } => {
                        session.reset();
                        let _ = reply.send(());
                    }
                }
            }
            info!("session actor stopped");
        });

        Self { commands, errors }
    }

    pub async fn apply_envelope(&self, envelope: Envelope) -> Result<ApplyOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Apply { envelope, reply }).await?;
        Ok(recv(rx).await??)
    }

    pub async fn update_data_at_path(
        &self,
        surface_id: impl Into<String>,
        path: impl Into<String>,
        value: Value,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateData {
            surface_id: surface_id.into(),
            path: path.into(),
            value,
            reply,
        })
        .await?;
        Ok(recv(rx).await??)
    }

    pub async fn build_action(
        &self,
        surface_id: impl Into<String>,
        request: ActionRequest,
    ) -> Result<Envelope> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::BuildAction { surface_id: surface_id.into(), request, reply }).await?;
        Ok(recv(rx).await??)
    }

    /// Consistent snapshot of one surface, or `None` if it does not exist.
    pub async fn surface(&self, surface_id: impl Into<String>) -> Result<Option<Surface>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { surface_id: surface_id.into(), reply }).await?;
        recv(rx).await
    }

    pub async fn data_broadcast(&self) -> Result<Option<DataBroadcast>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::DataBroadcast { reply }).await?;
        recv(rx).await
    }

    pub async fn capabilities(&self) -> Result<ClientCapabilities> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Capabilities { reply }).await?;
        recv(rx).await
    }

    pub async fn reset(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reset { reply }).await?;
        recv(rx).await
    }

    /// Subscribe to envelope-level protocol errors as they happen.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ProtocolError> {
        self.errors.subscribe()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| A2uiError::Channel("session actor stopped".to_string()))
    }
}

async fn recv<T>(rx: oneshot::Receiver<T>) -> Result<T> {
    rx.await.map_err(|_| A2uiError::Channel("session actor dropped reply".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> Envelope {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn serializes_envelope_application() {
        let handle = SessionHandle::spawn(Session::new());
        handle
            .apply_envelope(parse(json!({
                "createSurface": {
                    "surfaceId": "s",
                    "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID
                }
            })))
            .await
            .unwrap();
        handle
            .apply_envelope(parse(json!({
                "updateDataModel": { "surfaceId": "s", "value": { "counter": 0 } }
            })))
            .await
            .unwrap();

        let surface = handle.surface("s").await.unwrap().unwrap();
        assert!(surface.is_ready());
        assert_eq!(surface.read("/counter"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn protocol_errors_reach_subscribers() {
        let handle = SessionHandle::spawn(Session::new());
        let mut errors = handle.subscribe_errors();

        let result = handle
            .apply_envelope(parse(json!({ "createSurface": { "surfaceId": "s" } })))
            .await;
        assert!(result.is_err());

        let err = errors.recv().await.unwrap();
        assert_eq!(err.kind, a2ui_core::ErrorKind::MissingCatalogId);
    }

    #[tokio::test]
    async fn reset_drops_surfaces() {
        let handle = SessionHandle::spawn(Session::new());
        handle
            .apply_envelope(parse(json!({
                "createSurface": {
                    "surfaceId": "s",
                    "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID
                }
            })))
            .await
            .unwrap();
        handle.reset().await.unwrap();
        assert!(handle.surface("s").await.unwrap().is_none());
    }
}
