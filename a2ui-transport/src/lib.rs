//! # a2ui-transport
//!
//! The two transport contracts of the A2UI runtime and the in-process
//! transport binding them locally:
//!
//! - [`UiStream`] - server→client delivery of parsed envelopes
//! - [`Events`] - client→server posting of action/error envelopes, with an
//!   optional data-model broadcast attached
//!
//! HTTP+SSE and A2A implementations live in `a2ui-server` and `a2ui-client`.

pub mod a2a;
pub mod drive;
pub mod local;

pub use drive::drive_ui_stream;

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use a2ui_core::envelope::Envelope;
use a2ui_core::{ProtocolError, Result};
use a2ui_session::DataBroadcast;

/// One item delivered on a server→client stream. After `Done` the stream
/// yields nothing further.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Envelope(Envelope),
    Done,
}

pub type EnvelopeStream = Pin<Box<dyn Stream<Item = Result<StreamItem>> + Send>>;

/// Server→client conduit delivering parsed envelopes in order.
#[async_trait]
pub trait UiStream: Send + Sync {
    /// Open the stream. Envelopes arrive in the order the transport received
    /// them; the final item is a single [`StreamItem::Done`].
    async fn open(&self) -> Result<EnvelopeStream>;

    /// Close the stream; the consumer observes `Done` and nothing further.
    async fn close(&self);
}

/// Client→server conduit for action and error envelopes.
#[async_trait]
pub trait Events: Send + Sync {
    async fn post_action(
        &self,
        envelope: Envelope,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()>;

    async fn post_error(
        &self,
        error: ProtocolError,
        broadcast: Option<DataBroadcast>,
    ) -> Result<()>;
}
