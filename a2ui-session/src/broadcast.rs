//! Data-model broadcast payloads.
//!
//! Surfaces flagged `broadcastDataModel` ship a snapshot of their data model
//! with every outbound event, keyed by surface id.

use serde_json::{Map, Value};

use crate::session::Session;

/// `{<surface_id>: <data_model_snapshot>}` attached to outbound events.
pub type DataBroadcast = Map<String, Value>;

/// Snapshot every broadcast-flagged surface of `session`. `None` when no
/// surface opted in.
pub fn build_data_broadcast(session: &Session) -> Option<DataBroadcast> {
    let mut broadcast = Map::new();
    for surface_id in session.surface_ids() {
        if let Some(surface) = session.surface(&surface_id) {
            if surface.broadcast_data_model() {
                broadcast.insert(surface_id, surface.data_model().clone());
            }
        }
    }
    if broadcast.is_empty() { None } else { Some(broadcast) }
}
