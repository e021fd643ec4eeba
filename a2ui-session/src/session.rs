//! A session: the surfaces a transport feeds plus the negotiated client
//! capabilities. All mutation goes through [`Session::apply_envelope`].

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{debug, info};

use a2ui_core::envelope::Envelope;
use a2ui_core::{ErrorKind, Limits, ProtocolError, ProtocolVersion};

use crate::capabilities::ClientCapabilities;
use crate::catalog::CatalogRegistry;
use crate::events::{self, ActionRequest};
use crate::surface::Surface;

/// What applying an envelope did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A surface was created or mutated.
    Applied,
    /// The target surface was removed (or already absent).
    Deleted,
    /// Client-originated envelope kinds pass through sessions untouched.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Session {
    surfaces: HashMap<String, Surface>,
    capabilities: ClientCapabilities,
    catalogs: CatalogRegistry,
    limits: Limits,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            capabilities: ClientCapabilities::default(),
            catalogs: CatalogRegistry::new(),
            limits: Limits::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_catalogs(mut self, catalogs: CatalogRegistry) -> Self {
        self.catalogs = catalogs;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn capabilities(&self) -> &ClientCapabilities {
        &self.capabilities
    }

    pub fn surface(&self, surface_id: &str) -> Option<&Surface> {
        self.surfaces.get(surface_id)
    }

    pub fn surface_ids(&self) -> Vec<String> {
        self.surfaces.keys().cloned().collect()
    }

    /// Apply one envelope. On error the prior state is preserved.
    pub fn apply_envelope(&mut self, envelope: &Envelope) -> Result<ApplyOutcome, ProtocolError> {
        match envelope {
            Envelope::CreateSurface(payload) => {
                let catalog = self
                    .catalogs
                    .resolve(
                        ProtocolVersion::V0_9,
                        payload.catalog_id.as_deref(),
                        &self.capabilities,
                    )
                    .map_err(|err| err.with_surface(payload.surface_id.clone()))?;
                let surface =
                    self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_9)?;
                surface.set_broadcast_data_model(payload.broadcast_data_model.unwrap_or(false));
                // v0.9 rendering always starts at the implicit "root" id.
                surface.mark_ready("root", Some(catalog));
                Ok(ApplyOutcome::Applied)
            }
            Envelope::BeginRendering(payload) => {
                let catalog = self
                    .catalogs
                    .resolve(
                        ProtocolVersion::V0_8,
                        payload.catalog_id.as_deref(),
                        &self.capabilities,
                    )
                    .map_err(|err| err.with_surface(payload.surface_id.clone()))?;
                let surface =
                    self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_8)?;
                surface.mark_ready(payload.root.clone(), Some(catalog));
                Ok(ApplyOutcome::Applied)
            }
            Envelope::SurfaceUpdate(payload) => {
                let surface = self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_8)?;
                surface.upsert_wrappers(&payload.components)?;
                Ok(ApplyOutcome::Applied)
            }
            Envelope::UpdateComponents(payload) => {
                let surface = self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_9)?;
                surface.upsert_entries(&payload.components)?;
                Ok(ApplyOutcome::Applied)
            }
            Envelope::DataModelUpdate(payload) => {
                let surface = self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_8)?;
                surface.apply_data_entries(payload.path.as_deref(), &payload.contents)?;
                Ok(ApplyOutcome::Applied)
            }
            Envelope::UpdateDataModel(payload) => {
                let surface = self.ensure_surface(&payload.surface_id, ProtocolVersion::V0_9)?;
                surface.apply_data_value(payload.path.as_deref(), payload.value.clone())?;
                Ok(ApplyOutcome::Applied)
            }
            Envelope::DeleteSurface(payload) => {
                if self.surfaces.remove(&payload.surface_id).is_some() {
                    info!(surface = %payload.surface_id, "surface deleted");
                }
                Ok(ApplyOutcome::Deleted)
            }
            Envelope::UserAction(_) | Envelope::Action(_) | Envelope::Error(_) => {
                debug!(key = envelope.key(), "ignoring client-originated envelope");
                Ok(ApplyOutcome::Ignored)
            }
        }
    }

    /// Two-way-binding write from the UI; nothing is sent to the server.
    pub fn update_data_at_path(
        &mut self,
        surface_id: &str,
        path: &str,
        value: Value,
    ) -> Result<(), ProtocolError> {
        let surface = self.surfaces.get_mut(surface_id).ok_or_else(|| {
            unknown_surface(surface_id)
        })?;
        surface.write_local(path, value)
    }

    /// Build an outbound action envelope for a component of `surface_id`.
    pub fn build_action(
        &self,
        surface_id: &str,
        request: &ActionRequest,
    ) -> Result<Envelope, ProtocolError> {
        let surface = self.surfaces.get(surface_id).ok_or_else(|| unknown_surface(surface_id))?;
        events::build_action(surface, request)
    }

    /// Drop every surface; negotiated capabilities are retained.
    pub fn reset(&mut self) {
        let count = self.surfaces.len();
        self.surfaces.clear();
        info!(surfaces = count, "session reset");
    }

    fn ensure_surface(
        &mut self,
        surface_id: &str,
        version: ProtocolVersion,
    ) -> Result<&mut Surface, ProtocolError> {
        if surface_id.is_empty() {
            return Err(ProtocolError::new(
                ErrorKind::ValidationError,
                "surface id must be non-empty",
            ));
        }
        match self.surfaces.entry(surface_id.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                if existing.version() != version {
                    return Err(ProtocolError::new(
                        ErrorKind::VersionMismatch,
                        format!(
                            "surface {surface_id:?} is pinned to {}, envelope is {}",
                            existing.version(),
                            version
                        ),
                    )
                    .with_surface(surface_id.to_string())
                    .with_details(json!({
                        "surfaceVersion": existing.version().as_str(),
                        "envelopeVersion": version.as_str()
                    })));
                }
                Ok(existing)
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                debug!(surface = surface_id, version = %version, "surface created");
                Ok(entry.insert(Surface::new(surface_id, version, self.limits)))
            }
        }
    }
}

fn unknown_surface(surface_id: &str) -> ProtocolError {
    ProtocolError::new(ErrorKind::ValidationError, format!("unknown surface {surface_id:?}"))
        .with_surface(surface_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> Envelope {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn pins_version_and_rejects_cross_version_envelopes() {
        let mut session = Session::new();
        session
            .apply_envelope(&parse(json!({
                "createSurface": {
                    "surfaceId": "s",
                    "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID
                }
            })))
            .unwrap();

        let err = session
            .apply_envelope(&parse(json!({
                "surfaceUpdate": { "surfaceId": "s", "components": [] }
            })))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::VersionMismatch);
        assert_eq!(err.details.as_ref().unwrap()["surfaceVersion"], "v0.9");
    }

    #[test]
    fn delete_surface_is_idempotent_and_version_neutral() {
        let mut session = Session::new();
        let delete = parse(json!({ "deleteSurface": { "surfaceId": "ghost" } }));
        assert_eq!(session.apply_envelope(&delete).unwrap(), ApplyOutcome::Deleted);
        assert_eq!(session.apply_envelope(&delete).unwrap(), ApplyOutcome::Deleted);
    }

    #[test]
    fn create_surface_without_catalog_fails_and_creates_nothing() {
        let mut session = Session::new();
        let err = session
            .apply_envelope(&parse(json!({ "createSurface": { "surfaceId": "s" } })))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCatalogId);
        assert!(session.surface("s").is_none());
    }

    #[test]
    fn begin_rendering_defaults_catalog_and_marks_ready() {
        let mut session = Session::new();
        session
            .apply_envelope(&parse(json!({
                "surfaceUpdate": {
                    "surfaceId": "s",
                    "components": [ { "id": "root", "component": { "Text": {} } } ]
                }
            })))
            .unwrap();
        assert!(!session.surface("s").unwrap().is_ready());

        session
            .apply_envelope(&parse(json!({
                "beginRendering": { "surfaceId": "s", "root": "root" }
            })))
            .unwrap();
        let surface = session.surface("s").unwrap();
        assert!(surface.is_ready());
        assert_eq!(surface.root_id(), Some("root"));
        assert_eq!(
            surface.catalog().unwrap().catalog_id,
            a2ui_core::V0_8_STANDARD_CATALOG_ID
        );
    }

    #[test]
    fn failed_update_preserves_prior_state() {
        let mut session = Session::new();
        session
            .apply_envelope(&parse(json!({
                "updateComponents": {
                    "surfaceId": "s",
                    "components": [ { "id": "a", "component": "Text", "text": "keep" } ]
                }
            })))
            .unwrap();

        let err = session
            .apply_envelope(&parse(json!({
                "updateComponents": {
                    "surfaceId": "s",
                    "components": [ { "id": "b", "component": "NoSuchWidget" } ]
                }
            })))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownComponent);

        let surface = session.surface("s").unwrap();
        assert_eq!(surface.component_count(), 1);
        assert!(surface.component("a").is_some());
    }

    #[test]
    fn update_data_at_path_writes_locally() {
        let mut session = Session::new();
        session
            .apply_envelope(&parse(json!({
                "updateDataModel": { "surfaceId": "s", "value": { "form": { "email": "" } } }
            })))
            .unwrap();
        session.update_data_at_path("s", "/form/email", json!("a@b.com")).unwrap();
        assert_eq!(
            session.surface("s").unwrap().read("/form/email"),
            Some(&json!("a@b.com"))
        );

        let err = session.update_data_at_path("ghost", "/x", json!(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn reset_clears_surfaces_keeps_capabilities() {
        let caps = ClientCapabilities::new(vec![a2ui_core::V0_9_STANDARD_CATALOG_ID.to_string()]);
        let mut session = Session::new().with_capabilities(caps.clone());
        session
            .apply_envelope(&parse(json!({
                "createSurface": {
                    "surfaceId": "s",
                    "catalogId": a2ui_core::V0_9_STANDARD_CATALOG_ID
                }
            })))
            .unwrap();
        session.reset();
        assert!(session.surface_ids().is_empty());
        assert_eq!(session.capabilities(), &caps);
    }
}
