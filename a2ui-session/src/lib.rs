//! # a2ui-session
//!
//! Per-surface state and the session runtime for the A2UI protocol.
//!
//! ## Overview
//!
//! - [`Session`] / [`SessionHandle`] - envelope application with a
//!   single-writer actor
//! - [`Surface`] - component arena, data model, readiness flags
//! - [`binding`] - dynamic-value resolution and the per-version scoping rules
//! - [`CatalogRegistry`] - catalog negotiation against client capabilities
//! - [`events`] - outbound `userAction` / `action` / `error` construction
//! - [`render_tree`] - resolved render trees with placeholders for dangling
//!   references
//! - [`build_data_broadcast`] - snapshots for `broadcastDataModel` surfaces

pub mod actor;
pub mod binding;
pub mod broadcast;
pub mod capabilities;
pub mod catalog;
pub mod events;
pub mod render;
pub mod session;
pub mod surface;

pub use actor::SessionHandle;
pub use binding::{
    evaluate_checks, expand_path, expand_template, resolve_bound, resolve_dynamic, resolve_prop,
    ScopingMode, TemplateInstance,
};
pub use broadcast::{build_data_broadcast, DataBroadcast};
pub use capabilities::{
    ClientCapabilities, CLIENT_CAPABILITIES_METADATA_KEY, DATA_BROADCAST_METADATA_KEY,
};
pub use catalog::{Catalog, CatalogRegistry, ResolvedCatalog, STANDARD_COMPONENT_TYPES};
pub use events::{build_action, build_error, ActionRequest};
pub use render::{render_tree, RenderComponent, RenderNode};
pub use session::{ApplyOutcome, Session};
pub use surface::{ComponentRecord, Surface};
