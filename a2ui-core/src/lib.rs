//! # a2ui-core
//!
//! Core types for the A2UI protocol runtime.
//!
//! ## Overview
//!
//! This crate provides the wire-level foundations shared by every other
//! runtime crate:
//!
//! - [`Envelope`] - typed envelopes for protocol v0.8 and v0.9
//! - [`EnvelopeParser`] - strict single-key envelope classification
//! - [`DynamicValue`] / [`BoundValue`] - property binding grammar
//! - [`pointer`] - RFC 6901 JSON Pointer reads, writes and merges
//! - [`ProtocolError`] / [`ErrorKind`] - the wire error taxonomy
//! - [`Limits`] - structural resource limits
//!
//! The binding *evaluator*, surface state and transports live in the
//! `a2ui-session`, `a2ui-transport`, `a2ui-server` and `a2ui-client` crates.

pub mod envelope;
pub mod error;
pub mod limits;
pub mod parser;
pub mod pointer;
pub mod schema;
pub mod value;
pub mod version;

pub use envelope::{
    encode_jsonl, BeginRendering, ComponentEntry, ComponentWrapper, CreateSurface, DataEntry,
    DataModelUpdate, DeleteSurface, Envelope, SurfaceUpdate, UpdateComponents, UpdateDataModel,
    UserAction,
};
pub use error::{A2uiError, ErrorKind, ProtocolError, Result};
pub use limits::Limits;
pub use parser::EnvelopeParser;
pub use schema::EnvelopeValidator;
pub use value::{BoundValue, Check, Children, DynamicValue, FunctionCall, LogicExpr, PathRef};
pub use version::{
    normalize_standard_catalog_id, ProtocolVersion, A2UI_MIME_TYPE, V0_8_EXTENSION_URI,
    V0_8_STANDARD_CATALOG_ALIASES, V0_8_STANDARD_CATALOG_ID, V0_9_EXTENSION_URI,
    V0_9_STANDARD_CATALOG_ID,
};
