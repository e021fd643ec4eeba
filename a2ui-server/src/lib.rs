//! # a2ui-server
//!
//! Server-side transports for the A2UI protocol runtime.
//!
//! ## Overview
//!
//! - [`create_app`] - HTTP+SSE stream endpoints (`/sessions`, `/message`,
//!   `/events`, `/done`, `/stream`)
//! - [`SessionRegistry`] - PubSub fan-out with a bounded replay ring and
//!   `Last-Event-ID` resume
//! - [`a2a`] - agent card and task endpoints wrapping envelopes in A2A
//!   messages
//! - [`ServerConfig`] - retry hint, heartbeat, ring size, limits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a2ui_server::{create_app, channel_event_sink, ServerConfig, StreamController};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (sink, _events) = channel_event_sink(64);
//! let controller = StreamController::new(ServerConfig::default(), Arc::new(sink));
//! let registry = controller.registry();
//! let app = create_app(controller);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! // publish envelopes through `registry`, then:
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod a2a;
pub mod config;
pub mod registry;
pub mod routes;

pub use a2a::{build_agent_card, create_a2a_router, A2aController, Task, TaskHandler, TaskStore};
pub use config::ServerConfig;
pub use registry::{RegistryError, SessionRegistry, StoredEvent, StreamMessage};
pub use routes::{
    channel_event_sink, create_app, ChannelEventSink, EventSink, InboundEvent, StreamController,
};
