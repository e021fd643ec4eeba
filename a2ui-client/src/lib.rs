//! # a2ui-client
//!
//! Client-side transports for the A2UI protocol runtime.
//!
//! ## Overview
//!
//! - [`SseParser`] - incremental server-sent-event parsing across chunk
//!   boundaries
//! - [`HttpStreamClient`] - session create, resumable `/stream` consumption
//!   with `Last-Event-ID`, `/events` posting
//! - [`A2aUiClient`] - agent discovery, task streams, action messages with
//!   client-capabilities metadata
//!
//! Streams implement the `a2ui-transport` contracts, so a host can swap the
//! local, HTTP and A2A conduits freely.

pub mod a2a;
pub mod http;
pub mod sse;

pub use a2a::{A2aClientConfig, A2aUiClient};
pub use http::{HttpClientConfig, HttpEvents, HttpStreamClient, HttpUiStream};
pub use sse::{SseEvent, SseParser};
