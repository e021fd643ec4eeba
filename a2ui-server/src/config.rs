use std::time::Duration;

use a2ui_core::Limits;

/// Configuration for the A2UI stream server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Prefix every route is mounted under, e.g. `"/a2ui"`.
    pub route_prefix: String,
    /// Prefix for session topics in logs and metrics.
    pub topic_prefix: String,
    /// `retry:` hint sent at the start of every SSE stream.
    pub retry_ms: u64,
    /// Events retained per session for Last-Event-ID replay.
    pub ring_capacity: usize,
    /// Interval of SSE comment heartbeats.
    pub heartbeat: Duration,
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            route_prefix: String::new(),
            topic_prefix: "a2ui:session:".to_string(),
            retry_ms: 3000,
            ring_capacity: 100,
            heartbeat: Duration::from_secs(30),
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route_prefix(mut self, route_prefix: impl Into<String>) -> Self {
        self.route_prefix = route_prefix.into();
        self
    }

    pub fn with_topic_prefix(mut self, topic_prefix: impl Into<String>) -> Self {
        self.topic_prefix = topic_prefix.into();
        self
    }

    pub fn with_retry_ms(mut self, retry_ms: u64) -> Self {
        self.retry_ms = retry_ms;
        self
    }

    pub fn with_ring_capacity(mut self, ring_capacity: usize) -> Self {
        self.ring_capacity = ring_capacity;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
