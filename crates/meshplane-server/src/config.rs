//! Server configuration.

use std::time::Duration;

use crate::dispatcher::{DEFAULT_NACK_BACKOFF_INITIAL, DEFAULT_NACK_BACKOFF_MAX};

/// Configuration for the discovery server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Per-stream response channel buffer size.
    pub response_buffer_size: usize,
    /// Maximum concurrent streams per connection.
    pub max_concurrent_streams: Option<u32>,
    /// HTTP/2 keepalive interval.
    pub keepalive_interval: Option<Duration>,
    /// HTTP/2 keepalive timeout.
    pub keepalive_timeout: Option<Duration>,
    /// Initial delay before a bare retry of a rejected, unchanged snapshot.
    pub nack_backoff_initial: Duration,
    /// Cap on the NACK retry delay.
    pub nack_backoff_max: Duration,
    /// Tear down streams idle longer than this. Off by default.
    pub idle_timeout: Option<Duration>,
    /// Serve the gRPC health checking protocol.
    pub enable_health: bool,
    /// Connection-drain window during shutdown.
    pub grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            response_buffer_size: 16,
            max_concurrent_streams: Some(100),
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_timeout: Some(Duration::from_secs(10)),
            nack_backoff_initial: DEFAULT_NACK_BACKOFF_INITIAL,
            nack_backoff_max: DEFAULT_NACK_BACKOFF_MAX,
            idle_timeout: None,
            enable_health: true,
            grace_period: Duration::from_secs(10),
        }
    }
}
