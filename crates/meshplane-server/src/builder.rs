//! Server builder.

use std::sync::Arc;
use std::time::Duration;

use meshplane_core::{PlaneError, Result};
use meshplane_store::SnapshotStore;

use crate::config::ServerConfig;
use crate::dispatcher::DiscoveryDispatcher;
use crate::registry::SessionRegistry;
use crate::DiscoveryServer;

/// Builder for a [`DiscoveryServer`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use meshplane_server::DiscoveryServerBuilder;
/// use meshplane_store::SnapshotStore;
///
/// let store = Arc::new(SnapshotStore::new());
/// let server = DiscoveryServerBuilder::new()
///     .store(store)
///     .max_concurrent_streams(200)
///     .build()
///     .unwrap();
/// assert_eq!(server.config().max_concurrent_streams, Some(200));
/// ```
#[derive(Debug, Default)]
pub struct DiscoveryServerBuilder {
    store: Option<Arc<SnapshotStore>>,
    config: ServerConfig,
}

impl DiscoveryServerBuilder {
    /// Create a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot store to serve from. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the per-stream response buffer size.
    #[must_use]
    pub fn response_buffer_size(mut self, size: usize) -> Self {
        self.config.response_buffer_size = size;
        self
    }

    /// Set maximum concurrent streams per connection.
    #[must_use]
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.config.max_concurrent_streams = Some(max);
        self
    }

    /// Set the HTTP/2 keepalive interval.
    #[must_use]
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = Some(interval);
        self
    }

    /// Set the HTTP/2 keepalive timeout.
    #[must_use]
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keepalive_timeout = Some(timeout);
        self
    }

    /// Set the NACK retry backoff window.
    #[must_use]
    pub fn nack_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.nack_backoff_initial = initial;
        self.config.nack_backoff_max = max;
        self
    }

    /// Tear down streams that stay idle longer than this.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Disable the gRPC health checking service.
    #[must_use]
    pub fn disable_health(mut self) -> Self {
        self.config.enable_health = false;
        self
    }

    /// Set the connection-drain window used during shutdown.
    #[must_use]
    pub fn grace_period(mut self, period: Duration) -> Self {
        self.config.grace_period = period;
        self
    }

    /// Build the server.
    ///
    /// # Errors
    ///
    /// Returns an error if no store was provided or the configuration is
    /// inconsistent.
    pub fn build(self) -> Result<DiscoveryServer> {
        let store = self
            .store
            .ok_or_else(|| PlaneError::Configuration("store is required".into()))?;

        if self.config.response_buffer_size == 0 {
            return Err(PlaneError::Configuration(
                "response buffer size must be at least 1".into(),
            ));
        }
        if self.config.nack_backoff_initial > self.config.nack_backoff_max {
            return Err(PlaneError::Configuration(
                "nack backoff initial delay exceeds the cap".into(),
            ));
        }

        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Arc::new(
            DiscoveryDispatcher::new(Arc::clone(&store), Arc::clone(&registry)).with_nack_backoff(
                self.config.nack_backoff_initial,
                self.config.nack_backoff_max,
            ),
        );

        Ok(DiscoveryServer::from_parts(
            store,
            registry,
            dispatcher,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_store() {
        let result = DiscoveryServerBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_zero_buffer() {
        let store = Arc::new(SnapshotStore::new());
        let result = DiscoveryServerBuilder::new()
            .store(store)
            .response_buffer_size(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_inverted_backoff() {
        let store = Arc::new(SnapshotStore::new());
        let result = DiscoveryServerBuilder::new()
            .store(store)
            .nack_backoff(Duration::from_secs(60), Duration::from_secs(1))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_success() {
        let store = Arc::new(SnapshotStore::new());
        let server = DiscoveryServerBuilder::new()
            .store(store)
            .max_concurrent_streams(200)
            .idle_timeout(Duration::from_secs(300))
            .build()
            .unwrap();

        assert_eq!(server.config().max_concurrent_streams, Some(200));
        assert_eq!(server.config().idle_timeout, Some(Duration::from_secs(300)));
        assert!(server.config().enable_health);
    }
}
