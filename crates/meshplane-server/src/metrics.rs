//! Metrics for the discovery server.
//!
//! Counters and gauges are emitted through the `metrics` facade, so any
//! recorder the embedding process installs (Prometheus exporter, logging
//! recorder) picks them up without the server knowing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics::{counter, gauge};

use meshplane_core::ResourceKind;

/// Metrics for the discovery server.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryMetrics {
    inner: Arc<DiscoveryMetricsInner>,
}

#[derive(Debug, Default)]
struct DiscoveryMetricsInner {
    active_streams: AtomicU64,
}

impl DiscoveryMetrics {
    /// Create a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound discovery request.
    pub fn record_request(&self, kind: ResourceKind) {
        counter!("meshplane_requests_total", "kind" => kind.to_string()).increment(1);
    }

    /// Record a pushed response.
    pub fn record_response(&self, kind: ResourceKind) {
        counter!("meshplane_responses_total", "kind" => kind.to_string()).increment(1);
    }

    /// Record a client acknowledgment.
    pub fn record_ack(&self, kind: ResourceKind) {
        counter!("meshplane_acks_total", "kind" => kind.to_string()).increment(1);
    }

    /// Record a client rejection.
    pub fn record_nack(&self, kind: ResourceKind) {
        counter!("meshplane_nacks_total", "kind" => kind.to_string()).increment(1);
    }

    /// Record a request for a type URL the plane does not serve.
    pub fn record_unknown_type(&self) {
        counter!("meshplane_unknown_type_total").increment(1);
    }

    /// Record a stream open.
    pub fn stream_opened(&self) {
        let active = self.inner.active_streams.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("meshplane_active_streams").set(active as f64);
    }

    /// Record a stream close.
    pub fn stream_closed(&self) {
        let previous = self.inner.active_streams.fetch_sub(1, Ordering::Relaxed);
        gauge!("meshplane_active_streams").set(previous.saturating_sub(1) as f64);
    }

    /// Current number of active streams.
    #[must_use]
    pub fn active_streams(&self) -> u64 {
        self.inner.active_streams.load(Ordering::Relaxed)
    }
}
