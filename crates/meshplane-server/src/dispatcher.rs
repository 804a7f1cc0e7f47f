//! The discovery protocol engine.
//!
//! [`DiscoveryDispatcher`] consumes inbound requests, updates the owning
//! stream's session, and decides whether and what to push. It also reacts to
//! store publishes by scanning live sessions. All decisions are per
//! (session, kind): progress on endpoints never blocks progress on routes,
//! and each stream has at most one unacknowledged push in flight per kind.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use meshplane_core::{PlaneError, ResourceKind, Result};
use meshplane_store::{ResourceSnapshot, SnapshotStore};
use meshplane_types::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use meshplane_types::google::rpc::Status as RpcStatus;

use crate::metrics::DiscoveryMetrics;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::response::ResponseBuilder;
use crate::session::StreamSession;

/// Default initial delay before a bare retry of a rejected, unchanged snapshot.
pub const DEFAULT_NACK_BACKOFF_INITIAL: Duration = Duration::from_millis(500);

/// Default cap on the NACK retry delay.
pub const DEFAULT_NACK_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// The protocol state machine shared by every discovery stream.
///
/// The dispatcher holds the store and registry by handle; it is `Send + Sync`
/// and cheap to share behind an `Arc`. It never holds the registry lock or a
/// session lock across an await point.
#[derive(Debug)]
pub struct DiscoveryDispatcher {
    store: Arc<SnapshotStore>,
    registry: Arc<SessionRegistry>,
    builder: ResponseBuilder,
    metrics: DiscoveryMetrics,
    nack_backoff_initial: Duration,
    nack_backoff_max: Duration,
}

impl DiscoveryDispatcher {
    /// Create a dispatcher over a store and session registry.
    pub fn new(store: Arc<SnapshotStore>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            registry,
            builder: ResponseBuilder::new(),
            metrics: DiscoveryMetrics::new(),
            nack_backoff_initial: DEFAULT_NACK_BACKOFF_INITIAL,
            nack_backoff_max: DEFAULT_NACK_BACKOFF_MAX,
        }
    }

    /// Override the NACK retry backoff window.
    #[must_use]
    pub fn with_nack_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.nack_backoff_initial = initial;
        self.nack_backoff_max = max;
        self
    }

    /// The snapshot store this dispatcher serves from.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// The registry of live sessions.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The server metrics.
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &DiscoveryMetrics {
        &self.metrics
    }

    /// Process one inbound request for a stream.
    ///
    /// Returns the response to send, if any. Errors are either stream-fatal
    /// (protocol violations, see [`PlaneError::is_stream_fatal`]) or abort
    /// only the attempted push (encoding failures).
    pub fn handle_request(
        &self,
        handle: &SessionHandle,
        request: &DiscoveryRequest,
    ) -> Result<Option<DiscoveryResponse>> {
        if request.type_url.is_empty() {
            return Err(PlaneError::violation("request without a type_url"));
        }

        let Some(kind) = ResourceKind::from_type_url(&request.type_url) else {
            warn!(
                stream = %handle.id(),
                type_url = %request.type_url,
                "ignoring request for unknown type URL"
            );
            self.metrics.record_unknown_type();
            return Ok(None);
        };
        self.metrics.record_request(kind);

        let mut session = handle.session().lock().expect("session lock poisoned");

        if let Some(detail) = &request.error_detail {
            return self.handle_nack(&mut session, kind, request, detail);
        }

        let acks_pending = !request.response_nonce.is_empty()
            && session
                .pending(kind)
                .is_some_and(|p| p.nonce == request.response_nonce);

        if acks_pending {
            return self.handle_ack(&mut session, kind, request);
        }

        // New subscription, or a resubscription carrying an empty/stale
        // nonce: record the wanted names and push unconditionally.
        session.subscribe(kind, &request.resource_names);
        debug!(
            stream = %session.id(),
            kind = %kind,
            names = ?request.resource_names,
            "subscription recorded"
        );

        let snapshot = self.store.get(kind);
        self.push(&mut session, kind, &snapshot).map(Some)
    }

    /// React to a store publish: push the new snapshot to every subscribed
    /// session that is not awaiting an acknowledgment.
    ///
    /// Sessions with an outstanding push are skipped; they catch up when
    /// their ACK or NACK resolves. The registry lock is released before any
    /// session is touched, and channel hand-off is non-blocking.
    pub fn handle_publish(&self, snapshot: &Arc<ResourceSnapshot>) {
        let kind = snapshot.kind();
        trace!(kind = %kind, version = snapshot.version(), "fanning out publish");

        for handle in self.registry.live() {
            let mut session = handle.session().lock().expect("session lock poisoned");

            if session.subscription(kind).is_none() {
                continue;
            }
            if session.pending(kind).is_some() {
                trace!(
                    stream = %session.id(),
                    kind = %kind,
                    "push outstanding; deferring update"
                );
                continue;
            }
            if session
                .acked_version(kind)
                .is_some_and(|v| v >= snapshot.version())
            {
                continue;
            }

            let response = match self.push(&mut session, kind, snapshot) {
                Ok(response) => response,
                Err(e) => {
                    // Encoding failure: this push is lost, the stream is not
                    error!(stream = %session.id(), kind = %kind, error = %e, "push failed");
                    continue;
                }
            };

            // Enqueue on the stream's channel; not a network send, so doing
            // it under the session lock keeps pending-state and hand-off
            // consistent.
            use tokio::sync::mpsc::error::TrySendError;
            match handle.sender().try_send(Ok(response)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        stream = %session.id(),
                        kind = %kind,
                        "response channel full; dropping push"
                    );
                    session.clear_pending(kind);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(stream = %session.id(), "stream closed during fan-out");
                    session.clear_pending(kind);
                }
            }
        }
    }

    fn handle_ack(
        &self,
        session: &mut StreamSession,
        kind: ResourceKind,
        request: &DiscoveryRequest,
    ) -> Result<Option<DiscoveryResponse>> {
        let version = parse_version(&request.version_info);
        debug!(
            stream = %session.id(),
            kind = %kind,
            version = version,
            nonce = %request.response_nonce,
            "ACK"
        );
        self.metrics.record_ack(kind);

        session.subscribe(kind, &request.resource_names);
        session.record_ack(kind, version, &request.response_nonce);

        // Deliver any update that arrived while the push was outstanding.
        let snapshot = self.store.get(kind);
        if snapshot.version() > version {
            return self.push(session, kind, &snapshot).map(Some);
        }
        Ok(None)
    }

    fn handle_nack(
        &self,
        session: &mut StreamSession,
        kind: ResourceKind,
        request: &DiscoveryRequest,
        detail: &RpcStatus,
    ) -> Result<Option<DiscoveryResponse>> {
        self.metrics.record_nack(kind);
        warn!(
            stream = %session.id(),
            node = session.node_id().unwrap_or("<unknown>"),
            kind = %kind,
            nonce = %request.response_nonce,
            code = detail.code,
            error = %detail.message,
            "client rejected snapshot (NACK)"
        );

        let pending_match = session
            .pending(kind)
            .filter(|p| p.nonce == request.response_nonce)
            .map(|p| p.version);

        if let Some(rejected) = pending_match {
            // Rejection of the outstanding push: resolve it without
            // advancing acked state, and arm the retry backoff.
            session.record_nack(kind, rejected, &request.response_nonce);

            let snapshot = self.store.get(kind);
            if snapshot.version() > rejected {
                return self.push(session, kind, &snapshot).map(Some);
            }
            debug!(
                stream = %session.id(),
                kind = %kind,
                "store unchanged since rejection; leaving stream idle"
            );
            return Ok(None);
        }

        let repeat = session
            .nack_backoff(kind)
            .filter(|b| b.rejected_nonce == request.response_nonce)
            .map(|b| {
                (
                    b.rejected_version,
                    b.retry_ready(
                        Instant::now(),
                        self.nack_backoff_initial,
                        self.nack_backoff_max,
                    ),
                )
            });

        if let Some((rejected, retry_ready)) = repeat {
            // The client is rejecting the same response again.
            let snapshot = self.store.get(kind);
            if snapshot.version() > rejected {
                return self.push(session, kind, &snapshot).map(Some);
            }
            if retry_ready {
                debug!(
                    stream = %session.id(),
                    kind = %kind,
                    "retrying unchanged snapshot after backoff"
                );
                return self.push(session, kind, &snapshot).map(Some);
            }
            return Ok(None);
        }

        debug!(
            stream = %session.id(),
            kind = %kind,
            nonce = %request.response_nonce,
            "NACK for an unknown nonce; ignoring"
        );
        Ok(None)
    }

    /// Build and record a push for a session.
    fn push(
        &self,
        session: &mut StreamSession,
        kind: ResourceKind,
        snapshot: &ResourceSnapshot,
    ) -> Result<DiscoveryResponse> {
        let subscription = session
            .subscription(kind)
            .cloned()
            .unwrap_or(crate::session::Subscription::All);

        let response = self.builder.build(snapshot, &subscription)?;
        session.record_push(kind, snapshot.version(), response.nonce.clone());
        self.metrics.record_response(kind);

        info!(
            stream = %session.id(),
            kind = %kind,
            version = %response.version_info,
            count = response.resources.len(),
            nonce = %response.nonce,
            "pushing snapshot"
        );
        Ok(response)
    }
}

fn parse_version(version_info: &str) -> u64 {
    // A malformed echo is treated as "older than everything" rather than
    // trusted.
    version_info.parse().unwrap_or(0)
}
