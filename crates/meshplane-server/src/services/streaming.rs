//! Shared stream-loop logic for the discovery services.
//!
//! Both the aggregated service and the dedicated route service run the same
//! loop: one task per stream, blocking on the next inbound request, routing
//! it through the dispatcher, and forwarding any push onto the stream's
//! response channel. The loop owns the session; teardown unregisters it.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Status, Streaming};
use tracing::{debug, error, info};

use meshplane_core::ResourceKind;
use meshplane_types::envoy::service::discovery::v3::DiscoveryRequest;

use crate::dispatcher::DiscoveryDispatcher;
use crate::registry::SessionHandle;

/// Configuration for one discovery stream loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamConfig {
    /// Service name for logging.
    pub service_name: &'static str,
    /// For dedicated per-type streams: the kind an empty `type_url` implies,
    /// and the only kind the stream accepts. `None` on aggregated streams.
    pub dedicated_kind: Option<ResourceKind>,
}

/// Serve one discovery stream until it ends.
///
/// Returns when the client closes, the transport fails, the idle timeout
/// fires, or a protocol violation closes the stream. The session is
/// unregistered on the way out; no partial state survives.
pub(crate) async fn run_discovery_stream(
    dispatcher: Arc<DiscoveryDispatcher>,
    mut inbound: Streaming<DiscoveryRequest>,
    handle: Arc<SessionHandle>,
    config: StreamConfig,
    idle_timeout: Option<Duration>,
) {
    let metrics = dispatcher.metrics().clone();
    metrics.stream_opened();
    info!(
        stream = %handle.id(),
        service = config.service_name,
        "{} stream started",
        config.service_name
    );

    let mut node_seen = false;

    loop {
        let next = match idle_timeout {
            Some(timeout) => {
                match tokio::time::timeout(
                    timeout,
                    tokio_stream::StreamExt::next(&mut inbound),
                )
                .await
                {
                    Ok(item) => item,
                    Err(_) => {
                        info!(
                            stream = %handle.id(),
                            timeout = ?timeout,
                            "closing idle stream"
                        );
                        break;
                    }
                }
            }
            None => tokio_stream::StreamExt::next(&mut inbound).await,
        };

        let Some(result) = next else {
            debug!(stream = %handle.id(), "client closed stream");
            break;
        };

        let mut request = match result {
            Ok(request) => request,
            Err(e) => {
                error!(stream = %handle.id(), error = %e, "stream error");
                break;
            }
        };

        // Dedicated streams imply their kind and reject any other.
        if let Some(kind) = config.dedicated_kind {
            if request.type_url.is_empty() {
                request.type_url = kind.type_url().to_string();
            } else if request.type_url != kind.type_url() {
                error!(
                    stream = %handle.id(),
                    expected = kind.type_url(),
                    got = %request.type_url,
                    "invalid type URL for {}",
                    config.service_name
                );
                continue;
            }
        }

        // The first request must announce the node identity.
        if !node_seen {
            match request.node.as_ref().filter(|n| !n.id.is_empty()) {
                Some(node) => {
                    handle
                        .session()
                        .lock()
                        .expect("session lock poisoned")
                        .set_node_id(&node.id);
                    node_seen = true;
                    debug!(stream = %handle.id(), node_id = %node.id, "node identified");
                }
                None => {
                    error!(
                        stream = %handle.id(),
                        service = config.service_name,
                        "first request missing required node identity"
                    );
                    let _ = handle
                        .sender()
                        .send(Err(Status::invalid_argument(
                            "first request must include node identity",
                        )))
                        .await;
                    break;
                }
            }
        }

        match dispatcher.handle_request(&handle, &request) {
            Ok(Some(response)) => {
                if handle.sender().send(Ok(response)).await.is_err() {
                    debug!(stream = %handle.id(), "client disconnected");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) if e.is_stream_fatal() => {
                error!(
                    stream = %handle.id(),
                    error = %e,
                    "{} request failed; closing stream",
                    config.service_name
                );
                let _ = handle.sender().send(Err(e.into())).await;
                break;
            }
            Err(e) => {
                // This push is lost; the stream stays open and the next
                // store publish retries.
                error!(stream = %handle.id(), error = %e, "push aborted");
            }
        }
    }

    dispatcher.registry().unregister(handle.id());
    metrics.stream_closed();
    info!(
        stream = %handle.id(),
        service = config.service_name,
        "{} stream ended",
        config.service_name
    );
}
