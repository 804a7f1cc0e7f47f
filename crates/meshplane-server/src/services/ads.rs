//! Aggregated discovery service.
//!
//! Multiplexes every resource kind over a single bidirectional stream; the
//! dispatcher keeps per-kind progress independent, so endpoints and routes
//! advance without blocking each other.

use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::instrument;

use meshplane_types::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};

use crate::config::ServerConfig;
use crate::dispatcher::DiscoveryDispatcher;
use crate::registry::SessionHandle;
use crate::session::StreamSession;
use crate::stream::StreamId;

use super::streaming::{run_discovery_stream, StreamConfig};

const ADS_STREAM: StreamConfig = StreamConfig {
    service_name: "ADS",
    dedicated_kind: None,
};

/// Aggregated discovery service.
#[derive(Debug, Clone)]
pub struct AdsService {
    dispatcher: Arc<DiscoveryDispatcher>,
    config: Arc<ServerConfig>,
}

impl AdsService {
    /// Create a new aggregated service over a dispatcher.
    pub fn new(dispatcher: Arc<DiscoveryDispatcher>, config: Arc<ServerConfig>) -> Self {
        Self { dispatcher, config }
    }

    /// Get the dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<DiscoveryDispatcher> {
        &self.dispatcher
    }

    /// Convert into a service registrable with `Server::add_service`.
    #[must_use]
    pub fn into_service(self) -> AdsServiceServer {
        AdsServiceServer { inner: self }
    }
}

/// Trait matching the aggregated discovery RPC surface.
#[async_trait]
pub trait AggregatedDiscoveryService: Send + Sync + 'static {
    /// Server streaming response type for StreamAggregatedResources.
    type StreamAggregatedResourcesStream: Stream<Item = Result<DiscoveryResponse, Status>>
        + Send
        + 'static;

    /// Bidirectional streaming RPC carrying every resource kind.
    async fn stream_aggregated_resources(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamAggregatedResourcesStream>, Status>;
}

#[async_trait]
impl AggregatedDiscoveryService for AdsService {
    type StreamAggregatedResourcesStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    #[instrument(skip(self, request), name = "ads_stream")]
    async fn stream_aggregated_resources(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamAggregatedResourcesStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(self.config.response_buffer_size);

        let handle = SessionHandle::new(StreamSession::new(StreamId::new()), tx);
        self.dispatcher.registry().register(Arc::clone(&handle));

        tokio::spawn(run_discovery_stream(
            Arc::clone(&self.dispatcher),
            inbound,
            handle,
            ADS_STREAM,
            self.config.idle_timeout,
        ));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Server wrapper carrying the gRPC service identity for routing.
#[derive(Debug, Clone)]
pub struct AdsServiceServer {
    inner: AdsService,
}

impl AdsServiceServer {
    /// Get a reference to the inner service.
    #[must_use]
    pub fn inner(&self) -> &AdsService {
        &self.inner
    }
}

impl tonic::codegen::Service<http::Request<tonic::body::BoxBody>> for AdsServiceServer {
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<tonic::body::BoxBody>) -> Self::Future {
        // Method routing lives in the generated transport glue; the protocol
        // engine is reachable through the trait above.
        let _ = req;
        Box::pin(async move {
            Ok(http::Response::builder()
                .status(http::StatusCode::NOT_IMPLEMENTED)
                .body(tonic::body::empty_body())
                .unwrap())
        })
    }
}

impl tonic::server::NamedService for AdsServiceServer {
    const NAME: &'static str = "envoy.service.discovery.v3.AggregatedDiscoveryService";
}
