//! Dedicated route discovery service.
//!
//! Serves only the route-configuration kind over its own stream, for
//! deployments that point the data plane's route subscription at a separate
//! listener. Behavior is identical to routes served over the aggregated
//! stream; the loop and dispatcher are shared.

use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::instrument;

use meshplane_core::ResourceKind;
use meshplane_types::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};

use crate::config::ServerConfig;
use crate::dispatcher::DiscoveryDispatcher;
use crate::registry::SessionHandle;
use crate::session::StreamSession;
use crate::stream::StreamId;

use super::streaming::{run_discovery_stream, StreamConfig};

const RDS_STREAM: StreamConfig = StreamConfig {
    service_name: "RDS",
    dedicated_kind: Some(ResourceKind::Routes),
};

/// Dedicated route discovery service.
#[derive(Debug, Clone)]
pub struct RdsService {
    dispatcher: Arc<DiscoveryDispatcher>,
    config: Arc<ServerConfig>,
}

impl RdsService {
    /// Create a new route service over a dispatcher.
    pub fn new(dispatcher: Arc<DiscoveryDispatcher>, config: Arc<ServerConfig>) -> Self {
        Self { dispatcher, config }
    }

    /// The type URL this service serves.
    #[inline]
    #[must_use]
    pub fn type_url() -> &'static str {
        ResourceKind::Routes.type_url()
    }

    /// Convert into a service registrable with `Server::add_service`.
    #[must_use]
    pub fn into_service(self) -> RdsServiceServer {
        RdsServiceServer { inner: self }
    }
}

/// Trait matching the route discovery RPC surface.
#[async_trait]
pub trait RouteDiscoveryService: Send + Sync + 'static {
    /// Server streaming response type for StreamRoutes.
    type StreamRoutesStream: Stream<Item = Result<DiscoveryResponse, Status>> + Send + 'static;

    /// Bidirectional streaming RPC carrying route configurations.
    async fn stream_routes(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamRoutesStream>, Status>;
}

#[async_trait]
impl RouteDiscoveryService for RdsService {
    type StreamRoutesStream = ReceiverStream<Result<DiscoveryResponse, Status>>;

    #[instrument(skip(self, request), name = "rds_stream")]
    async fn stream_routes(
        &self,
        request: Request<Streaming<DiscoveryRequest>>,
    ) -> Result<Response<Self::StreamRoutesStream>, Status> {
        let inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(self.config.response_buffer_size);

        let handle = SessionHandle::new(StreamSession::new(StreamId::new()), tx);
        self.dispatcher.registry().register(Arc::clone(&handle));

        tokio::spawn(run_discovery_stream(
            Arc::clone(&self.dispatcher),
            inbound,
            handle,
            RDS_STREAM,
            self.config.idle_timeout,
        ));

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Server wrapper carrying the gRPC service identity for routing.
#[derive(Debug, Clone)]
pub struct RdsServiceServer {
    inner: RdsService,
}

impl RdsServiceServer {
    /// Get a reference to the inner service.
    #[must_use]
    pub fn inner(&self) -> &RdsService {
        &self.inner
    }
}

impl tonic::codegen::Service<http::Request<tonic::body::BoxBody>> for RdsServiceServer {
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
        let _ = req;
        Box::pin(async move {
            Ok(http::Response::builder()
                .status(http::StatusCode::NOT_IMPLEMENTED)
                .body(tonic::body::empty_body())
                .unwrap())
        })
    }
}

impl tonic::server::NamedService for RdsServiceServer {
    const NAME: &'static str = "envoy.service.route.v3.RouteDiscoveryService";
}
