//! # meshplane-server
//!
//! Discovery protocol engine and gRPC server for the meshplane control plane.
//!
//! This crate provides:
//!
//! - [`DiscoveryDispatcher`] - the per-stream protocol state machine
//!   (subscription, ACK/NACK, version/nonce bookkeeping)
//! - [`SessionRegistry`] / [`StreamSession`] - live-session tracking
//! - [`DiscoveryServer`] - server wiring the dispatcher to gRPC transports
//! - Health checking, metrics, and graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meshplane_server::DiscoveryServer;
//! use meshplane_store::SnapshotStore;
//!
//! let store = Arc::new(SnapshotStore::new());
//! let server = DiscoveryServer::builder()
//!     .store(Arc::clone(&store))
//!     .build()?;
//!
//! server.serve("[::]:18000".parse()?).await?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod dispatcher;
pub mod health;
pub mod metrics;
mod registry;
mod response;
mod session;
pub mod shutdown;
mod stream;

#[cfg(test)]
mod protocol_tests;

pub mod services;

pub use builder::DiscoveryServerBuilder;
pub use config::ServerConfig;
pub use dispatcher::DiscoveryDispatcher;
pub use metrics::DiscoveryMetrics;
pub use registry::{SessionHandle, SessionRegistry};
pub use response::{generate_nonce, ResponseBuilder};
pub use session::{AckedVersion, NackBackoff, PendingPush, StreamSession, Subscription, SyncState};
pub use shutdown::ShutdownController;
pub use stream::StreamId;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::info;

use meshplane_core::ResourceKind;
use meshplane_store::SnapshotStore;

use crate::health::HealthService;
use crate::services::{AdsService, RdsService};

/// The discovery server.
///
/// Owns the dispatcher, the session registry, and the store handle; serving
/// registers the aggregated and dedicated-route services and spawns one
/// store-watch task per resource kind to drive unsolicited pushes.
#[derive(Debug)]
pub struct DiscoveryServer {
    store: Arc<SnapshotStore>,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<DiscoveryDispatcher>,
    config: Arc<ServerConfig>,
    shutdown: ShutdownController,
}

impl DiscoveryServer {
    /// Create a builder for configuring the server.
    #[must_use]
    pub fn builder() -> DiscoveryServerBuilder {
        DiscoveryServerBuilder::new()
    }

    pub(crate) fn from_parts(
        store: Arc<SnapshotStore>,
        registry: Arc<SessionRegistry>,
        dispatcher: Arc<DiscoveryDispatcher>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            dispatcher,
            config: Arc::new(config),
            shutdown: ShutdownController::new(),
        }
    }

    /// The snapshot store this server serves from.
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

    /// The protocol dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<DiscoveryDispatcher> {
        &self.dispatcher
    }

    /// The server configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shutdown controller.
    #[inline]
    #[must_use]
    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Create the discovery services backed by this server's dispatcher.
    #[must_use]
    pub fn create_services(&self) -> (AdsService, RdsService) {
        (
            AdsService::new(Arc::clone(&self.dispatcher), Arc::clone(&self.config)),
            RdsService::new(Arc::clone(&self.dispatcher), Arc::clone(&self.config)),
        )
    }

    /// Spawn the store-watch tasks that fan publishes out to live sessions.
    ///
    /// One task per kind; each ends when the store is dropped. Called by the
    /// serve methods, exposed for embedders composing their own transport.
    pub fn spawn_broadcast_tasks(&self) {
        for kind in ResourceKind::ALL {
            let mut watch = self.store.subscribe(kind);
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                while let Some(snapshot) = watch.recv().await {
                    dispatcher.handle_publish(&snapshot);
                }
            });
        }
    }

    /// Assemble the tonic router with all services configured.
    fn build_router(&self) -> (tonic::transport::server::Router, Option<HealthService>) {
        let (ads, rds) = self.create_services();

        let mut builder = Server::builder();
        if let Some(interval) = self.config.keepalive_interval {
            builder = builder.http2_keepalive_interval(Some(interval));
        }
        if let Some(timeout) = self.config.keepalive_timeout {
            builder = builder.http2_keepalive_timeout(Some(timeout));
        }
        if let Some(max_streams) = self.config.max_concurrent_streams {
            builder = builder.concurrency_limit_per_connection(max_streams as usize);
        }

        let mut router = builder
            .add_service(ads.into_service())
            .add_service(rds.into_service());

        let health = if self.config.enable_health {
            let (health, health_svc) = HealthService::new();
            router = router.add_service(health_svc);
            Some(health)
        } else {
            None
        };

        (router, health)
    }

    /// Start the server and listen on the given address.
    ///
    /// Handles graceful shutdown on SIGTERM/SIGINT: marks health as not
    /// serving, waits out the grace period, then stops accepting.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), tonic::transport::Error> {
        info!(addr = %addr, "starting discovery server");

        self.spawn_broadcast_tasks();
        let (router, health) = self.build_router();
        if let Some(ref health) = health {
            health.set_all_serving().await;
        }
        let grace_period = self.config.grace_period;

        let serve_future = router.serve_with_shutdown(addr, async move {
            shutdown::wait_for_signal().await;

            if let Some(ref health) = health {
                health.set_all_not_serving().await;
            }

            info!(grace_period = ?grace_period, "draining connections");
            tokio::time::sleep(grace_period).await;
        });

        info!(addr = %addr, "discovery server listening");
        serve_future.await
    }

    /// Start the server with a programmatic shutdown signal.
    pub async fn serve_with_shutdown(
        self,
        addr: SocketAddr,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<(), tonic::transport::Error> {
        info!(addr = %addr, "starting discovery server with custom shutdown");

        self.spawn_broadcast_tasks();
        let (router, health) = self.build_router();
        if let Some(ref health) = health {
            health.set_all_serving().await;
        }
        let grace_period = self.config.grace_period;

        let serve_future = router.serve_with_shutdown(addr, async move {
            let _ = shutdown_rx.await;

            if let Some(ref health) = health {
                health.set_all_not_serving().await;
            }

            info!(grace_period = ?grace_period, "draining connections");
            tokio::time::sleep(grace_period).await;
        });

        info!(addr = %addr, "discovery server listening");
        serve_future.await
    }
}
