//! Health service for the gRPC health checking protocol.
//!
//! Thin wrapper over `tonic-health` so the server can flip serving status
//! during startup and drain.

use std::sync::Arc;

use tokio::sync::Mutex;
use tonic_health::server::HealthReporter;
use tonic_health::ServingStatus;

/// Health service wrapper for the discovery server.
#[derive(Clone)]
pub struct HealthService {
    reporter: Arc<Mutex<HealthReporter>>,
}

impl std::fmt::Debug for HealthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthService").finish()
    }
}

impl HealthService {
    /// Create a health service and the tonic server to register.
    pub fn new() -> (
        Self,
        tonic_health::pb::health_server::HealthServer<
            impl tonic_health::pb::health_server::Health,
        >,
    ) {
        let (reporter, service) = tonic_health::server::health_reporter();
        (
            Self {
                reporter: Arc::new(Mutex::new(reporter)),
            },
            service,
        )
    }

    /// Mark every service as serving.
    pub async fn set_all_serving(&self) {
        let mut reporter = self.reporter.lock().await;
        reporter
            .set_service_status("", ServingStatus::Serving)
            .await;
    }

    /// Mark every service as not serving (load-balancer drain).
    pub async fn set_all_not_serving(&self) {
        let mut reporter = self.reporter.lock().await;
        reporter
            .set_service_status("", ServingStatus::NotServing)
            .await;
    }
}
