//! Simple discovery server example.
//!
//! Runs the two deployment modes side by side:
//! - an aggregated listener on `:18000` (endpoints + routes)
//! - a dedicated route listener on `:18001`
//!
//! Both serve from one shared store. A background task republishes the
//! endpoint set periodically so connected sidecars see unsolicited pushes.
//!
//! Run with:
//! ```bash
//! cargo run --example simple-server
//! ```

use std::sync::Arc;
use std::time::Duration;

use meshplane::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", meshplane::version::version_string());

    let store = Arc::new(SnapshotStore::new());
    publish_sample_data(&store);

    // Periodically flip between one and two endpoints to exercise pushes
    let publisher = Arc::clone(&store);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        let mut flip = false;

        loop {
            interval.tick().await;
            flip = !flip;

            let mut assignment =
                LoadAssignment::new("backend_cluster").with_endpoint("10.244.0.111", 10000);
            if flip {
                assignment = assignment.with_endpoint("10.244.0.114", 10000);
            }

            let snapshot = publisher.publish(ResourceKind::Endpoints, vec![Arc::new(assignment)]);
            info!(version = snapshot.version(), "republished endpoints");
        }
    });

    let aggregated = DiscoveryServer::builder()
        .store(Arc::clone(&store))
        .build()?;
    let routes_only = DiscoveryServer::builder()
        .store(Arc::clone(&store))
        .disable_health()
        .build()?;

    info!("aggregated discovery on :18000, dedicated routes on :18001");

    tokio::try_join!(
        aggregated.serve("[::]:18000".parse()?),
        routes_only.serve("[::]:18001".parse()?),
    )?;

    Ok(())
}

fn publish_sample_data(store: &SnapshotStore) {
    store.publish(
        ResourceKind::Endpoints,
        vec![Arc::new(
            LoadAssignment::new("backend_cluster")
                .with_endpoint("10.244.0.111", 10000)
                .with_endpoint("10.244.0.114", 10000),
        )],
    );

    store.publish(
        ResourceKind::Routes,
        vec![Arc::new(
            RouteSpec::new("local_route")
                .with_virtual_host("backend_service")
                .with_domains(["*"])
                .with_rule("/test", "backend_cluster"),
        )],
    );

    info!("published sample endpoints and routes");
}
