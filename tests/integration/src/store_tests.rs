//! Store behavior through the public API.

use std::sync::Arc;

use meshplane::prelude::*;

#[test]
fn store_defaults_and_versioning() {
    let store = SnapshotStore::new();

    // Reads never fail
    let initial = store.get(ResourceKind::Routes);
    assert_eq!(initial.version(), 0);
    assert!(initial.is_empty());

    // Versions advance by one per publish, per kind
    for expected in 1..=5 {
        let snapshot = store.publish(
            ResourceKind::Routes,
            vec![Arc::new(RouteSpec::new("local_route"))],
        );
        assert_eq!(snapshot.version(), expected);
    }
    assert_eq!(store.version(ResourceKind::Endpoints), 0);
}

#[test]
fn snapshots_are_immutable_bundles() {
    let store = SnapshotStore::new();

    let before = store.publish(
        ResourceKind::Endpoints,
        vec![Arc::new(LoadAssignment::new("cluster-a"))],
    );
    let after = store.publish(
        ResourceKind::Endpoints,
        vec![Arc::new(LoadAssignment::new("cluster-b"))],
    );

    // The older bundle still reads as it was published
    assert!(before.contains("cluster-a"));
    assert!(!before.contains("cluster-b"));
    assert!(after.contains("cluster-b"));
    assert_eq!(store.get(ResourceKind::Endpoints).version(), after.version());
}

#[tokio::test]
async fn watches_follow_publishes() {
    let store = SnapshotStore::new();
    let mut watch = store.subscribe(ResourceKind::Endpoints);

    store.publish(
        ResourceKind::Endpoints,
        vec![Arc::new(
            LoadAssignment::new("backend_cluster").with_endpoint("10.0.0.1", 10000),
        )],
    );

    let snapshot = watch.recv().await.unwrap();
    assert_eq!(snapshot.version(), 1);
    assert_eq!(snapshot.kind(), ResourceKind::Endpoints);

    let assignment = snapshot.get("backend_cluster").unwrap();
    assert_eq!(assignment.name(), "backend_cluster");
}

#[test]
fn stats_track_reads_and_publishes() {
    let store = SnapshotStore::new();

    store.get(ResourceKind::Endpoints);
    store.publish(ResourceKind::Endpoints, vec![]);
    store.get(ResourceKind::Endpoints);

    assert_eq!(store.stats().publishes(), 1);
    assert_eq!(store.stats().reads(), 2);
    assert_eq!(store.stats().default_reads(), 1);
}
