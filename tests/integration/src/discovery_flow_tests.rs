//! Full discovery conversations through the public API.

use std::sync::Arc;

use tokio::sync::mpsc;
use tonic::Status;

use meshplane::prelude::*;
use meshplane::server::SessionHandle;
use meshplane::types::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use meshplane::types::google::rpc::Status as RpcStatus;

type ResponseRx = mpsc::Receiver<Result<DiscoveryResponse, Status>>;

struct TestPlane {
    dispatcher: DiscoveryDispatcher,
}

impl TestPlane {
    fn new() -> Self {
        Self {
            dispatcher: DiscoveryDispatcher::new(
                Arc::new(SnapshotStore::new()),
                Arc::new(SessionRegistry::new()),
            ),
        }
    }

    fn store(&self) -> &SnapshotStore {
        self.dispatcher.store()
    }

    fn connect(&self) -> (Arc<SessionHandle>, ResponseRx) {
        let (tx, rx) = mpsc::channel(8);
        let handle = SessionHandle::new(StreamSession::new(StreamId::new()), tx);
        self.dispatcher.registry().register(Arc::clone(&handle));
        (handle, rx)
    }

    fn request(
        &self,
        handle: &SessionHandle,
        request: &DiscoveryRequest,
    ) -> Option<DiscoveryResponse> {
        self.dispatcher.handle_request(handle, request).unwrap()
    }

    fn publish_endpoints(&self, addrs: &[&str]) {
        let assignment = addrs.iter().fold(
            LoadAssignment::new("backend_cluster"),
            |assignment, addr| assignment.with_endpoint(*addr, 10000),
        );
        let snapshot = self
            .store()
            .publish(ResourceKind::Endpoints, vec![Arc::new(assignment)]);
        self.dispatcher.handle_publish(&snapshot);
    }
}

fn subscribe(kind: ResourceKind) -> DiscoveryRequest {
    DiscoveryRequest {
        type_url: kind.type_url().to_string(),
        ..Default::default()
    }
}

fn ack(kind: ResourceKind, response: &DiscoveryResponse) -> DiscoveryRequest {
    DiscoveryRequest {
        type_url: kind.type_url().to_string(),
        version_info: response.version_info.clone(),
        response_nonce: response.nonce.clone(),
        ..Default::default()
    }
}

#[test]
fn full_conversation_subscribe_ack_update_ack() {
    let plane = TestPlane::new();
    plane.publish_endpoints(&["10.0.0.1"]);

    let (client, mut rx) = plane.connect();

    // Subscribe and settle at v1
    let v1 = plane
        .request(&client, &subscribe(ResourceKind::Endpoints))
        .unwrap();
    assert_eq!(v1.version_info, "1");
    assert!(plane.request(&client, &ack(ResourceKind::Endpoints, &v1)).is_none());

    // A publish reaches the settled client unsolicited
    plane.publish_endpoints(&["10.0.0.1", "10.0.0.2"]);
    let v2 = rx.try_recv().unwrap().unwrap();
    assert_eq!(v2.version_info, "2");

    // Settling again leaves the stream idle
    assert!(plane.request(&client, &ack(ResourceKind::Endpoints, &v2)).is_none());
    assert!(rx.try_recv().is_err());
}

#[test]
fn broadcast_reaches_every_settled_client() {
    let plane = TestPlane::new();
    plane.publish_endpoints(&["10.0.0.1"]);

    let mut clients = Vec::new();
    for _ in 0..5 {
        let (client, rx) = plane.connect();
        let pushed = plane
            .request(&client, &subscribe(ResourceKind::Endpoints))
            .unwrap();
        plane.request(&client, &ack(ResourceKind::Endpoints, &pushed));
        clients.push((client, rx));
    }

    plane.publish_endpoints(&["10.0.0.1", "10.0.0.2"]);

    for (_, rx) in &mut clients {
        let update = rx.try_recv().expect("every settled client is pushed").unwrap();
        assert_eq!(update.version_info, "2");
    }
}

#[test]
fn unacknowledged_client_is_not_interrupted() {
    let plane = TestPlane::new();
    plane.publish_endpoints(&["10.0.0.1"]);

    let (settled, mut settled_rx) = plane.connect();
    let pushed = plane
        .request(&settled, &subscribe(ResourceKind::Endpoints))
        .unwrap();
    plane.request(&settled, &ack(ResourceKind::Endpoints, &pushed));

    let (laggard, mut laggard_rx) = plane.connect();
    plane
        .request(&laggard, &subscribe(ResourceKind::Endpoints))
        .unwrap();
    // laggard never acks

    plane.publish_endpoints(&["10.0.0.1", "10.0.0.2"]);

    assert!(settled_rx.try_recv().is_ok(), "settled client gets the update");
    assert!(
        laggard_rx.try_recv().is_err(),
        "client awaiting ack is deferred"
    );
}

#[test]
fn nack_then_publish_recovers() {
    let plane = TestPlane::new();
    plane.publish_endpoints(&["10.0.0.1"]);

    let (client, mut rx) = plane.connect();
    let pushed = plane
        .request(&client, &subscribe(ResourceKind::Endpoints))
        .unwrap();

    // Reject v1; the store has not changed, so the stream goes idle
    let rejection = DiscoveryRequest {
        type_url: ResourceKind::Endpoints.type_url().to_string(),
        response_nonce: pushed.nonce.clone(),
        error_detail: Some(RpcStatus {
            code: 3,
            message: "bad assignment".to_string(),
            details: vec![],
        }),
        ..Default::default()
    };
    assert!(plane.request(&client, &rejection).is_none());
    assert!(rx.try_recv().is_err());

    // The next publish reaches the rejected client immediately
    plane.publish_endpoints(&["10.0.0.9"]);
    let recovered = rx.try_recv().unwrap().unwrap();
    assert_eq!(recovered.version_info, "2");
}

#[test]
fn named_subscription_tracks_changes() {
    let plane = TestPlane::new();
    plane.store().publish(
        ResourceKind::Endpoints,
        vec![
            Arc::new(LoadAssignment::new("cluster-a")),
            Arc::new(LoadAssignment::new("cluster-b")),
        ],
    );

    let (client, _rx) = plane.connect();
    let request = DiscoveryRequest {
        type_url: ResourceKind::Endpoints.type_url().to_string(),
        resource_names: vec!["cluster-a".to_string()],
        ..Default::default()
    };
    let pushed = plane.request(&client, &request).unwrap();
    assert_eq!(pushed.resources.len(), 1);

    // Widening the subscription on resubscribe is honored
    let request = DiscoveryRequest {
        type_url: ResourceKind::Endpoints.type_url().to_string(),
        resource_names: vec!["cluster-a".to_string(), "cluster-b".to_string()],
        ..Default::default()
    };
    let pushed = plane.request(&client, &request).unwrap();
    assert_eq!(pushed.resources.len(), 2);
}
