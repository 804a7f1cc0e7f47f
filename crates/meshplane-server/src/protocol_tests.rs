//! Protocol compliance tests for the discovery engine.
//!
//! These tests drive store, dispatcher, and registry together and verify the
//! State-of-the-World protocol contract end to end: version monotonicity,
//! the at-most-one-outstanding-push invariant, subscription filtering, and
//! ACK/NACK bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tonic::Status;

use meshplane_core::{BoxResource, LoadAssignment, ResourceKind, RouteSpec};
use meshplane_store::SnapshotStore;
use meshplane_types::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use meshplane_types::google::rpc::Status as RpcStatus;

use crate::dispatcher::DiscoveryDispatcher;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::session::{StreamSession, SyncState};
use crate::stream::StreamId;

type ResponseRx = mpsc::Receiver<Result<DiscoveryResponse, Status>>;

fn endpoints(addrs: &[&str]) -> Vec<BoxResource> {
    vec![Arc::new(addrs.iter().fold(
        LoadAssignment::new("backend_cluster"),
        |assignment, addr| assignment.with_endpoint(*addr, 10000),
    )) as BoxResource]
}

fn routes() -> Vec<BoxResource> {
    vec![Arc::new(
        RouteSpec::new("local_route")
            .with_virtual_host("backend_service")
            .with_rule("/test", "backend_cluster"),
    ) as BoxResource]
}

fn setup() -> (DiscoveryDispatcher, Arc<SessionHandle>, ResponseRx) {
    let dispatcher = DiscoveryDispatcher::new(
        Arc::new(SnapshotStore::new()),
        Arc::new(SessionRegistry::new()),
    );
    let (handle, rx) = connect(&dispatcher);
    (dispatcher, handle, rx)
}

fn connect(dispatcher: &DiscoveryDispatcher) -> (Arc<SessionHandle>, ResponseRx) {
    let (tx, rx) = mpsc::channel(8);
    let handle = SessionHandle::new(StreamSession::new(StreamId::new()), tx);
    dispatcher.registry().register(Arc::clone(&handle));
    (handle, rx)
}

fn initial_request(kind: ResourceKind, names: &[&str]) -> DiscoveryRequest {
    DiscoveryRequest {
        type_url: kind.type_url().to_string(),
        resource_names: names.iter().map(|n| n.to_string()).collect(),
        ..Default::default()
    }
}

fn ack_request(kind: ResourceKind, response: &DiscoveryResponse) -> DiscoveryRequest {
    DiscoveryRequest {
        type_url: kind.type_url().to_string(),
        version_info: response.version_info.clone(),
        response_nonce: response.nonce.clone(),
        ..Default::default()
    }
}

fn nack_request(kind: ResourceKind, response: &DiscoveryResponse) -> DiscoveryRequest {
    DiscoveryRequest {
        type_url: kind.type_url().to_string(),
        response_nonce: response.nonce.clone(),
        error_detail: Some(RpcStatus {
            code: 3,
            message: "failed to apply config".to_string(),
            details: vec![],
        }),
        ..Default::default()
    }
}

// ============================================================================
// Protocol properties
// ============================================================================

mod properties {
    use super::*;

    /// Versions returned by consecutive publishes strictly increase.
    #[test]
    fn monotonic_versions() {
        let store = SnapshotStore::new();
        let mut last = 0;
        for i in 0..20 {
            let snapshot = store.publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));
            assert!(snapshot.version() > last, "publish {i} did not advance");
            last = snapshot.version();
        }
    }

    /// Between two consecutive ACK/NACKs, at most one response is sent.
    #[test]
    fn at_most_one_outstanding_push() {
        let (dispatcher, handle, mut rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();

        // Store churns while the push is outstanding; nothing may go out.
        for _ in 0..5 {
            let snapshot = dispatcher
                .store()
                .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1", "10.0.0.2"]));
            dispatcher.handle_publish(&snapshot);
        }
        assert!(rx.try_recv().is_err(), "pushes while awaiting ack");

        // The ACK releases exactly the one deferred update.
        let follow_up = dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Endpoints, &pushed))
            .unwrap()
            .unwrap();
        assert_eq!(follow_up.version_info, "6");
    }

    /// A resource outside the subscribed names never reaches the session.
    #[test]
    fn subscription_correctness() {
        let (dispatcher, handle, _rx) = setup();

        let resources: Vec<BoxResource> = vec![
            Arc::new(LoadAssignment::new("A")),
            Arc::new(LoadAssignment::new("B")),
            Arc::new(LoadAssignment::new("C")),
        ];
        dispatcher.store().publish(ResourceKind::Endpoints, resources);

        let response = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &["A", "B"]))
            .unwrap()
            .unwrap();

        assert_eq!(response.resources.len(), 2);

        // Empty names means everything.
        let (wildcard_handle, _rx2) = connect(&dispatcher);
        let response = dispatcher
            .handle_request(
                &wildcard_handle,
                &initial_request(ResourceKind::Endpoints, &[]),
            )
            .unwrap()
            .unwrap();
        assert_eq!(response.resources.len(), 3);
    }

    /// An ACK advances acked state; the same request as a NACK does not.
    #[test]
    fn ack_advances_state_nack_does_not() {
        let (dispatcher, handle, _rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();

        // NACK first: acked unchanged
        dispatcher
            .handle_request(&handle, &nack_request(ResourceKind::Endpoints, &pushed))
            .unwrap();
        {
            let session = handle.session().lock().unwrap();
            assert_eq!(session.acked_version(ResourceKind::Endpoints), None);
        }

        // Resubscribe to get a fresh push, then ACK it
        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Endpoints, &pushed))
            .unwrap();
        {
            let session = handle.session().lock().unwrap();
            let acked = session.acked(ResourceKind::Endpoints).unwrap();
            assert_eq!(acked.version, 1);
            assert_eq!(acked.nonce, pushed.nonce);
        }
    }

    /// An acked session is not re-sent a version it already holds.
    #[test]
    fn idempotent_resend() {
        let (dispatcher, handle, mut rx) = setup();
        let snapshot = dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Endpoints, &pushed))
            .unwrap();

        // Fan out the same snapshot again: nothing new to say.
        dispatcher.handle_publish(&snapshot);
        assert!(rx.try_recv().is_err());

        // A version advance does go out.
        let newer = dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1", "10.0.0.2"]));
        dispatcher.handle_publish(&newer);
        let update = rx.try_recv().unwrap().unwrap();
        assert_eq!(update.version_info, "2");
    }
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

mod scenarios {
    use super::*;

    /// Initial subscribe: empty nonce for endpoints yields the current
    /// snapshot with a fresh nonce.
    #[test]
    fn scenario_initial_subscribe() {
        let (dispatcher, handle, _rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let response = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .expect("initial request must be answered");

        assert_eq!(response.version_info, "1");
        assert_eq!(response.type_url, ResourceKind::Endpoints.type_url());
        assert_eq!(response.resources.len(), 1);
        assert!(!response.nonce.is_empty());
    }

    /// ACK then publish: the settled client receives the new version
    /// unsolicited, with a newer version and a different nonce.
    #[test]
    fn scenario_unsolicited_push_after_publish() {
        let (dispatcher, handle, mut rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let v1 = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Endpoints, &v1))
            .unwrap();

        let snapshot = dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1", "10.0.0.2"]));
        dispatcher.handle_publish(&snapshot);

        let v2 = rx.try_recv().expect("unsolicited push").unwrap();
        assert_eq!(v2.version_info, "2");
        assert!(
            v2.version_info.parse::<u64>().unwrap() > v1.version_info.parse::<u64>().unwrap()
        );
        assert_ne!(v2.nonce, v1.nonce);
    }

    /// NACK with an unchanged store: acked state stays put and no immediate
    /// resend happens (the backoff window gates any bare retry).
    #[test]
    fn scenario_nack_applies_backoff() {
        let (dispatcher, handle, mut rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let v1 = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Endpoints, &v1))
            .unwrap();

        let snapshot = dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1", "10.0.0.2"]));
        dispatcher.handle_publish(&snapshot);
        let v2 = rx.try_recv().unwrap().unwrap();

        let result = dispatcher
            .handle_request(&handle, &nack_request(ResourceKind::Endpoints, &v2))
            .unwrap();
        assert!(result.is_none(), "unchanged store: no immediate resend");

        let session = handle.session().lock().unwrap();
        assert_eq!(session.acked_version(ResourceKind::Endpoints), Some(1));
        assert!(session.nack_backoff(ResourceKind::Endpoints).is_some());
    }

    /// A routes-only subscriber sees route configurations and nothing else,
    /// no matter how often the endpoint store changes.
    #[test]
    fn scenario_routes_only_isolation() {
        let (dispatcher, handle, mut rx) = setup();
        dispatcher.store().publish(ResourceKind::Routes, routes());

        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Routes, &[]))
            .unwrap()
            .unwrap();
        assert_eq!(pushed.type_url, ResourceKind::Routes.type_url());
        dispatcher
            .handle_request(&handle, &ack_request(ResourceKind::Routes, &pushed))
            .unwrap();

        for _ in 0..3 {
            let snapshot = dispatcher
                .store()
                .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));
            dispatcher.handle_publish(&snapshot);
        }
        assert!(rx.try_recv().is_err(), "endpoint churn leaked to a routes session");

        // Route changes still arrive.
        let snapshot = dispatcher.store().publish(ResourceKind::Routes, routes());
        dispatcher.handle_publish(&snapshot);
        let update = rx.try_recv().unwrap().unwrap();
        assert_eq!(update.type_url, ResourceKind::Routes.type_url());
    }

    /// Endpoints and routes progress independently on one aggregated stream.
    #[test]
    fn scenario_multiplexed_kinds_are_independent() {
        let (dispatcher, handle, _rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));
        dispatcher.store().publish(ResourceKind::Routes, routes());

        // Endpoints push goes out and stays unacknowledged...
        dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();

        // ...which must not block the routes subscription on the same stream.
        let routes_push = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Routes, &[]))
            .unwrap()
            .expect("routes progress blocked by endpoints");
        assert_eq!(routes_push.type_url, ResourceKind::Routes.type_url());

        let session = handle.session().lock().unwrap();
        assert_eq!(
            session.state(ResourceKind::Endpoints),
            SyncState::AwaitingAck
        );
        assert_eq!(session.state(ResourceKind::Routes), SyncState::AwaitingAck);
    }

    /// Two clients track the store independently.
    #[test]
    fn scenario_independent_sessions() {
        let (dispatcher, first, _rx1) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));

        let p1 = dispatcher
            .handle_request(&first, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        dispatcher
            .handle_request(&first, &ack_request(ResourceKind::Endpoints, &p1))
            .unwrap();

        // Second client connects later and still gets the full state.
        let (second, _rx2) = connect(&dispatcher);
        let p2 = dispatcher
            .handle_request(&second, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();
        assert_eq!(p2.version_info, p1.version_info);
        assert_ne!(p2.nonce, p1.nonce);

        let first_session = first.session().lock().unwrap();
        let second_session = second.session().lock().unwrap();
        assert_eq!(first_session.state(ResourceKind::Endpoints), SyncState::Synced);
        assert_eq!(
            second_session.state(ResourceKind::Endpoints),
            SyncState::AwaitingAck
        );
    }

    /// Session teardown removes the stream from the fan-out set.
    #[test]
    fn scenario_teardown_discards_session() {
        let (dispatcher, handle, _rx) = setup();
        dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.1"]));
        dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Endpoints, &[]))
            .unwrap()
            .unwrap();

        dispatcher.registry().unregister(handle.id());
        assert!(dispatcher.registry().is_empty());

        // Fan-out after teardown touches nobody.
        let snapshot = dispatcher
            .store()
            .publish(ResourceKind::Endpoints, endpoints(&["10.0.0.2"]));
        dispatcher.handle_publish(&snapshot);
    }

    /// NACK backoff: a repeat rejection earns a bare retry only after the
    /// window elapses.
    #[test]
    fn scenario_nack_retry_after_backoff_window() {
        let store = Arc::new(SnapshotStore::new());
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = DiscoveryDispatcher::new(Arc::clone(&store), Arc::clone(&registry))
            .with_nack_backoff(Duration::from_millis(1), Duration::from_millis(1));
        let (handle, _rx) = connect(&dispatcher);

        store.publish(ResourceKind::Routes, routes());
        let pushed = dispatcher
            .handle_request(&handle, &initial_request(ResourceKind::Routes, &[]))
            .unwrap()
            .unwrap();

        let rejection = nack_request(ResourceKind::Routes, &pushed);
        assert!(dispatcher.handle_request(&handle, &rejection).unwrap().is_none());

        std::thread::sleep(Duration::from_millis(5));

        let retry = dispatcher
            .handle_request(&handle, &rejection)
            .unwrap()
            .expect("retry after the backoff window");
        assert_eq!(retry.version_info, pushed.version_info);
        assert_ne!(retry.nonce, pushed.nonce);
    }
}
