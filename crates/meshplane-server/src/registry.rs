//! Session registry: the set of live discovery streams.
//!
//! The registry maps generated [`StreamId`]s to [`SessionHandle`]s, keeping
//! session identity independent of any transport handle and making the
//! store-driven broadcast path testable without a network.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tonic::Status;
use tracing::debug;

use meshplane_types::envoy::service::discovery::v3::DiscoveryResponse;

use crate::session::StreamSession;
use crate::stream::StreamId;

/// A registered session plus its outbound response channel.
///
/// The session mutex is uncontended in steady state (the owning stream task
/// is the only regular user); the broadcast path takes it briefly and never
/// across an await point.
#[derive(Debug)]
pub struct SessionHandle {
    id: StreamId,
    session: Mutex<StreamSession>,
    tx: mpsc::Sender<Result<DiscoveryResponse, Status>>,
}

impl SessionHandle {
    /// Create a handle for a newly opened stream.
    pub fn new(
        session: StreamSession,
        tx: mpsc::Sender<Result<DiscoveryResponse, Status>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: session.id(),
            session: Mutex::new(session),
            tx,
        })
    }

    /// The stream this handle belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The session state.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Mutex<StreamSession> {
        &self.session
    }

    /// The outbound response channel.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> &mpsc::Sender<Result<DiscoveryResponse, Status>> {
        &self.tx
    }
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<StreamId, Arc<SessionHandle>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session on stream open.
    pub fn register(&self, handle: Arc<SessionHandle>) {
        debug!(stream = %handle.id(), "session registered");
        self.sessions.insert(handle.id(), handle);
    }

    /// Remove a session on stream close or error.
    ///
    /// Any state the session carried is discarded with it.
    pub fn unregister(&self, id: StreamId) {
        if self.sessions.remove(&id).is_some() {
            debug!(stream = %id, "session unregistered");
        }
    }

    /// Look up a session by stream ID.
    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(&id).map(|r| Arc::clone(&r))
    }

    /// Snapshot of all live sessions.
    ///
    /// Collects under the map's shard locks and releases them before
    /// returning, so callers never send while the registry is locked.
    #[must_use]
    pub fn live(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.iter().map(|r| Arc::clone(&r)).collect()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
