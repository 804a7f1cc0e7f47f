//! Per-stream protocol state.
//!
//! A [`StreamSession`] tracks, independently per resource kind, what one
//! client has asked for, what it has acknowledged, and whether a push is
//! still in flight. Sessions are created on stream open, owned by the
//! stream's task, and discarded on stream close; only the store-driven
//! broadcast path touches them from outside, through a short-lived lock.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use meshplane_core::ResourceKind;

use crate::stream::StreamId;

/// What a client subscribed to for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Empty name list on the wire: every resource of the kind.
    All,
    /// An explicit set of resource names.
    Names(BTreeSet<String>),
}

impl Subscription {
    /// Build a subscription from the wire-level name list.
    #[must_use]
    pub fn from_names(names: &[String]) -> Self {
        if names.is_empty() {
            Self::All
        } else {
            Self::Names(names.iter().cloned().collect())
        }
    }

    /// Whether a resource with this name is covered.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => names.contains(name),
        }
    }

    /// Whether this is the wildcard subscription.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Protocol state of one (session, kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The client never asked for this kind.
    Unsubscribed,
    /// Subscribed, nothing delivered yet.
    AwaitingInitial,
    /// A push is in flight and not yet acknowledged or rejected.
    AwaitingAck,
    /// The last push was acknowledged; idle until the store moves.
    Synced,
}

/// The single outstanding push for a kind.
#[derive(Debug, Clone)]
pub struct PendingPush {
    /// Version that was pushed.
    pub version: u64,
    /// Nonce the client must echo back.
    pub nonce: String,
    /// When the push was handed to the transport.
    pub sent_at: Instant,
}

/// Last version/nonce a client confirmed for a kind.
#[derive(Debug, Clone)]
pub struct AckedVersion {
    /// Confirmed version.
    pub version: u64,
    /// Nonce of the confirmed response.
    pub nonce: String,
}

/// Exponential-backoff bookkeeping for rejected pushes.
///
/// Armed on every NACK; consulted before a bare retry of a snapshot the
/// store has not changed since the rejection.
#[derive(Debug, Clone)]
pub struct NackBackoff {
    attempts: u32,
    last_nack: Instant,
    /// Version the client rejected.
    pub rejected_version: u64,
    /// Nonce of the rejected response.
    pub rejected_nonce: String,
}

impl NackBackoff {
    fn new(rejected_version: u64, rejected_nonce: String) -> Self {
        Self {
            attempts: 1,
            last_nack: Instant::now(),
            rejected_version,
            rejected_nonce,
        }
    }

    fn bump(&mut self, rejected_version: u64, rejected_nonce: String) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_nack = Instant::now();
        self.rejected_version = rejected_version;
        self.rejected_nonce = rejected_nonce;
    }

    /// Number of consecutive rejections.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next bare retry is allowed.
    #[must_use]
    pub fn delay(&self, initial: Duration, max: Duration) -> Duration {
        let exp = self.attempts.saturating_sub(1).min(16);
        initial.saturating_mul(1u32 << exp).min(max)
    }

    /// Whether a bare retry of the unchanged snapshot is allowed yet.
    #[must_use]
    pub fn retry_ready(&self, now: Instant, initial: Duration, max: Duration) -> bool {
        now.duration_since(self.last_nack) >= self.delay(initial, max)
    }
}

/// Per-connection protocol state for one discovery stream.
#[derive(Debug)]
pub struct StreamSession {
    id: StreamId,
    node_id: Option<String>,
    subscriptions: HashMap<ResourceKind, Subscription>,
    acked: HashMap<ResourceKind, AckedVersion>,
    pending: HashMap<ResourceKind, PendingPush>,
    backoff: HashMap<ResourceKind, NackBackoff>,
}

impl StreamSession {
    /// Create session state for a newly opened stream.
    #[must_use]
    pub fn new(id: StreamId) -> Self {
        Self {
            id,
            node_id: None,
            subscriptions: HashMap::new(),
            acked: HashMap::new(),
            pending: HashMap::new(),
            backoff: HashMap::new(),
        }
    }

    /// The stream this session belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Node identity announced on the first request.
    #[inline]
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// Record the node identity.
    pub fn set_node_id(&mut self, node_id: impl Into<String>) {
        self.node_id = Some(node_id.into());
    }

    /// Record the requested resource names for a kind.
    pub fn subscribe(&mut self, kind: ResourceKind, names: &[String]) {
        self.subscriptions
            .insert(kind, Subscription::from_names(names));
    }

    /// Current subscription for a kind, if any.
    #[must_use]
    pub fn subscription(&self, kind: ResourceKind) -> Option<&Subscription> {
        self.subscriptions.get(&kind)
    }

    /// The outstanding push for a kind, if any.
    #[must_use]
    pub fn pending(&self, kind: ResourceKind) -> Option<&PendingPush> {
        self.pending.get(&kind)
    }

    /// Last confirmed version for a kind, if any.
    #[must_use]
    pub fn acked(&self, kind: ResourceKind) -> Option<&AckedVersion> {
        self.acked.get(&kind)
    }

    /// Last confirmed version number for a kind.
    #[must_use]
    pub fn acked_version(&self, kind: ResourceKind) -> Option<u64> {
        self.acked.get(&kind).map(|a| a.version)
    }

    /// Backoff state from earlier rejections, if armed.
    #[must_use]
    pub fn nack_backoff(&self, kind: ResourceKind) -> Option<&NackBackoff> {
        self.backoff.get(&kind)
    }

    /// Protocol state of this session for a kind.
    #[must_use]
    pub fn state(&self, kind: ResourceKind) -> SyncState {
        if self.pending.contains_key(&kind) {
            SyncState::AwaitingAck
        } else if self.acked.contains_key(&kind) {
            SyncState::Synced
        } else if self.subscriptions.contains_key(&kind) {
            SyncState::AwaitingInitial
        } else {
            SyncState::Unsubscribed
        }
    }

    /// Record a push handed to the transport.
    ///
    /// Enforces the at-most-one-outstanding invariant: callers must not push
    /// while a pending entry exists, so this replaces nothing silently in
    /// normal operation.
    pub fn record_push(&mut self, kind: ResourceKind, version: u64, nonce: impl Into<String>) {
        self.pending.insert(
            kind,
            PendingPush {
                version,
                nonce: nonce.into(),
                sent_at: Instant::now(),
            },
        );
    }

    /// Record a client acknowledgment: advances acked state, clears the
    /// pending push and any armed backoff.
    pub fn record_ack(&mut self, kind: ResourceKind, version: u64, nonce: impl Into<String>) {
        self.acked.insert(
            kind,
            AckedVersion {
                version,
                nonce: nonce.into(),
            },
        );
        self.pending.remove(&kind);
        self.backoff.remove(&kind);
    }

    /// Drop the outstanding push record without resolving it.
    ///
    /// Used when a push could not be handed to the transport; the next store
    /// publish retries from scratch.
    pub fn clear_pending(&mut self, kind: ResourceKind) {
        self.pending.remove(&kind);
    }

    /// Record a client rejection: clears the pending push, leaves acked
    /// state untouched, and arms (or bumps) the backoff.
    pub fn record_nack(&mut self, kind: ResourceKind, rejected_version: u64, rejected_nonce: &str) {
        self.pending.remove(&kind);
        match self.backoff.get_mut(&kind) {
            Some(backoff) => backoff.bump(rejected_version, rejected_nonce.to_string()),
            None => {
                self.backoff.insert(
                    kind,
                    NackBackoff::new(rejected_version, rejected_nonce.to_string()),
                );
            }
        }
    }
}
