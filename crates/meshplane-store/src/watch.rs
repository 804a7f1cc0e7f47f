//! Watch system for publish notifications.
//!
//! The watch system lets the server react to [`SnapshotStore`] publishes
//! without the store knowing anything about sessions:
//!
//! - Unique watch identifiers ([`WatchId`])
//! - Watch subscriptions ([`Watch`]) for receiving new snapshots
//! - Watch management ([`WatchManager`]) for tracking subscribers per kind
//!
//! [`SnapshotStore`]: crate::SnapshotStore

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use meshplane_core::ResourceKind;

use crate::ResourceSnapshot;

/// Unique identifier for a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

impl WatchId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric value of this watch ID.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A watch subscription receiving snapshot publishes for one kind.
#[derive(Debug)]
pub struct Watch {
    id: WatchId,
    kind: ResourceKind,
    receiver: mpsc::Receiver<Arc<ResourceSnapshot>>,
}

impl Watch {
    /// Get the unique identifier for this watch.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Get the kind this watch is subscribed to.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Receive the next published snapshot.
    ///
    /// Returns `None` if the watch has been cancelled.
    pub async fn recv(&mut self) -> Option<Arc<ResourceSnapshot>> {
        self.receiver.recv().await
    }

    /// Try to receive a publish without waiting.
    pub fn try_recv(&mut self) -> Result<Arc<ResourceSnapshot>, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Sender half of a watch, used internally by the manager.
#[derive(Debug, Clone)]
struct WatchSender {
    id: WatchId,
    sender: mpsc::Sender<Arc<ResourceSnapshot>>,
}

impl WatchSender {
    /// Try to deliver a snapshot without blocking.
    ///
    /// A full channel drops this update; the watcher re-reads the store
    /// current state on the next one it receives. Returns `false` when the
    /// receiver is gone.
    fn try_send(&self, snapshot: Arc<ResourceSnapshot>) -> bool {
        match self.sender.try_send(snapshot) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                trace!(watch_id = %self.id, "watch channel full, skipping publish");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Manager for watch subscriptions, keyed by resource kind.
///
/// Uses a `Mutex` internally but operations are fast (no I/O); the lock is
/// never held while sending.
#[derive(Debug)]
pub struct WatchManager {
    watches: std::sync::Mutex<HashMap<ResourceKind, Vec<WatchSender>>>,
    channel_buffer: usize,
}

impl Default for WatchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchManager {
    /// Create a new watch manager with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer_size(16)
    }

    /// Create a new watch manager with a custom channel buffer size.
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            watches: std::sync::Mutex::new(HashMap::new()),
            channel_buffer: buffer_size,
        }
    }

    /// Create a new watch for a kind.
    pub fn create_watch(&self, kind: ResourceKind) -> Watch {
        let id = WatchId::next();
        let (sender, receiver) = mpsc::channel(self.channel_buffer);

        {
            let mut watches = self.watches.lock().expect("watch lock poisoned");
            watches
                .entry(kind)
                .or_default()
                .push(WatchSender { id, sender });
        }

        debug!(watch_id = %id, kind = %kind, "created watch");

        Watch { id, kind, receiver }
    }

    /// Cancel a watch subscription.
    pub fn cancel_watch(&self, watch_id: WatchId) {
        let mut watches = self.watches.lock().expect("watch lock poisoned");

        for senders in watches.values_mut() {
            if let Some(pos) = senders.iter().position(|s| s.id == watch_id) {
                senders.swap_remove(pos);
                debug!(watch_id = %watch_id, "cancelled watch");
                return;
            }
        }

        warn!(watch_id = %watch_id, "attempted to cancel unknown watch");
    }

    /// Notify all watches for a kind about a published snapshot.
    ///
    /// Closed watches are pruned. The internal lock is released before any
    /// send.
    pub fn notify(&self, kind: ResourceKind, snapshot: Arc<ResourceSnapshot>) {
        let senders: Vec<WatchSender> = {
            let watches = self.watches.lock().expect("watch lock poisoned");
            watches.get(&kind).cloned().unwrap_or_default()
        };

        if senders.is_empty() {
            return;
        }

        let mut closed_ids = Vec::new();
        for sender in &senders {
            if !sender.try_send(Arc::clone(&snapshot)) {
                closed_ids.push(sender.id);
            }
        }

        if !closed_ids.is_empty() {
            let mut watches = self.watches.lock().expect("watch lock poisoned");
            if let Some(senders) = watches.get_mut(&kind) {
                senders.retain(|s| !closed_ids.contains(&s.id));
            }
            debug!(count = closed_ids.len(), "removed closed watches");
        }

        trace!(
            kind = %kind,
            watch_count = senders.len() - closed_ids.len(),
            "notified watches of publish"
        );
    }

    /// Number of active watches for a kind.
    #[must_use]
    pub fn watch_count(&self, kind: ResourceKind) -> usize {
        let watches = self.watches.lock().expect("watch lock poisoned");
        watches.get(&kind).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_id_unique() {
        let id1 = WatchId::next();
        let id2 = WatchId::next();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn watch_manager_create_and_notify() {
        let manager = WatchManager::new();
        let mut watch = manager.create_watch(ResourceKind::Endpoints);
        assert_eq!(manager.watch_count(ResourceKind::Endpoints), 1);

        let snapshot = Arc::new(ResourceSnapshot::empty(ResourceKind::Endpoints));
        manager.notify(ResourceKind::Endpoints, snapshot);

        let received = watch.recv().await.unwrap();
        assert_eq!(received.kind(), ResourceKind::Endpoints);
    }

    #[tokio::test]
    async fn watch_is_kind_scoped() {
        let manager = WatchManager::new();
        let mut endpoints_watch = manager.create_watch(ResourceKind::Endpoints);

        manager.notify(
            ResourceKind::Routes,
            Arc::new(ResourceSnapshot::empty(ResourceKind::Routes)),
        );

        assert!(endpoints_watch.try_recv().is_err());
    }

    #[test]
    fn watch_manager_cancel() {
        let manager = WatchManager::new();
        let watch = manager.create_watch(ResourceKind::Routes);
        assert_eq!(manager.watch_count(ResourceKind::Routes), 1);

        manager.cancel_watch(watch.id());
        assert_eq!(manager.watch_count(ResourceKind::Routes), 0);
    }

    #[tokio::test]
    async fn dropped_watch_is_pruned_on_notify() {
        let manager = WatchManager::new();
        let watch = manager.create_watch(ResourceKind::Endpoints);
        drop(watch);

        manager.notify(
            ResourceKind::Endpoints,
            Arc::new(ResourceSnapshot::empty(ResourceKind::Endpoints)),
        );
        assert_eq!(manager.watch_count(ResourceKind::Endpoints), 0);
    }
}
