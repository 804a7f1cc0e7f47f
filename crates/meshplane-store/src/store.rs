//! SnapshotStore: the authoritative snapshot per resource kind.
//!
//! The store is the only mutable state shared across stream tasks. It owns
//! version assignment: every publish produces a new immutable snapshot whose
//! version is exactly one greater than its predecessor for that kind.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use meshplane_core::{BoxResource, ResourceKind};

use crate::snapshot::ResourceSnapshot;
use crate::stats::StoreStats;
use crate::watch::{Watch, WatchManager};

/// Authoritative store of the current snapshot per resource kind.
///
/// ## Thread Safety
///
/// All operations are thread-safe. Entries are guarded at the `DashMap`
/// bucket level, so `get` never blocks on a `publish` of another kind and
/// blocks on the same kind only for the pointer swap. Versions are assigned
/// under the entry lock, which makes `publish` linearizable per kind: no
/// gaps, no duplicates.
///
/// Watch notifications run after every map reference is dropped, so no lock
/// is ever held across channel sends.
#[derive(Debug)]
pub struct SnapshotStore {
    /// Current snapshot per kind.
    snapshots: DashMap<ResourceKind, Arc<ResourceSnapshot>>,
    /// Watch manager for publish notifications.
    watches: WatchManager,
    /// Statistics.
    stats: StoreStats,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Create a new store with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_watch_buffer(16)
    }

    /// Create a new store with a custom watch channel buffer size.
    #[must_use]
    pub fn with_watch_buffer(buffer_size: usize) -> Self {
        Self {
            snapshots: DashMap::new(),
            watches: WatchManager::with_buffer_size(buffer_size),
            stats: StoreStats::new(),
        }
    }

    /// Get the current snapshot for a kind.
    ///
    /// Never fails: a kind that was never published yields the built-in
    /// empty default at version 0.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Arc<ResourceSnapshot> {
        self.stats.record_read();

        // Clone the Arc and drop the map guard immediately.
        match self.snapshots.get(&kind).map(|r| Arc::clone(&r)) {
            Some(snapshot) => {
                trace!(kind = %kind, version = snapshot.version(), "store read");
                snapshot
            }
            None => {
                self.stats.record_default_read();
                trace!(kind = %kind, "store read (default)");
                Arc::new(ResourceSnapshot::empty(kind))
            }
        }
    }

    /// Current version for a kind (0 if never published).
    #[must_use]
    pub fn version(&self, kind: ResourceKind) -> u64 {
        self.snapshots
            .get(&kind)
            .map(|r| r.version())
            .unwrap_or(0)
    }

    /// Replace the snapshot for a kind and notify watches.
    ///
    /// The new snapshot's version is exactly the previous version plus one;
    /// the assignment happens under the entry lock so concurrent publishes
    /// of the same kind serialize without gaps or duplicates.
    pub fn publish(&self, kind: ResourceKind, resources: Vec<BoxResource>) -> Arc<ResourceSnapshot> {
        let snapshot = {
            let mut entry = self
                .snapshots
                .entry(kind)
                .or_insert_with(|| Arc::new(ResourceSnapshot::empty(kind)));
            let next = entry.version() + 1;
            let snapshot = Arc::new(ResourceSnapshot::new(kind, next, resources));
            *entry.value_mut() = Arc::clone(&snapshot);
            snapshot
        };
        self.stats.record_publish();

        debug!(
            kind = %kind,
            version = snapshot.version(),
            resources = snapshot.len(),
            "published snapshot"
        );

        // Notify watches (no map guard held)
        self.watches.notify(kind, Arc::clone(&snapshot));
        snapshot
    }

    /// Subscribe to publishes of a kind.
    #[inline]
    pub fn subscribe(&self, kind: ResourceKind) -> Watch {
        self.watches.create_watch(kind)
    }

    /// Get the watch manager.
    #[inline]
    #[must_use]
    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Get store statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
