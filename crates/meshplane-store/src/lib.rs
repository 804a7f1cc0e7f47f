//! # meshplane-store
//!
//! Versioned snapshot store for the meshplane control plane.
//!
//! This crate provides the only mutable state shared across discovery
//! streams:
//!
//! - [`ResourceSnapshot`] - Immutable, versioned bundle of resources for one kind
//! - [`SnapshotStore`] - Current snapshot per kind with gapless version assignment
//! - [`Watch`] - Subscription system for publish notifications
//!
//! ## Key Design Decisions
//!
//! - `DashMap` entry-level locking; `get` never blocks on `publish` beyond a
//!   bucket read
//! - Snapshots are immutable and atomically replaced; versions are assigned
//!   by the store and strictly increase by one per publish
//! - Watch notifications are non-blocking and never run under a map lock
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use meshplane_core::{BoxResource, LoadAssignment, ResourceKind};
//! use meshplane_store::SnapshotStore;
//!
//! let store = SnapshotStore::new();
//! assert_eq!(store.get(ResourceKind::Endpoints).version(), 0);
//!
//! let assignment = LoadAssignment::new("backend_cluster").with_endpoint("10.0.0.1", 10000);
//! let snapshot = store.publish(
//!     ResourceKind::Endpoints,
//!     vec![Arc::new(assignment) as BoxResource],
//! );
//! assert_eq!(snapshot.version(), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod snapshot;
mod stats;
mod store;
mod watch;

pub use snapshot::ResourceSnapshot;
pub use stats::StoreStats;
pub use store::SnapshotStore;
pub use watch::{Watch, WatchId, WatchManager};
