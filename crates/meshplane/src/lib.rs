//! # meshplane
//!
//! A State-of-the-World xDS control plane for sidecar proxies.
//!
//! Data-plane clients open long-lived discovery streams, announce which
//! resource kinds and names they want, and the plane pushes versioned
//! endpoint and route snapshots with full ACK/NACK correlation.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use meshplane::prelude::*;
//!
//! // The store holds the authoritative snapshot per kind
//! let store = Arc::new(SnapshotStore::new());
//!
//! // Publish endpoints; subscribed streams get pushed automatically
//! store.publish(
//!     ResourceKind::Endpoints,
//!     vec![Arc::new(
//!         LoadAssignment::new("backend_cluster").with_endpoint("10.0.0.1", 10000),
//!     )],
//! );
//!
//! // Wire the store into a server
//! let server = DiscoveryServer::builder()
//!     .store(Arc::clone(&store))
//!     .build()
//!     .unwrap();
//! # drop(server);
//! ```
//!
//! ## Architecture
//!
//! The workspace is layered:
//!
//! - `meshplane-types` - wire-level protobuf messages
//! - `meshplane-core` - resource kinds, resource trait, errors
//! - `meshplane-store` - versioned snapshot store with watch notifications
//! - `meshplane-server` - protocol engine and gRPC server
//!
//! This crate re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **No panics in library code** - all errors are returned as `Result`
//! 2. **No locks across await points** - sessions are owned by their stream's
//!    task; the broadcast path takes short-lived locks only
//! 3. **At most one outstanding push per kind per stream** - updates are
//!    deferred until the client acknowledges or rejects
//! 4. **Store-assigned versions** - strictly increasing per kind, never reused

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export all sub-crates
pub use meshplane_core as core;
pub use meshplane_server as server;
pub use meshplane_store as store;
pub use meshplane_types as types;

/// Prelude module for convenient imports.
///
/// ```rust
/// use meshplane::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use meshplane_core::{
        BoxResource, EndpointAddr, LoadAssignment, PlaneError, PlaneResult, Resource,
        ResourceKind, RouteRule, RouteSpec,
    };

    // Store types
    pub use meshplane_store::{ResourceSnapshot, SnapshotStore, StoreStats, Watch};

    // Server types
    pub use meshplane_server::{
        DiscoveryDispatcher, DiscoveryServer, DiscoveryServerBuilder, ServerConfig,
        SessionRegistry, StreamId, StreamSession, Subscription, SyncState,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Minimum supported Rust version.
    pub const MSRV: &str = "1.75";

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("meshplane {} (MSRV {})", VERSION, MSRV)
    }
}
