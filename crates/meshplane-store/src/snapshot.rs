//! Snapshot: immutable, versioned resources of one kind.
//!
//! A snapshot is the unit the store holds and the dispatcher pushes. It is:
//!
//! - **Immutable**: publishing builds a new snapshot, never mutates one
//! - **Versioned**: the store assigns a strictly increasing `u64` per kind
//! - **Ordered**: resources keep their publish order on the wire

use meshplane_core::{BoxResource, ResourceKind};

/// An immutable snapshot of all resources of one kind.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    kind: ResourceKind,
    version: u64,
    resources: Vec<BoxResource>,
}

impl ResourceSnapshot {
    /// The built-in default: no resources, version 0.
    ///
    /// Returned by the store for kinds that were never published, so reads
    /// cannot fail.
    #[must_use]
    pub fn empty(kind: ResourceKind) -> Self {
        Self {
            kind,
            version: 0,
            resources: Vec::new(),
        }
    }

    pub(crate) fn new(kind: ResourceKind, version: u64, resources: Vec<BoxResource>) -> Self {
        Self {
            kind,
            version,
            resources,
        }
    }

    /// The kind every resource in this snapshot belongs to.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The store-assigned version.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The version as it appears in `version_info` on the wire.
    #[must_use]
    pub fn version_info(&self) -> String {
        self.version.to_string()
    }

    /// All resources, in publish order.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[BoxResource] {
        &self.resources
    }

    /// Look up a resource by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxResource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// Whether a resource with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of resources.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the snapshot carries no resources.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
