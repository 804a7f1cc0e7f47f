//! Resource kinds served over discovery streams.
//!
//! A [`ResourceKind`] is the logical identity behind a wire type URL. The
//! dispatcher routes every request by kind, and the store keys its snapshots
//! by kind.

use std::fmt;

/// The discovery kinds this plane serves.
///
/// The enum is deliberately closed: an unrecognized type URL is not an error
/// at the type level, it maps to `None` in [`ResourceKind::from_type_url`]
/// and the dispatcher drops the request with a log entry.
///
/// # Example
///
/// ```rust
/// use meshplane_core::ResourceKind;
///
/// let kind = ResourceKind::from_type_url(ResourceKind::Endpoints.type_url());
/// assert_eq!(kind, Some(ResourceKind::Endpoints));
/// assert_eq!(ResourceKind::from_type_url("not-a-type-url"), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Load-balancing endpoint assignments (EDS).
    Endpoints,
    /// Routing tables (RDS).
    Routes,
}

impl ResourceKind {
    /// Type URL for endpoint assignments.
    pub const ENDPOINT_TYPE_URL: &'static str =
        "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

    /// Type URL for route configurations.
    pub const ROUTE_TYPE_URL: &'static str =
        "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";

    /// Every kind the plane serves, in dispatch order.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Endpoints, ResourceKind::Routes];

    /// Resolve a wire type URL to a kind.
    ///
    /// Returns `None` for any URL the plane does not serve.
    #[must_use]
    pub fn from_type_url(type_url: &str) -> Option<Self> {
        match type_url {
            Self::ENDPOINT_TYPE_URL => Some(Self::Endpoints),
            Self::ROUTE_TYPE_URL => Some(Self::Routes),
            _ => None,
        }
    }

    /// Get the wire type URL for this kind.
    #[must_use]
    pub const fn type_url(&self) -> &'static str {
        match self {
            Self::Endpoints => Self::ENDPOINT_TYPE_URL,
            Self::Routes => Self::ROUTE_TYPE_URL,
        }
    }

    /// Short name for logging, e.g. `ClusterLoadAssignment`.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.type_url()
            .rsplit('.')
            .next()
            .unwrap_or_else(|| self.type_url())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Endpoints => write!(f, "endpoints"),
            Self::Routes => write!(f, "routes"),
        }
    }
}
