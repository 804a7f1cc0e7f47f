//! gRPC service implementations.
//!
//! Two services front the same dispatcher:
//! - [`AdsService`] - aggregated: every kind over one stream
//! - [`RdsService`] - dedicated: routes only, for split deployments

pub mod ads;
pub mod rds;

mod streaming;

pub use ads::{AdsService, AdsServiceServer, AggregatedDiscoveryService};
pub use rds::{RdsService, RdsServiceServer, RouteDiscoveryService};
