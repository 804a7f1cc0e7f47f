//! # meshplane-core
//!
//! Core types, resources, and error handling for the meshplane control plane.
//!
//! This crate provides the foundational types used across the other crates:
//!
//! - [`PlaneError`] - Error type with gRPC status code mapping
//! - [`ResourceKind`] - The discovery kinds the plane serves
//! - [`Resource`] - Trait for resources delivered over discovery streams
//! - [`LoadAssignment`] / [`RouteSpec`] - The built-in resource types
//!
//! ## Example
//!
//! ```rust
//! use meshplane_core::{LoadAssignment, Resource, ResourceKind};
//!
//! let assignment = LoadAssignment::new("backend_cluster")
//!     .with_endpoint("10.0.0.1", 10000);
//!
//! assert_eq!(assignment.kind(), ResourceKind::Endpoints);
//! assert_eq!(assignment.name(), "backend_cluster");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod kind;
mod resource;

pub use error::PlaneError;
pub use kind::ResourceKind;
pub use resource::{BoxResource, EndpointAddr, LoadAssignment, Resource, RouteRule, RouteSpec};

/// Result type alias using [`PlaneError`].
pub type Result<T> = std::result::Result<T, PlaneError>;

/// Alias kept for readability at call sites outside this crate.
pub type PlaneResult<T> = Result<T>;
