//! Resource trait and the built-in resource types.
//!
//! A [`Resource`] is anything the plane can deliver over a discovery stream:
//! it knows its kind, its name (the subscription key), and how to encode
//! itself into a wire-level `Any`.

use std::fmt;
use std::sync::Arc;

use meshplane_types::envoy::config::core::v3 as core_v3;
use meshplane_types::envoy::config::endpoint::v3 as endpoint_v3;
use meshplane_types::envoy::config::route::v3 as route_v3;
use meshplane_types::Message;

use crate::{PlaneError, ResourceKind};

/// Trait for resources delivered over discovery streams.
///
/// Implement this to serve custom payloads for an existing kind. The built-in
/// implementations are [`LoadAssignment`] (endpoints) and [`RouteSpec`]
/// (routes).
pub trait Resource: Send + Sync + fmt::Debug {
    /// The discovery kind this resource belongs to.
    fn kind(&self) -> ResourceKind;

    /// The resource name clients subscribe to.
    fn name(&self) -> &str;

    /// Encode the resource into its wire representation.
    fn encode(&self) -> Result<prost_types::Any, PlaneError>;
}

/// A shared, type-erased resource.
///
/// `Arc` keeps snapshot clones cheap: a snapshot holds references, not
/// payload copies.
pub type BoxResource = Arc<dyn Resource>;

/// A single upstream endpoint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddr {
    /// IP address or hostname.
    pub address: String,
    /// TCP port.
    pub port: u32,
}

/// Load-balancing endpoint assignment for one upstream cluster.
///
/// Encodes to `envoy.config.endpoint.v3.ClusterLoadAssignment`. The cluster
/// name doubles as the resource name for subscription filtering.
///
/// # Example
///
/// ```rust
/// use meshplane_core::LoadAssignment;
///
/// let assignment = LoadAssignment::new("backend_cluster")
///     .with_endpoint("10.0.0.1", 10000)
///     .with_endpoint("10.0.0.2", 10000);
///
/// assert_eq!(assignment.endpoints().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LoadAssignment {
    cluster: String,
    endpoints: Vec<EndpointAddr>,
}

impl LoadAssignment {
    /// Create an empty assignment for a cluster.
    #[must_use]
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            endpoints: Vec::new(),
        }
    }

    /// Add an endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, address: impl Into<String>, port: u32) -> Self {
        self.endpoints.push(EndpointAddr {
            address: address.into(),
            port,
        });
        self
    }

    /// The cluster this assignment belongs to.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// The endpoints in this assignment.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointAddr] {
        &self.endpoints
    }
}

impl Resource for LoadAssignment {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Endpoints
    }

    fn name(&self) -> &str {
        &self.cluster
    }

    fn encode(&self) -> Result<prost_types::Any, PlaneError> {
        let lb_endpoints = self
            .endpoints
            .iter()
            .map(|ep| endpoint_v3::LbEndpoint {
                host_identifier: Some(endpoint_v3::lb_endpoint::HostIdentifier::Endpoint(
                    endpoint_v3::Endpoint {
                        address: Some(core_v3::Address {
                            address: Some(core_v3::address::Address::SocketAddress(
                                core_v3::SocketAddress {
                                    protocol: core_v3::socket_address::Protocol::Tcp as i32,
                                    address: ep.address.clone(),
                                    port_specifier: Some(
                                        core_v3::socket_address::PortSpecifier::PortValue(ep.port),
                                    ),
                                    ..Default::default()
                                },
                            )),
                        }),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            })
            .collect();

        let assignment = endpoint_v3::ClusterLoadAssignment {
            cluster_name: self.cluster.clone(),
            endpoints: vec![endpoint_v3::LocalityLbEndpoints {
                lb_endpoints,
                ..Default::default()
            }],
        };

        Ok(prost_types::Any {
            type_url: ResourceKind::Endpoints.type_url().to_string(),
            value: assignment.encode_to_vec(),
        })
    }
}

/// One prefix-match routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Path prefix requests must match.
    pub prefix: String,
    /// Cluster matched requests are forwarded to.
    pub cluster: String,
}

/// A named routing table.
///
/// Encodes to `envoy.config.route.v3.RouteConfiguration` with a single
/// virtual host carrying the configured domains and rules, matching the
/// route shape sidecars are bootstrapped against.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    name: String,
    virtual_host: String,
    domains: Vec<String>,
    rules: Vec<RouteRule>,
}

impl RouteSpec {
    /// Create an empty routing table.
    ///
    /// The virtual host defaults to `<name>_service` and the domain list to
    /// the wildcard.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            virtual_host: format!("{name}_service"),
            name,
            domains: vec!["*".to_string()],
            rules: Vec::new(),
        }
    }

    /// Override the virtual host name.
    #[must_use]
    pub fn with_virtual_host(mut self, virtual_host: impl Into<String>) -> Self {
        self.virtual_host = virtual_host.into();
        self
    }

    /// Replace the domain list.
    #[must_use]
    pub fn with_domains(mut self, domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Add a prefix-match rule forwarding to a cluster.
    #[must_use]
    pub fn with_rule(mut self, prefix: impl Into<String>, cluster: impl Into<String>) -> Self {
        self.rules.push(RouteRule {
            prefix: prefix.into(),
            cluster: cluster.into(),
        });
        self
    }

    /// The rules in table order.
    #[must_use]
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl Resource for RouteSpec {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Routes
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self) -> Result<prost_types::Any, PlaneError> {
        let routes = self
            .rules
            .iter()
            .map(|rule| route_v3::Route {
                r#match: Some(route_v3::RouteMatch {
                    path_specifier: Some(route_v3::route_match::PathSpecifier::Prefix(
                        rule.prefix.clone(),
                    )),
                }),
                action: Some(route_v3::route::Action::Route(route_v3::RouteAction {
                    cluster_specifier: Some(route_v3::route_action::ClusterSpecifier::Cluster(
                        rule.cluster.clone(),
                    )),
                })),
                ..Default::default()
            })
            .collect();

        let config = route_v3::RouteConfiguration {
            name: self.name.clone(),
            virtual_hosts: vec![route_v3::VirtualHost {
                name: self.virtual_host.clone(),
                domains: self.domains.clone(),
                routes,
            }],
        };

        Ok(prost_types::Any {
            type_url: ResourceKind::Routes.type_url().to_string(),
            value: config.encode_to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshplane_types::Message;

    #[test]
    fn load_assignment_basics() {
        let assignment = LoadAssignment::new("backend_cluster")
            .with_endpoint("10.0.0.1", 10000)
            .with_endpoint("10.0.0.2", 10000);

        assert_eq!(assignment.kind(), ResourceKind::Endpoints);
        assert_eq!(assignment.name(), "backend_cluster");
        assert_eq!(assignment.endpoints().len(), 2);
    }

    #[test]
    fn load_assignment_encodes_addresses() {
        let assignment = LoadAssignment::new("backend_cluster").with_endpoint("10.0.0.1", 10000);

        let any = assignment.encode().unwrap();
        assert_eq!(any.type_url, ResourceKind::Endpoints.type_url());

        let decoded =
            endpoint_v3::ClusterLoadAssignment::decode(any.value.as_slice()).unwrap();
        assert_eq!(decoded.cluster_name, "backend_cluster");
        assert_eq!(decoded.endpoints.len(), 1);
        assert_eq!(decoded.endpoints[0].lb_endpoints.len(), 1);
    }

    #[test]
    fn route_spec_basics() {
        let spec = RouteSpec::new("local_route")
            .with_virtual_host("backend_service")
            .with_rule("/test", "backend_cluster");

        assert_eq!(spec.kind(), ResourceKind::Routes);
        assert_eq!(spec.name(), "local_route");
        assert_eq!(spec.rules().len(), 1);
    }

    #[test]
    fn route_spec_encodes_rules() {
        let spec = RouteSpec::new("local_route").with_rule("/test", "backend_cluster");

        let any = spec.encode().unwrap();
        assert_eq!(any.type_url, ResourceKind::Routes.type_url());

        let decoded = route_v3::RouteConfiguration::decode(any.value.as_slice()).unwrap();
        assert_eq!(decoded.name, "local_route");
        assert_eq!(decoded.virtual_hosts.len(), 1);

        let vhost = &decoded.virtual_hosts[0];
        assert_eq!(vhost.name, "local_route_service");
        assert_eq!(vhost.domains, vec!["*".to_string()]);
        assert_eq!(vhost.routes.len(), 1);

        match vhost.routes[0].r#match.as_ref().unwrap().path_specifier {
            Some(route_v3::route_match::PathSpecifier::Prefix(ref p)) => assert_eq!(p, "/test"),
            _ => panic!("expected prefix match"),
        }
    }

    #[test]
    fn box_resource_is_shareable() {
        let resource: BoxResource = Arc::new(LoadAssignment::new("c1"));
        let clone = Arc::clone(&resource);
        assert_eq!(resource.name(), clone.name());
    }
}
