//! # meshplane-types
//!
//! Wire-level protobuf messages for the discovery protocol.
//!
//! This crate carries the subset of the Envoy v3 data-plane API the plane
//! actually speaks: the State-of-the-World discovery messages plus the
//! endpoint and route configuration payloads. The messages are hand-authored
//! prost structs with the upstream field tags, so they are byte-compatible
//! with clients built against the official protos without requiring protoc
//! at build time.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_code)]

// Re-export prost types for convenience
pub use prost::Message;
pub use prost_types::Any;

pub mod envoy {
    //! Envoy data-plane API types.

    pub mod service {
        //! Discovery service messages.

        pub mod discovery {
            //! Core discovery request/response pair.

            pub mod v3 {
                //! Discovery v3 API.

                /// Discovery request sent by a data-plane client.
                ///
                /// A request either opens/updates a subscription (empty or
                /// stale `response_nonce`), acknowledges a response
                /// (`response_nonce` set, no `error_detail`), or rejects one
                /// (`error_detail` present).
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct DiscoveryRequest {
                    /// Version of the last accepted response (empty on the
                    /// first request for a type).
                    #[prost(string, tag = "1")]
                    pub version_info: String,
                    /// Identity of the requesting node.
                    #[prost(message, optional, tag = "2")]
                    pub node: Option<super::super::super::config::core::v3::Node>,
                    /// Requested resource names; empty means "everything".
                    #[prost(string, repeated, tag = "3")]
                    pub resource_names: Vec<String>,
                    /// Type URL of the requested resources.
                    #[prost(string, tag = "4")]
                    pub type_url: String,
                    /// Nonce of the response this request answers.
                    #[prost(string, tag = "5")]
                    pub response_nonce: String,
                    /// Populated when the client rejects the response named
                    /// by `response_nonce` (a NACK).
                    #[prost(message, optional, tag = "6")]
                    pub error_detail: Option<crate::google::rpc::Status>,
                }

                /// Discovery response pushed by the control plane.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct DiscoveryResponse {
                    /// Version of this resource set.
                    #[prost(string, tag = "1")]
                    pub version_info: String,
                    /// The full resource set for `type_url`.
                    #[prost(message, repeated, tag = "2")]
                    pub resources: Vec<::prost_types::Any>,
                    /// Canary marker (unused by this plane).
                    #[prost(bool, tag = "3")]
                    pub canary: bool,
                    /// Type URL of the carried resources.
                    #[prost(string, tag = "4")]
                    pub type_url: String,
                    /// Correlation nonce the next request must echo back.
                    #[prost(string, tag = "5")]
                    pub nonce: String,
                    /// Identity of the control plane instance.
                    #[prost(message, optional, tag = "6")]
                    pub control_plane: Option<super::super::super::config::core::v3::ControlPlane>,
                }
            }
        }
    }

    pub mod config {
        //! Envoy configuration payload types.

        pub mod core {
            //! Shared core configuration types.

            pub mod v3 {
                //! Core v3 API.

                /// Identity of a data-plane node.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Node {
                    /// Opaque node identifier.
                    #[prost(string, tag = "1")]
                    pub id: String,
                    /// Service cluster the node belongs to.
                    #[prost(string, tag = "2")]
                    pub cluster: String,
                    /// Locality of the node.
                    #[prost(message, optional, tag = "4")]
                    pub locality: Option<Locality>,
                    /// Free-form client description.
                    #[prost(string, tag = "6")]
                    pub user_agent_name: String,
                }

                /// Identity of a control plane instance.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ControlPlane {
                    /// Opaque identifier for this instance.
                    #[prost(string, tag = "1")]
                    pub identifier: String,
                }

                /// Where the node runs.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Locality {
                    /// Region.
                    #[prost(string, tag = "1")]
                    pub region: String,
                    /// Zone within the region.
                    #[prost(string, tag = "2")]
                    pub zone: String,
                    /// Sub-zone within the zone.
                    #[prost(string, tag = "3")]
                    pub sub_zone: String,
                }

                /// A reachable network address.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Address {
                    /// Concrete address variant.
                    #[prost(oneof = "address::Address", tags = "1, 2")]
                    pub address: Option<address::Address>,
                }

                /// Nested types for [`Address`].
                pub mod address {
                    /// Concrete address variants.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum Address {
                        /// IP socket address.
                        #[prost(message, tag = "1")]
                        SocketAddress(super::SocketAddress),
                        /// Unix domain socket.
                        #[prost(message, tag = "2")]
                        Pipe(super::Pipe),
                    }
                }

                /// An IP socket address.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct SocketAddress {
                    /// Transport protocol.
                    #[prost(enumeration = "socket_address::Protocol", tag = "1")]
                    pub protocol: i32,
                    /// IP address or hostname.
                    #[prost(string, tag = "2")]
                    pub address: String,
                    /// Custom resolver name.
                    #[prost(string, tag = "5")]
                    pub resolver_name: String,
                    /// Enable IPv4 mapping when bound to an IPv6 address.
                    #[prost(bool, tag = "6")]
                    pub ipv4_compat: bool,
                    /// Port, numeric or named.
                    #[prost(oneof = "socket_address::PortSpecifier", tags = "3, 4")]
                    pub port_specifier: Option<socket_address::PortSpecifier>,
                }

                /// Nested types for [`SocketAddress`].
                pub mod socket_address {
                    /// Transport protocol of a socket address.
                    #[derive(
                        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
                    )]
                    #[repr(i32)]
                    pub enum Protocol {
                        /// TCP.
                        Tcp = 0,
                        /// UDP.
                        Udp = 1,
                    }

                    /// Port, numeric or named.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum PortSpecifier {
                        /// Numeric port.
                        #[prost(uint32, tag = "3")]
                        PortValue(u32),
                        /// Named port (resolved by the data plane).
                        #[prost(string, tag = "4")]
                        NamedPort(String),
                    }
                }

                /// Unix domain socket address.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Pipe {
                    /// Filesystem path.
                    #[prost(string, tag = "1")]
                    pub path: String,
                    /// File mode.
                    #[prost(uint32, tag = "2")]
                    pub mode: u32,
                }

                /// Endpoint health as reported to the data plane.
                #[derive(
                    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
                )]
                #[repr(i32)]
                pub enum HealthStatus {
                    /// Health is unknown; routed as healthy.
                    Unknown = 0,
                    /// Healthy.
                    Healthy = 1,
                    /// Unhealthy; excluded from load balancing.
                    Unhealthy = 2,
                    /// Draining ahead of removal.
                    Draining = 3,
                    /// Health check timed out.
                    Timeout = 4,
                    /// Degraded; used only when no healthy hosts remain.
                    Degraded = 5,
                }
            }
        }

        pub mod endpoint {
            //! Load-assignment payloads (the endpoints resource).

            pub mod v3 {
                //! Endpoint v3 API.

                /// Full endpoint assignment for one upstream cluster.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct ClusterLoadAssignment {
                    /// Name of the cluster this assignment belongs to.
                    #[prost(string, tag = "1")]
                    pub cluster_name: String,
                    /// Endpoints grouped by locality.
                    #[prost(message, repeated, tag = "2")]
                    pub endpoints: Vec<LocalityLbEndpoints>,
                }

                /// Endpoints that share a locality.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LocalityLbEndpoints {
                    /// Locality of this group.
                    #[prost(message, optional, tag = "1")]
                    pub locality: Option<super::super::core::v3::Locality>,
                    /// The endpoints themselves.
                    #[prost(message, repeated, tag = "2")]
                    pub lb_endpoints: Vec<LbEndpoint>,
                    /// Failover priority; 0 is the highest.
                    #[prost(uint32, tag = "5")]
                    pub priority: u32,
                }

                /// A single load-balanced endpoint.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct LbEndpoint {
                    /// Reported health.
                    #[prost(enumeration = "super::super::core::v3::HealthStatus", tag = "2")]
                    pub health_status: i32,
                    /// Relative load-balancing weight.
                    #[prost(message, optional, tag = "4")]
                    pub load_balancing_weight: Option<u32>,
                    /// The upstream host.
                    #[prost(oneof = "lb_endpoint::HostIdentifier", tags = "1")]
                    pub host_identifier: Option<lb_endpoint::HostIdentifier>,
                }

                /// Nested types for [`LbEndpoint`].
                pub mod lb_endpoint {
                    /// The upstream host of an endpoint.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum HostIdentifier {
                        /// Concrete endpoint address.
                        #[prost(message, tag = "1")]
                        Endpoint(super::Endpoint),
                    }
                }

                /// Address of an upstream host.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Endpoint {
                    /// Where to dial the host.
                    #[prost(message, optional, tag = "1")]
                    pub address: Option<super::super::core::v3::Address>,
                    /// Hostname for health checking and logging.
                    #[prost(string, tag = "3")]
                    pub hostname: String,
                }
            }
        }

        pub mod route {
            //! Route-configuration payloads (the routes resource).

            pub mod v3 {
                //! Route v3 API.

                /// A named routing table.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteConfiguration {
                    /// Name the data plane subscribes to.
                    #[prost(string, tag = "1")]
                    pub name: String,
                    /// Virtual hosts making up the table.
                    #[prost(message, repeated, tag = "2")]
                    pub virtual_hosts: Vec<VirtualHost>,
                }

                /// A set of routes scoped to a set of domains.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct VirtualHost {
                    /// Name for stats and logging.
                    #[prost(string, tag = "1")]
                    pub name: String,
                    /// Domains this host serves; `*` matches everything.
                    #[prost(string, repeated, tag = "2")]
                    pub domains: Vec<String>,
                    /// Routes tried in order.
                    #[prost(message, repeated, tag = "3")]
                    pub routes: Vec<Route>,
                }

                /// One match/action pair.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct Route {
                    /// What requests this route applies to.
                    #[prost(message, optional, tag = "1")]
                    pub r#match: Option<RouteMatch>,
                    /// Route name for logging.
                    #[prost(string, tag = "14")]
                    pub name: String,
                    /// What to do with a matched request.
                    #[prost(oneof = "route::Action", tags = "2")]
                    pub action: Option<route::Action>,
                }

                /// Nested types for [`Route`].
                pub mod route {
                    /// Action taken on a matched request.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum Action {
                        /// Forward to an upstream cluster.
                        #[prost(message, tag = "2")]
                        Route(super::RouteAction),
                    }
                }

                /// Request matching criteria.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteMatch {
                    /// Path matching rule.
                    #[prost(oneof = "route_match::PathSpecifier", tags = "1, 2")]
                    pub path_specifier: Option<route_match::PathSpecifier>,
                }

                /// Nested types for [`RouteMatch`].
                pub mod route_match {
                    /// Path matching rule of a route.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum PathSpecifier {
                        /// Match on a path prefix.
                        #[prost(string, tag = "1")]
                        Prefix(String),
                        /// Match the exact path.
                        #[prost(string, tag = "2")]
                        Path(String),
                    }
                }

                /// Forwarding action.
                #[derive(Clone, PartialEq, ::prost::Message)]
                pub struct RouteAction {
                    /// Which cluster receives the request.
                    #[prost(oneof = "route_action::ClusterSpecifier", tags = "1")]
                    pub cluster_specifier: Option<route_action::ClusterSpecifier>,
                }

                /// Nested types for [`RouteAction`].
                pub mod route_action {
                    /// Which cluster receives a matched request.
                    #[derive(Clone, PartialEq, ::prost::Oneof)]
                    pub enum ClusterSpecifier {
                        /// Forward to the named cluster.
                        #[prost(string, tag = "1")]
                        Cluster(String),
                    }
                }
            }
        }
    }
}

pub mod google {
    //! Google API types.

    pub mod rpc {
        //! RPC status carried in NACKs.

        /// Error detail a client attaches when rejecting a response.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Status {
            /// Canonical status code.
            #[prost(int32, tag = "1")]
            pub code: i32,
            /// Developer-facing error message.
            #[prost(string, tag = "2")]
            pub message: String,
            /// Machine-readable detail payloads.
            #[prost(message, repeated, tag = "3")]
            pub details: Vec<::prost_types::Any>,
        }
    }
}
