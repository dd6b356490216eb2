//! Resource types shared across the orchestrator
//!
//! These mirror the provider's wire shapes closely enough that a real
//! facade implementation can serialize them as-is, while staying small
//! enough for the orchestrator to reason about.

use serde::{Deserialize, Serialize};

/// Protocol number for "all protocols" in security rules
pub const PROTOCOL_ALL: &str = "all";

/// Protocol number for TCP in security rules
pub const PROTOCOL_TCP: &str = "6";

/// Protocol number for ICMP in security rules
pub const PROTOCOL_ICMP: &str = "1";

/// The unrestricted CIDR block
pub const ANYWHERE: &str = "0.0.0.0/0";

/// Lifecycle states reported by the provider for clusters and node pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Resource creation is in progress
    Creating,
    /// Resource is fully provisioned and usable
    Active,
    /// Resource creation or operation failed terminally
    Failed,
    /// Resource is being updated
    Updating,
    /// Resource deletion is in progress
    Deleting,
    /// Resource has been deleted
    Deleted,
}

impl LifecycleState {
    /// Whether this state can never transition to another state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Active | Self::Failed | Self::Deleted)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// A virtual cloud network, the top-level isolated network container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vcn {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// CIDR block covering the whole network
    pub cidr_block: String,
    /// DNS label, if one was requested at creation
    pub dns_label: Option<String>,
    /// Route table every subnet uses unless it binds its own
    pub default_route_table_id: String,
    /// Security list every subnet uses unless it binds its own
    pub default_security_list_id: String,
}

/// Managed edge device providing a path to the public internet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternetGateway {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
}

/// Managed edge device providing outbound-only internet access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatGateway {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
}

/// Managed edge device providing access to provider-internal services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGateway {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
}

/// How a route or security rule's CIDR field should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CidrType {
    /// A literal CIDR block
    CidrBlock,
    /// A provider service CIDR label (e.g. the Oracle services network)
    ServiceCidrBlock,
}

/// One rule in a route table, directing traffic to a gateway by destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Destination CIDR block or service CIDR label
    pub destination: String,
    /// How `destination` is interpreted
    pub destination_type: CidrType,
    /// Gateway the matching traffic is sent to
    pub network_entity_id: String,
    /// Human-readable description
    pub description: Option<String>,
}

/// An ordered set of route rules attachable to subnets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// The rules, evaluated by longest-prefix match
    pub route_rules: Vec<RouteRule>,
}

/// An inclusive destination port range for TCP rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    /// Lowest port in the range
    pub min: u16,
    /// Highest port in the range
    pub max: u16,
}

impl PortRange {
    /// A range covering exactly one port
    pub fn single(port: u16) -> Self {
        Self {
            min: port,
            max: port,
        }
    }
}

/// TCP options on a security rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpOptions {
    /// Destination ports the rule applies to; None means all ports
    pub destination_port_range: Option<PortRange>,
}

/// ICMP options on a security rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcmpOptions {
    /// ICMP type
    pub icmp_type: u8,
    /// ICMP code, if the rule is restricted to one
    pub code: Option<u8>,
}

/// A stateless ingress allow-rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Protocol number, or "all"
    pub protocol: String,
    /// Source CIDR block or service CIDR label
    pub source: String,
    /// How `source` is interpreted
    pub source_type: CidrType,
    /// TCP port restriction, if any
    pub tcp_options: Option<TcpOptions>,
    /// ICMP type/code restriction, if any
    pub icmp_options: Option<IcmpOptions>,
    /// Human-readable description
    pub description: String,
}

/// A stateless egress allow-rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgressRule {
    /// Protocol number, or "all"
    pub protocol: String,
    /// Destination CIDR block or service CIDR label
    pub destination: String,
    /// How `destination` is interpreted
    pub destination_type: CidrType,
    /// TCP port restriction, if any
    pub tcp_options: Option<TcpOptions>,
    /// ICMP type/code restriction, if any
    pub icmp_options: Option<IcmpOptions>,
    /// Human-readable description
    pub description: String,
}

/// A named bundle of stateless allow-rules attachable to subnets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityList {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Inbound rules
    pub ingress_rules: Vec<IngressRule>,
    /// Outbound rules
    pub egress_rules: Vec<EgressRule>,
}

/// A subnet carved out of a VCN's CIDR block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// CIDR block, contained in the VCN's block
    pub cidr_block: String,
    /// Route table directing this subnet's traffic
    pub route_table_id: String,
    /// Security lists filtering this subnet's traffic
    pub security_list_ids: Vec<String>,
    /// Whether instances in this subnet are denied public IPs
    pub prohibit_public_ip_on_vnic: bool,
}

/// A provider-internal service reachable through a service gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    /// Provider-assigned identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// The well-known CIDR-block label for the service network
    pub cidr_block: String,
}

/// Network endpoint configuration for a cluster's Kubernetes API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Subnet hosting the API endpoint
    pub subnet_id: Option<String>,
    /// Whether the endpoint gets a public IP
    pub is_public_ip_enabled: bool,
    /// Network security groups attached to the endpoint
    pub nsg_ids: Vec<String>,
}

/// A managed Kubernetes control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Compartment the cluster lives in
    pub compartment_id: String,
    /// Desired Kubernetes version
    pub kubernetes_version: String,
    /// VCN the cluster is bound to
    pub vcn_id: String,
    /// API endpoint configuration
    pub endpoint_config: EndpointConfig,
    /// Current lifecycle state
    pub lifecycle_state: LifecycleState,
}

/// One (availability domain, subnet) pairing for node placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Availability domain instances may be placed in
    pub availability_domain: String,
    /// Subnet instances attach to in that domain
    pub subnet_id: String,
}

/// Shape-sizing override for flexible node shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeShapeConfig {
    /// CPU count override
    pub ocpus: f32,
    /// Memory override in gigabytes
    pub memory_in_gbs: f32,
}

/// A pool of worker nodes attached to a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePool {
    /// Provider-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Cluster the pool belongs to
    pub cluster_id: String,
    /// Compartment the pool lives in
    pub compartment_id: String,
    /// Kubernetes version the nodes run
    pub kubernetes_version: String,
    /// Compute shape of the nodes
    pub node_shape: String,
    /// Image the nodes boot from
    pub node_image_name: String,
    /// Desired node count
    pub size: u32,
    /// Where nodes may be placed, one entry per (domain, subnet) pair
    pub placement_configs: Vec<PlacementConfig>,
    /// Shape-sizing override, if one was requested
    pub node_shape_config: Option<NodeShapeConfig>,
    /// Current lifecycle state
    pub lifecycle_state: LifecycleState,
}

/// Status of an asynchronous work request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkRequestStatus {
    /// Accepted but not yet started
    Accepted,
    /// Currently executing
    InProgress,
    /// Completed successfully
    Succeeded,
    /// Completed with an error
    Failed,
    /// Cancellation requested
    Canceling,
    /// Cancelled before completion
    Canceled,
}

/// A resource affected by a work request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequestResource {
    /// Resource kind (e.g. "CLUSTER", "NODEPOOL")
    pub entity_type: String,
    /// Identifier of the affected resource
    pub identifier: String,
}

/// Asynchronous handle returned by create operations
///
/// Resolves to the target resource identifiers once finished. The
/// orchestrator treats the resource list as advisory: created clusters
/// and pools are re-resolved by name because the resource shapes here
/// are not guaranteed stable across provider versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRequest {
    /// Provider-assigned identifier
    pub id: String,
    /// What kind of operation this request tracks
    pub operation_type: String,
    /// Current status
    pub status: WorkRequestStatus,
    /// Resources the operation has touched so far
    pub resources: Vec<WorkRequestResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_state_wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&LifecycleState::Creating).unwrap();
        assert_eq!(json, "\"CREATING\"");
        let back: LifecycleState = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(back, LifecycleState::Active);
    }

    #[test]
    fn terminal_states() {
        assert!(LifecycleState::Active.is_terminal());
        assert!(LifecycleState::Failed.is_terminal());
        assert!(LifecycleState::Deleted.is_terminal());
        assert!(!LifecycleState::Creating.is_terminal());
        assert!(!LifecycleState::Deleting.is_terminal());
    }

    #[test]
    fn single_port_range() {
        let r = PortRange::single(6443);
        assert_eq!(r.min, 6443);
        assert_eq!(r.max, 6443);
    }
}
