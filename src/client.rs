//! Facade traits for the provider's network and container engine APIs
//!
//! Provides a trait-based abstraction over the cloud provider, allowing
//! tests to mock provider interactions while production code wires in an
//! authenticated client. Credential construction lives behind these traits
//! and is not this crate's concern; the orchestrator assumes reliable
//! request/response semantics with provider-side error codes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::model::{
    Cluster, EgressRule, EndpointConfig, IngressRule, InternetGateway, NatGateway, NodePool,
    NodeShapeConfig, PlacementConfig, RouteRule, RouteTable, SecurityList, ServiceGateway,
    ServiceSummary, Subnet, Vcn, WorkRequest,
};
use crate::Result;

/// Byte stream carrying kubeconfig content as it arrives from the provider
pub type KubeconfigStream = BoxStream<'static, Result<Bytes>>;

/// Request to create a VCN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateVcnRequest {
    /// Compartment to create the VCN in
    pub compartment_id: String,
    /// Display name
    pub display_name: String,
    /// CIDR block for the whole network
    pub cidr_block: String,
    /// DNS label, at most 15 alphanumeric characters
    pub dns_label: Option<String>,
}

/// Request to create an internet or NAT gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGatewayRequest {
    /// Compartment to create the gateway in
    pub compartment_id: String,
    /// VCN the gateway attaches to
    pub vcn_id: String,
    /// Display name
    pub display_name: String,
}

/// Request to create a service gateway bound to a provider service network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServiceGatewayRequest {
    /// Compartment to create the gateway in
    pub compartment_id: String,
    /// VCN the gateway attaches to
    pub vcn_id: String,
    /// Display name
    pub display_name: String,
    /// The provider service the gateway grants access to
    pub service_id: String,
}

/// Request to create a route table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRouteTableRequest {
    /// Compartment to create the table in
    pub compartment_id: String,
    /// VCN the table belongs to
    pub vcn_id: String,
    /// Display name
    pub display_name: String,
    /// Initial rules
    pub route_rules: Vec<RouteRule>,
}

/// Request to create a security list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSecurityListRequest {
    /// Compartment to create the list in
    pub compartment_id: String,
    /// VCN the list belongs to
    pub vcn_id: String,
    /// Display name
    pub display_name: String,
    /// Inbound rules
    pub ingress_rules: Vec<IngressRule>,
    /// Outbound rules
    pub egress_rules: Vec<EgressRule>,
}

/// Partial update to an existing security list; None fields are untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSecurityListRequest {
    /// New display name
    pub display_name: Option<String>,
    /// Replacement inbound rules
    pub ingress_rules: Option<Vec<IngressRule>>,
    /// Replacement outbound rules
    pub egress_rules: Option<Vec<EgressRule>>,
}

/// Request to create a subnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSubnetRequest {
    /// Compartment to create the subnet in
    pub compartment_id: String,
    /// VCN the subnet is carved from
    pub vcn_id: String,
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

/// Kubernetes network configuration nested in a cluster create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesNetworkConfig {
    /// CIDR block for pod IPs
    pub pods_cidr: String,
    /// CIDR block for service IPs
    pub services_cidr: String,
}

/// Optional settings nested in a cluster create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCreateOptions {
    /// Subnets load balancers for in-cluster services are placed in
    pub service_lb_subnet_ids: Vec<String>,
    /// Pod and service CIDR configuration
    pub kubernetes_network_config: KubernetesNetworkConfig,
}

/// Request to create a cluster control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClusterRequest {
    /// Compartment to create the cluster in
    pub compartment_id: String,
    /// Display name
    pub name: String,
    /// Kubernetes version, canonical `v`-prefixed form
    pub kubernetes_version: String,
    /// VCN the cluster is bound to
    pub vcn_id: String,
    /// API endpoint configuration
    pub endpoint_config: EndpointConfig,
    /// LB subnets and network CIDRs
    pub options: ClusterCreateOptions,
}

/// Node configuration nested in a node pool create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePoolPlacementDetails {
    /// Desired node count
    pub size: u32,
    /// Network security groups attached to the nodes
    pub nsg_ids: Vec<String>,
    /// Where nodes may be placed
    pub placement_configs: Vec<PlacementConfig>,
}

/// Request to create a node pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodePoolRequest {
    /// Compartment to create the pool in
    pub compartment_id: String,
    /// Cluster the pool attaches to
    pub cluster_id: String,
    /// Display name
    pub name: String,
    /// Kubernetes version, canonical `v`-prefixed form
    pub kubernetes_version: String,
    /// Compute shape of the nodes
    pub node_shape: String,
    /// Image the nodes boot from
    pub node_image_name: String,
    /// Size, NSGs and placement
    pub node_config_details: NodePoolPlacementDetails,
    /// Shape-sizing override; both fields or nothing
    pub node_shape_config: Option<NodeShapeConfig>,
}

/// Which endpoint the generated kubeconfig should target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KubeconfigEndpointType {
    /// The cluster's public API endpoint
    PublicEndpoint,
    /// The cluster's private API endpoint
    PrivateEndpoint,
}

/// Request for kubeconfig content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateKubeconfigRequest {
    /// Endpoint the kubeconfig should target
    pub endpoint: KubeconfigEndpointType,
    /// Token version baked into the kubeconfig
    pub token_version: String,
}

impl Default for CreateKubeconfigRequest {
    fn default() -> Self {
        Self {
            endpoint: KubeconfigEndpointType::PublicEndpoint,
            token_version: "2.0.0".to_string(),
        }
    }
}

/// Trait abstracting the provider's virtual network operations
///
/// Mirrors the provider API one method per operation so mocks can assert
/// exactly which calls the orchestrator issues and in which order.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VirtualNetwork: Send + Sync {
    /// Create a VCN
    async fn create_vcn(&self, req: CreateVcnRequest) -> Result<Vcn>;

    /// Create an internet gateway in a VCN
    async fn create_internet_gateway(&self, req: CreateGatewayRequest) -> Result<InternetGateway>;

    /// Create a NAT gateway in a VCN
    async fn create_nat_gateway(&self, req: CreateGatewayRequest) -> Result<NatGateway>;

    /// Create a service gateway bound to a provider service network
    async fn create_service_gateway(
        &self,
        req: CreateServiceGatewayRequest,
    ) -> Result<ServiceGateway>;

    /// Create a route table
    async fn create_route_table(&self, req: CreateRouteTableRequest) -> Result<RouteTable>;

    /// Replace the rules of an existing route table
    async fn update_route_table(
        &self,
        route_table_id: &str,
        route_rules: Vec<RouteRule>,
    ) -> Result<RouteTable>;

    /// Create a security list
    async fn create_security_list(&self, req: CreateSecurityListRequest) -> Result<SecurityList>;

    /// Update an existing security list
    async fn update_security_list(
        &self,
        security_list_id: &str,
        req: UpdateSecurityListRequest,
    ) -> Result<SecurityList>;

    /// Create a subnet
    async fn create_subnet(&self, req: CreateSubnetRequest) -> Result<Subnet>;

    /// Delete a VCN. The provider cascades deletion to dependent resources.
    async fn delete_vcn(&self, vcn_id: &str) -> Result<()>;

    /// List the provider-internal services usable through a service gateway
    async fn list_services(&self) -> Result<Vec<ServiceSummary>>;
}

/// Trait abstracting the provider's container engine operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create a cluster control plane; returns the work request id
    async fn create_cluster(&self, req: CreateClusterRequest) -> Result<String>;

    /// Fetch a cluster by id
    async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster>;

    /// List clusters in a compartment
    async fn list_clusters(&self, compartment_id: &str) -> Result<Vec<Cluster>>;

    /// Create a node pool; returns the work request id
    async fn create_node_pool(&self, req: CreateNodePoolRequest) -> Result<String>;

    /// List node pools in a compartment
    async fn list_node_pools(&self, compartment_id: &str) -> Result<Vec<NodePool>>;

    /// Stream kubeconfig content for a cluster
    async fn create_kubeconfig(
        &self,
        cluster_id: &str,
        req: CreateKubeconfigRequest,
    ) -> Result<KubeconfigStream>;

    /// Fetch a work request by id
    async fn get_work_request(&self, work_request_id: &str) -> Result<WorkRequest>;
}
