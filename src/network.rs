//! Network topology builder
//!
//! Orchestrates creation of a VCN and its dependent networking resources
//! in strict dependency order: service CIDR lookup, VCN, internet gateway,
//! optional private routing (NAT gateway, service gateway, private route
//! table), security lists, best-effort adoption of the VCN's default
//! resources, and finally the three subnets.
//!
//! Each created top-level resource is appended to a [`ResourceLedger`] as
//! it comes into existence, so a failure partway through leaves behind an
//! inspectable record of what must be compensated instead of implicit
//! call-stack state. Any step failure aborts the remaining steps with
//! whatever provider error surfaced.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::{
    CreateGatewayRequest, CreateRouteTableRequest, CreateSecurityListRequest,
    CreateServiceGatewayRequest, CreateSubnetRequest, CreateVcnRequest,
    UpdateSecurityListRequest, VirtualNetwork,
};
use crate::model::{
    CidrType, InternetGateway, NatGateway, RouteRule, RouteTable, SecurityList, ServiceGateway,
    Subnet, Vcn, ANYWHERE,
};
use crate::{rules, Error, Result};
use crate::{ENDPOINT_SUBNET_CIDR, LB_SUBNET_CIDR, NODE_SUBNET_CIDR, VCN_CIDR};

/// Substring identifying the provider's "all services" CIDR label
const SERVICES_NETWORK_LABEL: &str = "services-in-oracle-services-network";

/// Maximum length of a VCN DNS label
const DNS_LABEL_MAX: usize = 15;

/// Kinds of top-level resources recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Virtual cloud network
    Vcn,
    /// Internet gateway
    InternetGateway,
    /// NAT gateway
    NatGateway,
    /// Service gateway
    ServiceGateway,
    /// Route table
    RouteTable,
    /// Security list
    SecurityList,
    /// Subnet
    Subnet,
}

/// One resource created during a provisioning attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResource {
    /// What kind of resource was created
    pub kind: ResourceKind,
    /// Its provider-assigned identifier
    pub id: String,
}

/// Ordered record of every resource a provisioning attempt has created.
///
/// The ledger is the rollback coordinator's source of truth: the VCN entry
/// (always first when present) is the one compensating deletion targets.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    entries: Vec<CreatedResource>,
}

impl ResourceLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created resource
    pub fn record(&mut self, kind: ResourceKind, id: impl Into<String>) {
        let id = id.into();
        debug!(kind = ?kind, id = %id, "recorded created resource");
        self.entries.push(CreatedResource { kind, id });
    }

    /// The VCN created in this attempt, if one exists yet
    pub fn vcn_id(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.kind == ResourceKind::Vcn)
            .map(|e| e.id.as_str())
    }

    /// All recorded resources, in creation order
    pub fn entries(&self) -> &[CreatedResource] {
        &self.entries
    }

    /// Whether nothing has been created yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The cohesive network record produced by a successful build.
///
/// Immutable once returned: every subnet references a route table and
/// security list created earlier in the same build, and the optional
/// members exist exactly when private worker placement was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// The VCN everything below lives in
    pub vcn: Vcn,
    /// Internet gateway, always created
    pub internet_gateway: InternetGateway,
    /// NAT gateway, only with private workers
    pub nat_gateway: Option<NatGateway>,
    /// Service gateway, only with private workers
    pub service_gateway: Option<ServiceGateway>,
    /// Private route table, only with private workers
    pub private_route_table: Option<RouteTable>,
    /// Security list for the worker-node subnet
    pub node_security_list: SecurityList,
    /// Security list for the API endpoint subnet
    pub endpoint_security_list: SecurityList,
    /// Load-balancer subnet
    pub lb_subnet: Subnet,
    /// Worker-node subnet
    pub node_subnet: Subnet,
    /// API endpoint subnet
    pub endpoint_subnet: Subnet,
}

/// What to build and where
#[derive(Debug, Clone)]
pub struct NetworkSpec {
    /// Compartment all resources are created in
    pub compartment_id: String,
    /// Base name resource display names are derived from
    pub base_name: String,
    /// Whether worker nodes are placed privately (adds NAT/service gateways)
    pub private_workers: bool,
    /// Whether the API endpoint gets a public IP
    pub public_endpoint: bool,
}

/// Builds a [`NetworkTopology`] through a fixed sequence of ordered steps
pub struct NetworkBuilder<'a> {
    vnet: &'a dyn VirtualNetwork,
    spec: NetworkSpec,
}

/// Private-worker routing resources created by step 4
struct PrivateRouting {
    nat_gateway: NatGateway,
    service_gateway: ServiceGateway,
    route_table: RouteTable,
}

impl<'a> NetworkBuilder<'a> {
    /// Create a builder over the given network facade
    pub fn new(vnet: &'a dyn VirtualNetwork, spec: NetworkSpec) -> Self {
        Self { vnet, spec }
    }

    /// Execute the ordered steps, recording every creation in `ledger`.
    ///
    /// On failure the ledger still reflects everything created so far;
    /// compensation is the rollback coordinator's job, not this builder's.
    pub async fn build(&self, ledger: &mut ResourceLedger) -> Result<NetworkTopology> {
        let name = &self.spec.base_name;
        info!(
            name = %name,
            private_workers = self.spec.private_workers,
            public_endpoint = self.spec.public_endpoint,
            "building network topology"
        );

        // Step 1: the service CIDR label everything service-bound refers to
        let services = self.resolve_services_network().await?;

        // Step 2: the VCN
        let vcn = self.create_vcn(ledger).await?;

        // Step 3: internet gateway, needed for the default route either way
        let internet_gateway = self.create_internet_gateway(&vcn, ledger).await?;

        // Step 4: private routing, only when workers are private
        let private = if self.spec.private_workers {
            Some(self.create_private_routing(&vcn, &services, ledger).await?)
        } else {
            None
        };

        // Step 5: the two security lists from the static bundles
        let node_security_list = self
            .create_security_list(
                &vcn,
                format!("{name}-node-seclist"),
                rules::node_seclist_rules(&services.cidr_block),
                ledger,
            )
            .await?;
        let endpoint_security_list = self
            .create_security_list(
                &vcn,
                format!("{name}-endpoint-seclist"),
                rules::k8s_api_endpoint_rules(&services.cidr_block),
                ledger,
            )
            .await?;

        // Step 6: adopt the VCN's default resources (best effort)
        self.adopt_default_resources(&vcn, &internet_gateway).await;

        // Step 7: the three subnets, now that routing and filtering exist
        let lb_subnet = self
            .create_subnet(CreateSubnetRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-lb-subnet"),
                cidr_block: LB_SUBNET_CIDR.to_string(),
                route_table_id: vcn.default_route_table_id.clone(),
                security_list_ids: vec![vcn.default_security_list_id.clone()],
                prohibit_public_ip_on_vnic: false,
            }, ledger)
            .await?;

        let node_route_table_id = private
            .as_ref()
            .map(|p| p.route_table.id.clone())
            .unwrap_or_else(|| vcn.default_route_table_id.clone());
        let node_subnet = self
            .create_subnet(CreateSubnetRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-node-subnet"),
                cidr_block: NODE_SUBNET_CIDR.to_string(),
                route_table_id: node_route_table_id,
                security_list_ids: vec![node_security_list.id.clone()],
                prohibit_public_ip_on_vnic: self.spec.private_workers,
            }, ledger)
            .await?;

        let endpoint_subnet = self
            .create_subnet(CreateSubnetRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-endpoint-subnet"),
                cidr_block: ENDPOINT_SUBNET_CIDR.to_string(),
                route_table_id: vcn.default_route_table_id.clone(),
                security_list_ids: vec![endpoint_security_list.id.clone()],
                prohibit_public_ip_on_vnic: !self.spec.public_endpoint,
            }, ledger)
            .await?;

        info!(vcn = %vcn.id, "network topology complete");

        let (nat_gateway, service_gateway, private_route_table) = match private {
            Some(p) => (Some(p.nat_gateway), Some(p.service_gateway), Some(p.route_table)),
            None => (None, None, None),
        };

        Ok(NetworkTopology {
            vcn,
            internet_gateway,
            nat_gateway,
            service_gateway,
            private_route_table,
            node_security_list,
            endpoint_security_list,
            lb_subnet,
            node_subnet,
            endpoint_subnet,
        })
    }

    /// Step 1: resolve the provider's "all services" network by its
    /// well-known CIDR-block label.
    async fn resolve_services_network(&self) -> Result<crate::model::ServiceSummary> {
        let services = self.vnet.list_services().await?;
        services
            .into_iter()
            .find(|s| s.cidr_block.contains(SERVICES_NETWORK_LABEL))
            .ok_or_else(|| Error::not_found("services network", SERVICES_NETWORK_LABEL))
    }

    /// Step 2: create the VCN with the fixed /16 block
    async fn create_vcn(&self, ledger: &mut ResourceLedger) -> Result<Vcn> {
        let vcn = self
            .vnet
            .create_vcn(CreateVcnRequest {
                compartment_id: self.spec.compartment_id.clone(),
                display_name: format!("{}-vcn", self.spec.base_name),
                cidr_block: VCN_CIDR.to_string(),
                dns_label: dns_label(&self.spec.base_name),
            })
            .await?;
        ledger.record(ResourceKind::Vcn, &vcn.id);
        Ok(vcn)
    }

    /// Step 3: create the internet gateway
    async fn create_internet_gateway(
        &self,
        vcn: &Vcn,
        ledger: &mut ResourceLedger,
    ) -> Result<InternetGateway> {
        let igw = self
            .vnet
            .create_internet_gateway(CreateGatewayRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{}-igw", self.spec.base_name),
            })
            .await?;
        ledger.record(ResourceKind::InternetGateway, &igw.id);
        Ok(igw)
    }

    /// Step 4: NAT gateway, service gateway and the private route table
    /// that sends default traffic via NAT and service traffic via the
    /// service gateway.
    async fn create_private_routing(
        &self,
        vcn: &Vcn,
        services: &crate::model::ServiceSummary,
        ledger: &mut ResourceLedger,
    ) -> Result<PrivateRouting> {
        let name = &self.spec.base_name;

        let nat_gateway = self
            .vnet
            .create_nat_gateway(CreateGatewayRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-natgw"),
            })
            .await?;
        ledger.record(ResourceKind::NatGateway, &nat_gateway.id);

        let service_gateway = self
            .vnet
            .create_service_gateway(CreateServiceGatewayRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-sgw"),
                service_id: services.id.clone(),
            })
            .await?;
        ledger.record(ResourceKind::ServiceGateway, &service_gateway.id);

        let route_table = self
            .vnet
            .create_route_table(CreateRouteTableRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name: format!("{name}-private-rt"),
                route_rules: vec![
                    RouteRule {
                        destination: ANYWHERE.to_string(),
                        destination_type: CidrType::CidrBlock,
                        network_entity_id: nat_gateway.id.clone(),
                        description: Some("traffic to the internet".to_string()),
                    },
                    RouteRule {
                        destination: services.cidr_block.clone(),
                        destination_type: CidrType::ServiceCidrBlock,
                        network_entity_id: service_gateway.id.clone(),
                        description: Some("traffic to OCI services".to_string()),
                    },
                ],
            })
            .await?;
        ledger.record(ResourceKind::RouteTable, &route_table.id);

        Ok(PrivateRouting {
            nat_gateway,
            service_gateway,
            route_table,
        })
    }

    /// Step 5 helper: create one security list from a rule bundle
    async fn create_security_list(
        &self,
        vcn: &Vcn,
        display_name: String,
        bundle: (Vec<crate::model::IngressRule>, Vec<crate::model::EgressRule>),
        ledger: &mut ResourceLedger,
    ) -> Result<SecurityList> {
        let (ingress_rules, egress_rules) = bundle;
        let list = self
            .vnet
            .create_security_list(CreateSecurityListRequest {
                compartment_id: self.spec.compartment_id.clone(),
                vcn_id: vcn.id.clone(),
                display_name,
                ingress_rules,
                egress_rules,
            })
            .await?;
        ledger.record(ResourceKind::SecurityList, &list.id);
        Ok(list)
    }

    /// Step 6: rename the VCN's default security list (it serves the LB
    /// subnet) and point the default route table's default route at the
    /// internet gateway.
    ///
    /// Both updates touch shared default resources the provider created
    /// with the VCN; they are not separately rolled back, and a failure
    /// here does not abort the build.
    async fn adopt_default_resources(&self, vcn: &Vcn, igw: &InternetGateway) {
        let name = &self.spec.base_name;

        if let Err(e) = self
            .vnet
            .update_security_list(
                &vcn.default_security_list_id,
                UpdateSecurityListRequest {
                    display_name: Some(format!("{name}-lb-seclist")),
                    ingress_rules: None,
                    egress_rules: None,
                },
            )
            .await
        {
            warn!(error = %e, "failed to rename default security list, continuing");
        }

        if let Err(e) = self
            .vnet
            .update_route_table(
                &vcn.default_route_table_id,
                vec![RouteRule {
                    destination: ANYWHERE.to_string(),
                    destination_type: CidrType::CidrBlock,
                    network_entity_id: igw.id.clone(),
                    description: Some("traffic to/from the internet".to_string()),
                }],
            )
            .await
        {
            warn!(error = %e, "failed to rewrite default route table, continuing");
        }
    }

    /// Step 7 helper: create one subnet
    async fn create_subnet(
        &self,
        req: CreateSubnetRequest,
        ledger: &mut ResourceLedger,
    ) -> Result<Subnet> {
        let subnet = self.vnet.create_subnet(req).await?;
        ledger.record(ResourceKind::Subnet, &subnet.id);
        Ok(subnet)
    }
}

/// Derive a VCN DNS label from a base name: alphanumeric characters only,
/// lowercased, truncated to the provider's 15-character limit.
fn dns_label(base_name: &str) -> Option<String> {
    let label: String = base_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(DNS_LABEL_MAX)
        .collect();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockVirtualNetwork;
    use crate::model::ServiceSummary;

    const COMPARTMENT: &str = "ocid1.compartment.test";
    const SERVICE_LABEL: &str = "all-iad-services-in-oracle-services-network";

    fn spec(private_workers: bool, public_endpoint: bool) -> NetworkSpec {
        NetworkSpec {
            compartment_id: COMPARTMENT.to_string(),
            base_name: "demo".to_string(),
            private_workers,
            public_endpoint,
        }
    }

    fn sample_vcn() -> Vcn {
        Vcn {
            id: "ocid1.vcn.1".into(),
            display_name: "demo-vcn".into(),
            cidr_block: VCN_CIDR.into(),
            dns_label: Some("demo".into()),
            default_route_table_id: "ocid1.routetable.default".into(),
            default_security_list_id: "ocid1.securitylist.default".into(),
        }
    }

    /// Expectations for steps 1 through 5 (service lookup through
    /// security lists); step 6 and subnet behavior are added per test.
    fn creation_mock() -> MockVirtualNetwork {
        let mut vnet = MockVirtualNetwork::new();
        vnet.expect_list_services().returning(|| {
            Ok(vec![ServiceSummary {
                id: "ocid1.service.all".into(),
                name: "All IAD Services In Oracle Services Network".into(),
                cidr_block: SERVICE_LABEL.into(),
            }])
        });
        vnet.expect_create_vcn().returning(|_| Ok(sample_vcn()));
        vnet.expect_create_internet_gateway().returning(|req| {
            Ok(InternetGateway {
                id: "ocid1.internetgateway.1".into(),
                display_name: req.display_name,
            })
        });
        vnet.expect_create_nat_gateway().returning(|req| {
            Ok(NatGateway {
                id: "ocid1.natgateway.1".into(),
                display_name: req.display_name,
            })
        });
        vnet.expect_create_service_gateway().returning(|req| {
            Ok(ServiceGateway {
                id: "ocid1.servicegateway.1".into(),
                display_name: req.display_name,
            })
        });
        vnet.expect_create_route_table().returning(|req| {
            Ok(RouteTable {
                id: "ocid1.routetable.private".into(),
                display_name: req.display_name,
                route_rules: req.route_rules,
            })
        });
        vnet.expect_create_security_list().returning(|req| {
            Ok(SecurityList {
                id: format!("ocid1.securitylist.{}", req.display_name),
                display_name: req.display_name,
                ingress_rules: req.ingress_rules,
                egress_rules: req.egress_rules,
            })
        });
        vnet
    }

    fn expect_default_adoption(vnet: &mut MockVirtualNetwork) {
        vnet.expect_update_security_list().returning(|id, _| {
            Ok(SecurityList {
                id: id.to_string(),
                display_name: "demo-lb-seclist".into(),
                ingress_rules: vec![],
                egress_rules: vec![],
            })
        });
        vnet.expect_update_route_table().returning(|id, rules| {
            Ok(RouteTable {
                id: id.to_string(),
                display_name: "default".into(),
                route_rules: rules,
            })
        });
    }

    fn expect_subnets(vnet: &mut MockVirtualNetwork) {
        vnet.expect_create_subnet().returning(|req| {
            Ok(Subnet {
                id: format!("ocid1.subnet.{}", req.display_name),
                display_name: req.display_name,
                cidr_block: req.cidr_block,
                route_table_id: req.route_table_id,
                security_list_ids: req.security_list_ids,
                prohibit_public_ip_on_vnic: req.prohibit_public_ip_on_vnic,
            })
        });
    }

    /// Mock whose expectations cover every step of the build
    fn happy_mock() -> MockVirtualNetwork {
        let mut vnet = creation_mock();
        expect_default_adoption(&mut vnet);
        expect_subnets(&mut vnet);
        vnet
    }

    #[tokio::test]
    async fn private_workers_build_creates_nat_service_gateway_and_private_table() {
        let vnet = happy_mock();
        let mut ledger = ResourceLedger::new();
        let topology = NetworkBuilder::new(&vnet, spec(true, true))
            .build(&mut ledger)
            .await
            .expect("build should succeed");

        assert!(topology.nat_gateway.is_some());
        assert!(topology.service_gateway.is_some());
        let rt = topology.private_route_table.as_ref().expect("private table");
        assert_eq!(rt.route_rules.len(), 2);

        // Worker subnet routes through the private table, no public IPs
        assert_eq!(topology.node_subnet.route_table_id, rt.id);
        assert!(topology.node_subnet.prohibit_public_ip_on_vnic);
    }

    #[tokio::test]
    async fn public_workers_build_skips_private_routing() {
        let vnet = happy_mock();
        let mut ledger = ResourceLedger::new();
        let topology = NetworkBuilder::new(&vnet, spec(false, true))
            .build(&mut ledger)
            .await
            .expect("build should succeed");

        assert!(topology.nat_gateway.is_none());
        assert!(topology.service_gateway.is_none());
        assert!(topology.private_route_table.is_none());

        // Worker subnet falls back to the VCN's default route table
        assert_eq!(
            topology.node_subnet.route_table_id,
            topology.vcn.default_route_table_id
        );
        assert!(!topology.node_subnet.prohibit_public_ip_on_vnic);
    }

    #[tokio::test]
    async fn exactly_three_disjoint_subnets_are_created() {
        let vnet = happy_mock();
        let mut ledger = ResourceLedger::new();
        let topology = NetworkBuilder::new(&vnet, spec(false, true))
            .build(&mut ledger)
            .await
            .expect("build should succeed");

        assert_eq!(topology.lb_subnet.cidr_block, LB_SUBNET_CIDR);
        assert_eq!(topology.node_subnet.cidr_block, NODE_SUBNET_CIDR);
        assert_eq!(topology.endpoint_subnet.cidr_block, ENDPOINT_SUBNET_CIDR);

        let subnet_count = ledger
            .entries()
            .iter()
            .filter(|e| e.kind == ResourceKind::Subnet)
            .count();
        assert_eq!(subnet_count, 3);
    }

    #[tokio::test]
    async fn private_endpoint_prohibits_public_ip() {
        let vnet = happy_mock();
        let mut ledger = ResourceLedger::new();
        let topology = NetworkBuilder::new(&vnet, spec(false, false))
            .build(&mut ledger)
            .await
            .expect("build should succeed");

        assert!(topology.endpoint_subnet.prohibit_public_ip_on_vnic);
    }

    #[tokio::test]
    async fn ledger_records_vcn_first_in_creation_order() {
        let vnet = happy_mock();
        let mut ledger = ResourceLedger::new();
        NetworkBuilder::new(&vnet, spec(true, true))
            .build(&mut ledger)
            .await
            .expect("build should succeed");

        let entries = ledger.entries();
        assert_eq!(entries[0].kind, ResourceKind::Vcn);
        assert_eq!(ledger.vcn_id(), Some("ocid1.vcn.1"));
        // vcn, igw, nat, sgw, private rt, 2 seclists, 3 subnets
        assert_eq!(entries.len(), 10);
    }

    #[tokio::test]
    async fn missing_services_network_is_a_resolution_error() {
        let mut vnet = MockVirtualNetwork::new();
        vnet.expect_list_services().returning(|| Ok(vec![]));

        let mut ledger = ResourceLedger::new();
        let err = NetworkBuilder::new(&vnet, spec(false, true))
            .build(&mut ledger)
            .await
            .expect_err("build should fail");

        assert!(matches!(err, Error::NotFound { .. }));
        // Nothing was created, so there is nothing to compensate
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn subnet_failure_leaves_vcn_in_ledger() {
        let mut vnet = creation_mock();
        expect_default_adoption(&mut vnet);
        vnet.expect_create_subnet()
            .returning(|_| Err(Error::provider("createSubnet", 409, "conflict")));

        let mut ledger = ResourceLedger::new();
        let err = NetworkBuilder::new(&vnet, spec(false, true))
            .build(&mut ledger)
            .await
            .expect_err("build should fail");

        assert!(matches!(err, Error::Provider { .. }));
        assert_eq!(ledger.vcn_id(), Some("ocid1.vcn.1"));
    }

    #[tokio::test]
    async fn default_resource_updates_are_best_effort() {
        let mut vnet = creation_mock();
        vnet.expect_update_security_list()
            .returning(|_, _| Err(Error::provider("updateSecurityList", 500, "oops")));
        vnet.expect_update_route_table()
            .returning(|_, _| Err(Error::provider("updateRouteTable", 500, "oops")));
        expect_subnets(&mut vnet);

        let mut ledger = ResourceLedger::new();
        let result = NetworkBuilder::new(&vnet, spec(false, true))
            .build(&mut ledger)
            .await;

        assert!(result.is_ok(), "step 6 failures must not abort the build");
    }

    #[test]
    fn dns_label_sanitizes_and_truncates() {
        assert_eq!(dns_label("demo"), Some("demo".into()));
        assert_eq!(dns_label("My-Cluster_01"), Some("mycluster01".into()));
        assert_eq!(
            dns_label("averyverylongclustername"),
            Some("averyverylongcl".into())
        );
        assert_eq!(dns_label("---"), None);
    }
}
