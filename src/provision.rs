//! Top-level provisioning orchestrator
//!
//! [`Provisioner`] is the crate's entry point: it owns the provider
//! facades, the reference resolver for human-supplied parameters, the
//! wait configuration and the cancellation signal, and exposes the four
//! operations callers drive. Raw parameters are resolved at this boundary;
//! everything below works with provider identifiers only.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{
    ContainerEngine, CreateKubeconfigRequest, KubeconfigEndpointType, VirtualNetwork,
};
use crate::cluster::{self, ClusterOutcome, ClusterSpec, WorkerSpec};
use crate::error::PartialOutcome;
use crate::kubeconfig::{self, KubeconfigOutcome};
use crate::model::{Cluster, NodePool};
use crate::network::{NetworkBuilder, NetworkSpec, NetworkTopology, ResourceLedger};
use crate::nodepool::{self, NodePoolSpec};
use crate::resolver::{LiteralResolver, ReferenceResolver};
use crate::rollback;
use crate::waiter::WaitConfig;
use crate::{
    Error, Result, DEFAULT_KUBERNETES_VERSION, DEFAULT_PODS_CIDR, DEFAULT_SERVICES_CIDR,
};

/// Account-level settings every operation may fall back to
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Root compartment, used when a call omits its compartment
    pub tenancy_id: String,
    /// Provider region the facades are bound to
    pub region: String,
}

/// Parameters for creating a standalone node pool.
///
/// Multi-valued fields hold raw values the resolver expands; with the
/// default resolver they are comma lists.
#[derive(Debug, Clone)]
pub struct NodePoolParams {
    /// Compartment, falling back to the tenancy when absent
    pub compartment_id: Option<String>,
    /// Cluster the pool attaches to
    pub cluster_id: String,
    /// Display name
    pub name: String,
    /// Kubernetes version, any accepted form
    pub kubernetes_version: String,
    /// Compute shape of the nodes
    pub node_shape: String,
    /// Image the nodes boot from
    pub node_image_name: String,
    /// Desired node count
    pub size: u32,
    /// Raw multi-valued network security groups
    pub nsg_ids: String,
    /// Raw multi-valued availability domains
    pub availability_domains: String,
    /// Raw multi-valued subnets, paired index-wise with the domains
    pub subnet_ids: String,
    /// CPU override for flexible shapes
    pub ocpus: Option<f32>,
    /// Memory override in gigabytes for flexible shapes
    pub memory_in_gbs: Option<f32>,
}

/// Worker pool parameters nested in a cluster create
#[derive(Debug, Clone)]
pub struct WorkerParams {
    /// Compute shape of the nodes
    pub node_shape: String,
    /// Image the nodes boot from
    pub node_image_name: String,
    /// Desired node count
    pub size: u32,
    /// Raw multi-valued network security groups
    pub nsg_ids: String,
    /// Raw multi-valued availability domains
    pub availability_domains: String,
    /// Raw multi-valued subnets, paired index-wise with the domains
    pub subnet_ids: String,
    /// CPU override for flexible shapes
    pub ocpus: Option<f32>,
    /// Memory override in gigabytes for flexible shapes
    pub memory_in_gbs: Option<f32>,
}

/// Parameters for creating a cluster on an existing network
#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// Compartment, falling back to the tenancy when absent
    pub compartment_id: Option<String>,
    /// Display name
    pub name: String,
    /// Kubernetes version, any accepted form
    pub kubernetes_version: String,
    /// VCN the cluster is bound to
    pub vcn_id: String,
    /// Subnet hosting the API endpoint
    pub endpoint_subnet_id: Option<String>,
    /// Whether the API endpoint gets a public IP
    pub public_endpoint: bool,
    /// Raw multi-valued network security groups for the endpoint
    pub endpoint_nsg_ids: String,
    /// Raw multi-valued load-balancer subnets
    pub service_lb_subnet_ids: String,
    /// CIDR block for pod IPs, defaulted when absent
    pub pods_cidr: Option<String>,
    /// CIDR block for service IPs, defaulted when absent
    pub services_cidr: Option<String>,
    /// Initial worker pool, when one should be attached
    pub workers: Option<WorkerParams>,
    /// Whether to block until the cluster reaches ACTIVE
    pub wait_for_active: bool,
}

/// Parameters for persisting a cluster's kubeconfig
#[derive(Debug, Clone)]
pub struct KubeconfigParams {
    /// Cluster to fetch the kubeconfig for
    pub cluster_id: String,
    /// File to write it to
    pub path: PathBuf,
    /// Endpoint the kubeconfig should target
    pub endpoint: KubeconfigEndpointType,
}

/// Parameters for the one-call network-plus-cluster create
#[derive(Debug, Clone)]
pub struct QuickCreateParams {
    /// Compartment, falling back to the tenancy when absent
    pub compartment_id: Option<String>,
    /// Base name for the cluster and every derived resource
    pub name: String,
    /// Kubernetes version, any accepted form
    pub kubernetes_version: String,
    /// Whether worker nodes get public IPs
    pub public_workers: bool,
    /// Whether the API endpoint gets a public IP
    pub public_endpoint: bool,
    /// Compute shape of the nodes
    pub node_shape: String,
    /// Image the nodes boot from
    pub node_image_name: String,
    /// Desired node count
    pub node_count: u32,
    /// Raw multi-valued availability domains
    pub availability_domains: String,
    /// CPU override for flexible shapes
    pub ocpus: Option<f32>,
    /// Memory override in gigabytes for flexible shapes
    pub memory_in_gbs: Option<f32>,
    /// Whether to block until the cluster reaches ACTIVE
    pub wait_for_active: bool,
}

/// What a quick create produced
#[derive(Debug, Clone)]
pub struct QuickCreateOutcome {
    /// The network everything was placed in
    pub network: NetworkTopology,
    /// The created cluster
    pub cluster: Cluster,
    /// The initial worker pool
    pub node_pool: Option<NodePool>,
}

/// Orchestrates provisioning operations against one provider account
pub struct Provisioner {
    config: ProvisionerConfig,
    vnet: Arc<dyn VirtualNetwork>,
    engine: Arc<dyn ContainerEngine>,
    resolver: Arc<dyn ReferenceResolver>,
    wait: WaitConfig,
    cancel: CancellationToken,
}

impl Provisioner {
    /// Create a provisioner over the given facades with the literal
    /// resolver, default wait configuration and no external cancellation.
    pub fn new(
        config: ProvisionerConfig,
        vnet: Arc<dyn VirtualNetwork>,
        engine: Arc<dyn ContainerEngine>,
    ) -> Self {
        info!(region = %config.region, "provisioner ready");
        Self {
            config,
            vnet,
            engine,
            resolver: Arc::new(LiteralResolver),
            wait: WaitConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the reference resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the wait configuration
    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    /// Attach a cancellation token honored by completion waits
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create a node pool on an existing cluster
    pub async fn create_node_pool(&self, params: NodePoolParams) -> Result<NodePool> {
        let spec = NodePoolSpec {
            compartment_id: self.compartment_or_tenancy(params.compartment_id.as_deref()),
            cluster_id: self.resolve_required("cluster_id", &params.cluster_id)?,
            name: params.name,
            kubernetes_version: version_or_default(&params.kubernetes_version),
            node_shape: params.node_shape,
            node_image_name: params.node_image_name,
            size: params.size,
            nsg_ids: self.resolver.resolve_multi(&params.nsg_ids),
            availability_domains: self.resolver.resolve_multi(&params.availability_domains),
            subnet_ids: self.resolver.resolve_multi(&params.subnet_ids),
            ocpus: params.ocpus,
            memory_in_gbs: params.memory_in_gbs,
        };
        nodepool::provision_node_pool(self.engine.as_ref(), &spec).await
    }

    /// Create a cluster on an existing network, optionally with an
    /// initial worker pool
    pub async fn create_cluster(&self, params: ClusterParams) -> Result<ClusterOutcome> {
        let spec = ClusterSpec {
            compartment_id: self.compartment_or_tenancy(params.compartment_id.as_deref()),
            name: params.name,
            kubernetes_version: version_or_default(&params.kubernetes_version),
            vcn_id: self.resolve_required("vcn_id", &params.vcn_id)?,
            endpoint_subnet_id: params
                .endpoint_subnet_id
                .as_deref()
                .and_then(|raw| self.resolver.resolve(raw)),
            public_endpoint: params.public_endpoint,
            endpoint_nsg_ids: self.resolver.resolve_multi(&params.endpoint_nsg_ids),
            service_lb_subnet_ids: self.resolver.resolve_multi(&params.service_lb_subnet_ids),
            pods_cidr: params
                .pods_cidr
                .unwrap_or_else(|| DEFAULT_PODS_CIDR.to_string()),
            services_cidr: params
                .services_cidr
                .unwrap_or_else(|| DEFAULT_SERVICES_CIDR.to_string()),
            wait_for_active: params.wait_for_active,
        };
        let workers = params.workers.map(|w| self.resolve_workers(w));
        cluster::provision_cluster(
            self.engine.as_ref(),
            &spec,
            workers.as_ref(),
            self.wait,
            &self.cancel,
        )
        .await
    }

    /// Fetch a cluster's kubeconfig and write it to a local file
    pub async fn create_cluster_kubeconfig(
        &self,
        params: KubeconfigParams,
    ) -> Result<KubeconfigOutcome> {
        let cluster_id = self.resolve_required("cluster_id", &params.cluster_id)?;
        let request = CreateKubeconfigRequest {
            endpoint: params.endpoint,
            ..CreateKubeconfigRequest::default()
        };
        let stream = self.engine.create_kubeconfig(&cluster_id, request).await?;
        kubeconfig::write_kubeconfig(stream, &params.path).await
    }

    /// Build a dedicated network and a cluster with workers inside it in
    /// one call. A failure after the network exists rolls the network
    /// back; the error still describes everything created before the
    /// failure.
    pub async fn quick_create_cluster(
        &self,
        params: QuickCreateParams,
    ) -> Result<QuickCreateOutcome> {
        let mut ledger = ResourceLedger::new();
        let result = self.quick_create_inner(params, &mut ledger).await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let report = rollback::compensate(self.vnet.as_ref(), &ledger).await;
                if report.needs_manual_cleanup() {
                    warn!(
                        resources = ledger.entries().len(),
                        "rollback incomplete, created resources remain"
                    );
                }
                Err(e)
            }
        }
    }

    async fn quick_create_inner(
        &self,
        params: QuickCreateParams,
        ledger: &mut ResourceLedger,
    ) -> Result<QuickCreateOutcome> {
        let compartment_id = self.compartment_or_tenancy(params.compartment_id.as_deref());
        let availability_domains = self.resolver.resolve_multi(&params.availability_domains);

        let network_spec = NetworkSpec {
            compartment_id: compartment_id.clone(),
            base_name: params.name.clone(),
            private_workers: !params.public_workers,
            public_endpoint: params.public_endpoint,
        };
        let topology = NetworkBuilder::new(self.vnet.as_ref(), network_spec)
            .build(ledger)
            .await?;

        let cluster_spec = ClusterSpec {
            compartment_id,
            name: params.name,
            kubernetes_version: version_or_default(&params.kubernetes_version),
            vcn_id: topology.vcn.id.clone(),
            endpoint_subnet_id: Some(topology.endpoint_subnet.id.clone()),
            // The cluster's endpoint public-IP flag follows worker
            // visibility; public_endpoint only governs the endpoint subnet
            public_endpoint: params.public_workers,
            endpoint_nsg_ids: vec![],
            service_lb_subnet_ids: vec![topology.lb_subnet.id.clone()],
            pods_cidr: DEFAULT_PODS_CIDR.to_string(),
            services_cidr: DEFAULT_SERVICES_CIDR.to_string(),
            wait_for_active: params.wait_for_active,
        };
        // Every availability domain places its nodes in the one node subnet
        let workers = WorkerSpec {
            node_shape: params.node_shape,
            node_image_name: params.node_image_name,
            size: params.node_count,
            nsg_ids: vec![],
            subnet_ids: vec![topology.node_subnet.id.clone(); availability_domains.len()],
            availability_domains,
            ocpus: params.ocpus,
            memory_in_gbs: params.memory_in_gbs,
        };

        let outcome = cluster::provision_cluster(
            self.engine.as_ref(),
            &cluster_spec,
            Some(&workers),
            self.wait,
            &self.cancel,
        )
        .await
        .map_err(|e| Error::with_partial(PartialOutcome::network(topology.clone()), e))?;

        Ok(QuickCreateOutcome {
            network: topology,
            cluster: outcome.cluster,
            node_pool: outcome.node_pool,
        })
    }

    fn resolve_workers(&self, params: WorkerParams) -> WorkerSpec {
        WorkerSpec {
            node_shape: params.node_shape,
            node_image_name: params.node_image_name,
            size: params.size,
            nsg_ids: self.resolver.resolve_multi(&params.nsg_ids),
            availability_domains: self.resolver.resolve_multi(&params.availability_domains),
            subnet_ids: self.resolver.resolve_multi(&params.subnet_ids),
            ocpus: params.ocpus,
            memory_in_gbs: params.memory_in_gbs,
        }
    }

    /// Resolve an optional compartment, falling back to the tenancy root
    fn compartment_or_tenancy(&self, raw: Option<&str>) -> String {
        raw.and_then(|r| self.resolver.resolve(r))
            .unwrap_or_else(|| self.config.tenancy_id.clone())
    }

    fn resolve_required(&self, field: &str, raw: &str) -> Result<String> {
        self.resolver
            .resolve(raw)
            .ok_or_else(|| Error::validation_for_field(field, "required parameter is empty"))
    }
}

fn version_or_default(raw: &str) -> String {
    if raw.trim().is_empty() {
        DEFAULT_KUBERNETES_VERSION.to_string()
    } else {
        raw.to_string()
    }
}
