//! Node pool provisioning
//!
//! Validates placement up front, issues the create call, then re-resolves
//! the created pool by name. The provider's asynchronous create only hands
//! back a work request id, and the work request's resource shapes are not
//! stable enough to rely on, so a by-name listing is the source of truth
//! for the created record.

use tracing::{info, warn};

use crate::client::{ContainerEngine, CreateNodePoolRequest, NodePoolPlacementDetails};
use crate::model::{NodePool, NodeShapeConfig, PlacementConfig};
use crate::{normalize_kubernetes_version, Error, Result};

/// Everything needed to create one node pool
#[derive(Debug, Clone)]
pub struct NodePoolSpec {
    /// Compartment the pool is created in
    pub compartment_id: String,
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
    /// Network security groups attached to the nodes
    pub nsg_ids: Vec<String>,
    /// Availability domains, paired index-wise with `subnet_ids`
    pub availability_domains: Vec<String>,
    /// Subnets, paired index-wise with `availability_domains`
    pub subnet_ids: Vec<String>,
    /// CPU override for flexible shapes
    pub ocpus: Option<f32>,
    /// Memory override in gigabytes for flexible shapes
    pub memory_in_gbs: Option<f32>,
}

/// Pair availability domains with subnets index-wise.
///
/// Both lists must be non-empty and the same length; nodes in domain `i`
/// land in subnet `i`.
pub fn build_placement_configs(
    availability_domains: &[String],
    subnet_ids: &[String],
) -> Result<Vec<PlacementConfig>> {
    if availability_domains.is_empty() {
        return Err(Error::validation_for_field(
            "availability_domains",
            "at least one availability domain is required",
        ));
    }
    if subnet_ids.is_empty() {
        return Err(Error::validation_for_field(
            "subnet_ids",
            "at least one subnet is required",
        ));
    }
    if availability_domains.len() != subnet_ids.len() {
        return Err(Error::validation(format!(
            "availability domains ({}) and subnets ({}) must pair up one-to-one",
            availability_domains.len(),
            subnet_ids.len()
        )));
    }

    Ok(availability_domains
        .iter()
        .zip(subnet_ids)
        .map(|(ad, subnet)| PlacementConfig {
            availability_domain: ad.clone(),
            subnet_id: subnet.clone(),
        })
        .collect())
}

/// Build the shape-sizing override from the optional CPU and memory
/// parameters. The override only makes sense whole; a lone half is
/// dropped with a warning rather than sent as a malformed request.
pub fn build_shape_config(
    ocpus: Option<f32>,
    memory_in_gbs: Option<f32>,
) -> Option<NodeShapeConfig> {
    match (ocpus, memory_in_gbs) {
        (Some(ocpus), Some(memory_in_gbs)) => Some(NodeShapeConfig {
            ocpus,
            memory_in_gbs,
        }),
        (None, None) => None,
        _ => {
            warn!("shape override needs both ocpus and memory, ignoring the partial override");
            None
        }
    }
}

/// Create a node pool and return its resolved record.
pub async fn provision_node_pool(
    engine: &dyn ContainerEngine,
    spec: &NodePoolSpec,
) -> Result<NodePool> {
    let placement_configs =
        build_placement_configs(&spec.availability_domains, &spec.subnet_ids)?;
    let node_shape_config = build_shape_config(spec.ocpus, spec.memory_in_gbs);

    let request = CreateNodePoolRequest {
        compartment_id: spec.compartment_id.clone(),
        cluster_id: spec.cluster_id.clone(),
        name: spec.name.clone(),
        kubernetes_version: normalize_kubernetes_version(&spec.kubernetes_version),
        node_shape: spec.node_shape.clone(),
        node_image_name: spec.node_image_name.clone(),
        node_config_details: NodePoolPlacementDetails {
            size: spec.size,
            nsg_ids: spec.nsg_ids.clone(),
            placement_configs,
        },
        node_shape_config,
    };

    let work_request_id = engine.create_node_pool(request).await?;
    info!(
        pool = %spec.name,
        cluster = %spec.cluster_id,
        work_request = %work_request_id,
        "node pool creation accepted"
    );

    resolve_node_pool(engine, &spec.compartment_id, &spec.cluster_id, &spec.name).await
}

/// Find a node pool by name within a cluster.
async fn resolve_node_pool(
    engine: &dyn ContainerEngine,
    compartment_id: &str,
    cluster_id: &str,
    name: &str,
) -> Result<NodePool> {
    let pools = engine.list_node_pools(compartment_id).await?;
    pools
        .into_iter()
        .find(|p| p.name == name && p.cluster_id == cluster_id)
        .ok_or_else(|| Error::not_found("node pool", name))
}
