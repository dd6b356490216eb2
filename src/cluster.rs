//! Cluster provisioning
//!
//! Creates a control plane, re-resolves it by name, optionally attaches an
//! initial worker pool, and optionally waits for the cluster to become
//! ACTIVE. A failure after the control plane exists never discards it: the
//! created cluster rides along on the error as a partial result.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::{
    ClusterCreateOptions, ContainerEngine, CreateClusterRequest, KubernetesNetworkConfig,
};
use crate::error::PartialOutcome;
use crate::model::{Cluster, EndpointConfig, LifecycleState, NodePool};
use crate::nodepool::{self, NodePoolSpec};
use crate::waiter::{self, WaitConfig};
use crate::{normalize_kubernetes_version, Error, Result};

/// Suffix appended to the cluster name for the initial worker pool
const NODE_POOL_SUFFIX: &str = "_nodepool";

/// Everything needed to create one cluster control plane
#[derive(Debug, Clone)]
pub struct ClusterSpec {
    /// Compartment the cluster is created in
    pub compartment_id: String,
    /// Display name, also used for by-name re-resolution
    pub name: String,
    /// Kubernetes version, any accepted form
    pub kubernetes_version: String,
    /// VCN the cluster is bound to
    pub vcn_id: String,
    /// Subnet hosting the API endpoint
    pub endpoint_subnet_id: Option<String>,
    /// Whether the API endpoint gets a public IP
    pub public_endpoint: bool,
    /// Network security groups attached to the endpoint
    pub endpoint_nsg_ids: Vec<String>,
    /// Subnets load balancers for in-cluster services are placed in
    pub service_lb_subnet_ids: Vec<String>,
    /// CIDR block for pod IPs
    pub pods_cidr: String,
    /// CIDR block for service IPs
    pub services_cidr: String,
    /// Whether to block until the cluster reaches ACTIVE
    pub wait_for_active: bool,
}

/// Initial worker pool configuration attached at cluster creation
#[derive(Debug, Clone)]
pub struct WorkerSpec {
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

/// What cluster provisioning produced
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// The created cluster
    pub cluster: Cluster,
    /// The initial worker pool, when one was requested
    pub node_pool: Option<NodePool>,
}

/// Create a cluster, optionally with an initial worker pool, optionally
/// waiting for it to become ACTIVE.
pub async fn provision_cluster(
    engine: &dyn ContainerEngine,
    spec: &ClusterSpec,
    workers: Option<&WorkerSpec>,
    wait: WaitConfig,
    cancel: &CancellationToken,
) -> Result<ClusterOutcome> {
    let request = CreateClusterRequest {
        compartment_id: spec.compartment_id.clone(),
        name: spec.name.clone(),
        kubernetes_version: normalize_kubernetes_version(&spec.kubernetes_version),
        vcn_id: spec.vcn_id.clone(),
        endpoint_config: EndpointConfig {
            subnet_id: spec.endpoint_subnet_id.clone(),
            is_public_ip_enabled: spec.public_endpoint,
            nsg_ids: spec.endpoint_nsg_ids.clone(),
        },
        options: ClusterCreateOptions {
            service_lb_subnet_ids: spec.service_lb_subnet_ids.clone(),
            kubernetes_network_config: KubernetesNetworkConfig {
                pods_cidr: spec.pods_cidr.clone(),
                services_cidr: spec.services_cidr.clone(),
            },
        },
    };

    let work_request_id = engine.create_cluster(request).await?;
    info!(
        cluster = %spec.name,
        work_request = %work_request_id,
        "cluster creation accepted"
    );

    let cluster = resolve_cluster(engine, &spec.compartment_id, &spec.name).await?;

    let node_pool = match workers {
        Some(workers) => {
            let pool_spec = worker_pool_spec(spec, &cluster, workers);
            match nodepool::provision_node_pool(engine, &pool_spec).await {
                Ok(pool) => Some(pool),
                Err(e) => {
                    return Err(Error::with_partial(
                        PartialOutcome::cluster(cluster),
                        e,
                    ));
                }
            }
        }
        None => None,
    };

    let cluster = if spec.wait_for_active {
        let waited =
            waiter::wait_for_cluster_state(engine, &cluster.id, LifecycleState::Active, wait, cancel)
                .await;
        match waited {
            Ok(active) => active,
            Err(e) => {
                let partial = PartialOutcome {
                    network: None,
                    cluster: Some(cluster),
                    node_pool,
                };
                return Err(Error::with_partial(partial, e));
            }
        }
    } else {
        cluster
    };

    Ok(ClusterOutcome { cluster, node_pool })
}

/// Find a live cluster by name within a compartment.
///
/// Clusters being or already deleted are skipped so a recreate under a
/// reused name resolves to the new control plane.
async fn resolve_cluster(
    engine: &dyn ContainerEngine,
    compartment_id: &str,
    name: &str,
) -> Result<Cluster> {
    let clusters = engine.list_clusters(compartment_id).await?;
    clusters
        .into_iter()
        .find(|c| {
            c.name == name
                && !matches!(
                    c.lifecycle_state,
                    LifecycleState::Deleting | LifecycleState::Deleted
                )
        })
        .ok_or_else(|| Error::not_found("cluster", name))
}

fn worker_pool_spec(spec: &ClusterSpec, cluster: &Cluster, workers: &WorkerSpec) -> NodePoolSpec {
    NodePoolSpec {
        compartment_id: spec.compartment_id.clone(),
        cluster_id: cluster.id.clone(),
        name: format!("{}{NODE_POOL_SUFFIX}", spec.name),
        kubernetes_version: spec.kubernetes_version.clone(),
        node_shape: workers.node_shape.clone(),
        node_image_name: workers.node_image_name.clone(),
        size: workers.size,
        nsg_ids: workers.nsg_ids.clone(),
        availability_domains: workers.availability_domains.clone(),
        subnet_ids: workers.subnet_ids.clone(),
        ocpus: workers.ocpus,
        memory_in_gbs: workers.memory_in_gbs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockContainerEngine;
    use crate::{DEFAULT_PODS_CIDR, DEFAULT_SERVICES_CIDR};

    fn spec(wait_for_active: bool) -> ClusterSpec {
        ClusterSpec {
            compartment_id: "ocid1.compartment.test".into(),
            name: "demo".into(),
            kubernetes_version: "1.19.7".into(),
            vcn_id: "ocid1.vcn.test".into(),
            endpoint_subnet_id: Some("ocid1.subnet.endpoint".into()),
            public_endpoint: true,
            endpoint_nsg_ids: vec![],
            service_lb_subnet_ids: vec!["ocid1.subnet.lb".into()],
            pods_cidr: DEFAULT_PODS_CIDR.into(),
            services_cidr: DEFAULT_SERVICES_CIDR.into(),
            wait_for_active,
        }
    }

    fn workers() -> WorkerSpec {
        WorkerSpec {
            node_shape: "VM.Standard.E4.Flex".into(),
            node_image_name: "Oracle-Linux-7.9".into(),
            size: 3,
            nsg_ids: vec![],
            availability_domains: vec!["AD-1".into()],
            subnet_ids: vec!["ocid1.subnet.node".into()],
            ocpus: None,
            memory_in_gbs: None,
        }
    }

    fn cluster_named(name: &str, state: LifecycleState) -> Cluster {
        Cluster {
            id: format!("ocid1.cluster.{name}.{state}"),
            name: name.into(),
            compartment_id: "ocid1.compartment.test".into(),
            kubernetes_version: "v1.19.7".into(),
            vcn_id: "ocid1.vcn.test".into(),
            endpoint_config: EndpointConfig {
                subnet_id: Some("ocid1.subnet.endpoint".into()),
                is_public_ip_enabled: true,
                nsg_ids: vec![],
            },
            lifecycle_state: state,
        }
    }

    fn pool_for(cluster: &Cluster, name: &str) -> NodePool {
        NodePool {
            id: "ocid1.nodepool.1".into(),
            name: name.into(),
            cluster_id: cluster.id.clone(),
            compartment_id: "ocid1.compartment.test".into(),
            kubernetes_version: "v1.19.7".into(),
            node_shape: "VM.Standard.E4.Flex".into(),
            node_image_name: "Oracle-Linux-7.9".into(),
            size: 3,
            placement_configs: vec![],
            node_shape_config: None,
            lifecycle_state: LifecycleState::Creating,
        }
    }

    #[tokio::test]
    async fn bare_cluster_without_wait_skips_polling() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .withf(|req| req.kubernetes_version == "v1.19.7" && req.name == "demo")
            .times(1)
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine
            .expect_list_clusters()
            .returning(|_| Ok(vec![cluster_named("demo", LifecycleState::Creating)]));
        engine.expect_get_cluster().times(0);

        let outcome = provision_cluster(
            &engine,
            &spec(false),
            None,
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("provisioning should succeed");

        assert_eq!(outcome.cluster.name, "demo");
        assert!(outcome.node_pool.is_none());
    }

    #[tokio::test]
    async fn resolution_skips_clusters_being_deleted() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine.expect_list_clusters().returning(|_| {
            Ok(vec![
                cluster_named("demo", LifecycleState::Deleting),
                cluster_named("demo", LifecycleState::Creating),
            ])
        });

        let outcome = provision_cluster(
            &engine,
            &spec(false),
            None,
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("provisioning should succeed");

        assert_eq!(outcome.cluster.lifecycle_state, LifecycleState::Creating);
    }

    #[tokio::test]
    async fn worker_pool_is_named_after_the_cluster() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine
            .expect_list_clusters()
            .returning(|_| Ok(vec![cluster_named("demo", LifecycleState::Creating)]));
        engine
            .expect_create_node_pool()
            .withf(|req| req.name == "demo_nodepool")
            .times(1)
            .returning(|_| Ok("ocid1.workrequest.2".into()));
        engine.expect_list_node_pools().returning(|_| {
            let cluster = cluster_named("demo", LifecycleState::Creating);
            Ok(vec![pool_for(&cluster, "demo_nodepool")])
        });

        let outcome = provision_cluster(
            &engine,
            &spec(false),
            Some(&workers()),
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("provisioning should succeed");

        assert_eq!(
            outcome.node_pool.expect("pool should exist").name,
            "demo_nodepool"
        );
    }

    #[tokio::test]
    async fn worker_pool_failure_carries_the_created_cluster() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine
            .expect_list_clusters()
            .returning(|_| Ok(vec![cluster_named("demo", LifecycleState::Creating)]));
        engine
            .expect_create_node_pool()
            .returning(|_| Err(Error::provider("createNodePool", 500, "internal error")));

        let err = provision_cluster(
            &engine,
            &spec(false),
            Some(&workers()),
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("provisioning should fail");

        let partial = err.partial_outcome().expect("partial should be attached");
        assert_eq!(partial.cluster.as_ref().unwrap().name, "demo");
        assert!(matches!(err.root_cause(), Error::Provider { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_failure_carries_cluster_and_pool() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine
            .expect_list_clusters()
            .returning(|_| Ok(vec![cluster_named("demo", LifecycleState::Creating)]));
        engine
            .expect_create_node_pool()
            .returning(|_| Ok("ocid1.workrequest.2".into()));
        engine.expect_list_node_pools().returning(|_| {
            let cluster = cluster_named("demo", LifecycleState::Creating);
            Ok(vec![pool_for(&cluster, "demo_nodepool")])
        });
        engine
            .expect_get_cluster()
            .returning(|_| Ok(cluster_named("demo", LifecycleState::Failed)));

        let err = provision_cluster(
            &engine,
            &spec(true),
            Some(&workers()),
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("wait should fail");

        let partial = err.partial_outcome().expect("partial should be attached");
        assert!(partial.cluster.is_some());
        assert!(partial.node_pool.is_some());
        assert!(matches!(err.root_cause(), Error::ResourceFailed { .. }));
    }

    #[tokio::test]
    async fn missing_cluster_after_create_is_not_found() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_cluster()
            .returning(|_| Ok("ocid1.workrequest.1".into()));
        engine.expect_list_clusters().returning(|_| Ok(vec![]));

        let err = provision_cluster(
            &engine,
            &spec(false),
            None,
            WaitConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("resolution should fail");

        assert!(matches!(err, Error::NotFound { .. }));
    }
}
