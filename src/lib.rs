//! oke-provision - provisioning orchestrator for OKE clusters
//!
//! Provisions a managed Kubernetes control plane on OCI together with the
//! full network topology it requires (VCN, gateways, route tables, security
//! lists, subnets), and provisions worker node pools against that topology.
//!
//! The hard part lives in the ordered, multi-resource creation workflow:
//! a VCN must exist before its gateways, gateways before route tables,
//! route tables and security lists before subnets. Every created resource
//! is recorded in a ledger so that a failure partway through can be
//! compensated by deleting the VCN (the provider cascades the rest).
//!
//! # Modules
//!
//! - [`client`] - Facade traits for the provider's network and container engine APIs
//! - [`model`] - Resource types shared across the orchestrator
//! - [`rules`] - Static security-rule bundles for worker and endpoint subnets
//! - [`network`] - Network topology builder (ordered steps + resource ledger)
//! - [`rollback`] - Compensating deletion for partially provisioned attempts
//! - [`cluster`] - Control-plane provisioning and cluster-id resolution
//! - [`nodepool`] - Node pool provisioning and placement validation
//! - [`waiter`] - Polling loop for asynchronous resource completion
//! - [`kubeconfig`] - Streams kubeconfig content to a local file
//! - [`resolver`] - Reference-resolution boundary for human-supplied parameters
//! - [`provision`] - The four caller-facing entry points
//! - [`error`] - Error types carrying partial-result payloads

#![deny(missing_docs)]

pub mod client;
pub mod cluster;
pub mod error;
pub mod kubeconfig;
pub mod model;
pub mod network;
pub mod nodepool;
pub mod provision;
pub mod resolver;
pub mod rollback;
pub mod rules;
pub mod waiter;

pub use error::{Error, PartialOutcome};
pub use provision::{Provisioner, ProvisionerConfig};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Fixed CIDR plan
// =============================================================================
// The quick-create topology always carves the same three subnets out of a
// /16 VCN block. The blocks are disjoint by construction.

/// CIDR block for the VCN created by quick-create
pub const VCN_CIDR: &str = "10.0.0.0/16";

/// CIDR block for the load-balancer subnet
pub const LB_SUBNET_CIDR: &str = "10.0.20.0/24";

/// CIDR block for the worker-node subnet
pub const NODE_SUBNET_CIDR: &str = "10.0.10.0/24";

/// CIDR block for the Kubernetes API endpoint subnet
pub const ENDPOINT_SUBNET_CIDR: &str = "10.0.0.0/28";

/// Default pods CIDR for quick-created clusters
pub const DEFAULT_PODS_CIDR: &str = "10.244.0.0/16";

/// Default services CIDR for quick-created clusters
pub const DEFAULT_SERVICES_CIDR: &str = "10.96.0.0/16";

/// Default Kubernetes version when the caller supplies none
pub const DEFAULT_KUBERNETES_VERSION: &str = "v1.19.7";

/// Normalize a Kubernetes version string to the canonical `v`-prefixed form.
///
/// The provider historically accepted both `1.19.7` and `v1.19.7` depending
/// on the call site. All create requests go through this so that only one
/// form ever reaches the wire.
pub fn normalize_kubernetes_version(version: &str) -> String {
    let trimmed = version.trim();
    if trimmed.starts_with('v') {
        trimmed.to_string()
    } else {
        format!("v{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_version() {
        assert_eq!(normalize_kubernetes_version("1.19.7"), "v1.19.7");
    }

    #[test]
    fn keeps_prefixed_version() {
        assert_eq!(normalize_kubernetes_version("v1.19.7"), "v1.19.7");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(normalize_kubernetes_version(" 1.21.0 "), "v1.21.0");
    }
}
