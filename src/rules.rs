//! Static security-rule bundles for the quick-create topology
//!
//! Two fixed bundles, parameterized only by the provider's service CIDR
//! label: one for the worker-node subnet and one for the Kubernetes API
//! endpoint subnet. The bundles are data, not behavior; nothing mutates
//! them after creation.

use crate::model::{
    CidrType, EgressRule, IcmpOptions, IngressRule, PortRange, TcpOptions, ANYWHERE, PROTOCOL_ALL,
    PROTOCOL_ICMP, PROTOCOL_TCP,
};
use crate::{ENDPOINT_SUBNET_CIDR, NODE_SUBNET_CIDR, VCN_CIDR};

/// Port the Kubernetes API server listens on
pub const KUBERNETES_API_PORT: u16 = 6443;

/// Port workers use to reach the OKE control plane
pub const CONTROL_PLANE_PORT: u16 = 12250;

/// SSH port, open for operator access to worker nodes
pub const SSH_PORT: u16 = 22;

/// HTTPS port, for worker access to provider services
pub const HTTPS_PORT: u16 = 443;

/// ICMP "destination unreachable" type, used for path MTU discovery
const ICMP_DEST_UNREACHABLE: u8 = 3;

/// ICMP "fragmentation needed" code under type 3
const ICMP_FRAG_NEEDED: u8 = 4;

fn tcp_port(port: u16) -> Option<TcpOptions> {
    Some(TcpOptions {
        destination_port_range: Some(PortRange::single(port)),
    })
}

fn path_discovery_icmp() -> Option<IcmpOptions> {
    Some(IcmpOptions {
        icmp_type: ICMP_DEST_UNREACHABLE,
        code: Some(ICMP_FRAG_NEEDED),
    })
}

fn ingress(
    protocol: &str,
    source: &str,
    tcp: Option<TcpOptions>,
    icmp: Option<IcmpOptions>,
    description: &str,
) -> IngressRule {
    IngressRule {
        protocol: protocol.to_string(),
        source: source.to_string(),
        source_type: CidrType::CidrBlock,
        tcp_options: tcp,
        icmp_options: icmp,
        description: description.to_string(),
    }
}

fn egress(
    protocol: &str,
    destination: &str,
    destination_type: CidrType,
    tcp: Option<TcpOptions>,
    icmp: Option<IcmpOptions>,
    description: &str,
) -> EgressRule {
    EgressRule {
        protocol: protocol.to_string(),
        destination: destination.to_string(),
        destination_type,
        tcp_options: tcp,
        icmp_options: icmp,
        description: description.to_string(),
    }
}

/// Rules for the worker-node subnet's security list.
///
/// `service_cidr_label` is the provider's well-known service CIDR label
/// (the one the service gateway is bound to).
pub fn node_seclist_rules(service_cidr_label: &str) -> (Vec<IngressRule>, Vec<EgressRule>) {
    let ingress_rules = vec![
        ingress(
            PROTOCOL_ALL,
            NODE_SUBNET_CIDR,
            None,
            None,
            "Allow pods on one worker node to communicate with pods on other worker nodes",
        ),
        ingress(
            PROTOCOL_ICMP,
            VCN_CIDR,
            None,
            path_discovery_icmp(),
            "Path discovery",
        ),
        ingress(
            PROTOCOL_TCP,
            ENDPOINT_SUBNET_CIDR,
            None,
            None,
            "TCP access from Kubernetes Control Plane",
        ),
        ingress(
            PROTOCOL_TCP,
            ANYWHERE,
            tcp_port(SSH_PORT),
            None,
            "Inbound SSH traffic to worker nodes",
        ),
    ];

    let egress_rules = vec![
        egress(
            PROTOCOL_ALL,
            NODE_SUBNET_CIDR,
            CidrType::CidrBlock,
            None,
            None,
            "Allow pods on one worker node to communicate with pods on other worker nodes",
        ),
        egress(
            PROTOCOL_TCP,
            ENDPOINT_SUBNET_CIDR,
            CidrType::CidrBlock,
            tcp_port(KUBERNETES_API_PORT),
            None,
            "Access to Kubernetes API Endpoint",
        ),
        egress(
            PROTOCOL_TCP,
            ENDPOINT_SUBNET_CIDR,
            CidrType::CidrBlock,
            tcp_port(CONTROL_PLANE_PORT),
            None,
            "Kubernetes worker to control plane communication",
        ),
        egress(
            PROTOCOL_ICMP,
            ENDPOINT_SUBNET_CIDR,
            CidrType::CidrBlock,
            None,
            path_discovery_icmp(),
            "Path discovery",
        ),
        egress(
            PROTOCOL_TCP,
            service_cidr_label,
            CidrType::ServiceCidrBlock,
            tcp_port(HTTPS_PORT),
            None,
            "Allow nodes to communicate with OKE to ensure correct start-up and continued functioning",
        ),
        egress(
            PROTOCOL_ICMP,
            ANYWHERE,
            CidrType::CidrBlock,
            None,
            Some(IcmpOptions {
                icmp_type: ICMP_DEST_UNREACHABLE,
                code: None,
            }),
            "ICMP Access from Kubernetes Control Plane",
        ),
        egress(
            PROTOCOL_ALL,
            ANYWHERE,
            CidrType::CidrBlock,
            None,
            None,
            "Worker Nodes access to Internet",
        ),
    ];

    (ingress_rules, egress_rules)
}

/// Rules for the Kubernetes API endpoint subnet's security list.
pub fn k8s_api_endpoint_rules(service_cidr_label: &str) -> (Vec<IngressRule>, Vec<EgressRule>) {
    let ingress_rules = vec![
        ingress(
            PROTOCOL_ICMP,
            NODE_SUBNET_CIDR,
            None,
            path_discovery_icmp(),
            "Path discovery",
        ),
        ingress(
            PROTOCOL_TCP,
            NODE_SUBNET_CIDR,
            tcp_port(CONTROL_PLANE_PORT),
            None,
            "Kubernetes worker to control plane communication",
        ),
        ingress(
            PROTOCOL_TCP,
            NODE_SUBNET_CIDR,
            tcp_port(KUBERNETES_API_PORT),
            None,
            "Kubernetes worker to Kubernetes API endpoint communication",
        ),
        ingress(
            PROTOCOL_TCP,
            ANYWHERE,
            tcp_port(KUBERNETES_API_PORT),
            None,
            "External access to Kubernetes API endpoint",
        ),
    ];

    let egress_rules = vec![
        egress(
            PROTOCOL_TCP,
            service_cidr_label,
            CidrType::ServiceCidrBlock,
            tcp_port(HTTPS_PORT),
            None,
            "Allow Kubernetes Control Plane to communicate with OKE",
        ),
        egress(
            PROTOCOL_ALL,
            NODE_SUBNET_CIDR,
            CidrType::CidrBlock,
            None,
            None,
            "All traffic to worker nodes",
        ),
        egress(
            PROTOCOL_ICMP,
            NODE_SUBNET_CIDR,
            CidrType::CidrBlock,
            None,
            path_discovery_icmp(),
            "Path discovery",
        ),
    ];

    (ingress_rules, egress_rules)
}
