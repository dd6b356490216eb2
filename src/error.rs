//! Error types for the provisioning orchestrator
//!
//! Errors are structured with fields to aid debugging in production.
//! Partial successes are never discarded: when a later step fails after
//! earlier steps created real resources, the error carries the assembled
//! partial result alongside the cause.

use std::time::Duration;

use thiserror::Error;

use crate::model::{Cluster, NodePool};
use crate::network::NetworkTopology;

/// Whatever had been successfully provisioned before a failure.
///
/// Attached to [`Error::Partial`] so the caller sees both the partial
/// success and the error, never a silent swallow.
#[derive(Debug, Clone, Default)]
pub struct PartialOutcome {
    /// Network topology, when the network build completed before the failure
    pub network: Option<NetworkTopology>,
    /// Cluster, when control-plane creation completed before the failure
    pub cluster: Option<Cluster>,
    /// Node pool, when pool creation completed before the failure
    pub node_pool: Option<NodePool>,
}

impl PartialOutcome {
    /// A partial outcome containing only a created cluster
    pub fn cluster(cluster: Cluster) -> Self {
        Self {
            cluster: Some(cluster),
            ..Self::default()
        }
    }

    /// A partial outcome containing only a built network
    pub fn network(network: NetworkTopology) -> Self {
        Self {
            network: Some(network),
            ..Self::default()
        }
    }

    /// Fill this outcome's empty fields from `other`. Fields already set
    /// were attached closer to the failure and win.
    fn merged_with(mut self, other: PartialOutcome) -> Self {
        self.network = self.network.or(other.network);
        self.cluster = self.cluster.or(other.cluster);
        self.node_pool = self.node_pool.or(other.node_pool);
        self
    }
}

/// Main error type for provisioning operations
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data is structurally invalid. No provider call was
    /// attempted and no rollback is needed.
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid parameter, when one can be named
        field: Option<String>,
    },

    /// A provider resource-creation or query call failed
    #[error("provider error [{operation}] ({status}): {message}")]
    Provider {
        /// The facade operation that failed (e.g. "createSubnet")
        operation: String,
        /// Provider-side HTTP status code
        status: u16,
        /// Provider-side error message
        message: String,
    },

    /// A by-name lookup found zero matches. Terminal, never retried.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind looked up (e.g. "cluster")
        kind: String,
        /// Name that matched nothing
        name: String,
    },

    /// A watched resource reached a failure terminal state
    #[error("{kind} {id} entered failure state {state}")]
    ResourceFailed {
        /// Resource kind (e.g. "cluster")
        kind: String,
        /// Identifier of the failed resource
        id: String,
        /// The terminal state observed
        state: String,
    },

    /// The completion waiter's deadline elapsed before the target state.
    /// Distinct from a provider-reported failure state.
    #[error("timed out after {elapsed:?} waiting for {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// How long the waiter ran
        elapsed: Duration,
    },

    /// The caller's cancellation signal aborted a wait
    #[error("cancelled while waiting for {operation}")]
    Cancelled {
        /// What was being waited on
        operation: String,
    },

    /// Local file IO failed (kubeconfig persistence)
    #[error("io error: {source}")]
    Io {
        /// The underlying IO error
        #[from]
        source: std::io::Error,
    },

    /// A later step failed after earlier steps succeeded; the partial
    /// result rides along with the original error.
    #[error("{source} (partial result attached)")]
    Partial {
        /// What had been provisioned before the failure
        outcome: Box<PartialOutcome>,
        /// The original error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error naming the offending parameter
    pub fn validation_for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a provider error for the given facade operation
    pub fn provider(operation: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a not-found (resolution) error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Wrap an error with the partial result produced before it occurred.
    ///
    /// An already-partial error keeps its payload and absorbs the new
    /// attachment into its empty fields, so an outer layer (say, the
    /// network build) enriches what an inner layer (the cluster create)
    /// attached without clobbering it.
    pub fn with_partial(outcome: PartialOutcome, source: Error) -> Self {
        match source {
            Error::Partial {
                outcome: inner,
                source,
            } => Error::Partial {
                outcome: Box::new(inner.merged_with(outcome)),
                source,
            },
            other => Error::Partial {
                outcome: Box::new(outcome),
                source: Box::new(other),
            },
        }
    }

    /// The partial result attached to this error, if any
    pub fn partial_outcome(&self) -> Option<&PartialOutcome> {
        match self {
            Error::Partial { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// The underlying error, unwrapping any partial-result wrapper
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Partial { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
