//! Completion waiter for asynchronous provider operations
//!
//! Create calls return immediately while the provider works in the
//! background; callers that asked to wait get a polling loop that watches
//! lifecycle state until the target is reached, a failure terminal state
//! appears, the deadline elapses, or the caller cancels.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::ContainerEngine;
use crate::model::{Cluster, LifecycleState};
use crate::{Error, Result};

/// Default delay between lifecycle polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default overall deadline for reaching the target state
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Polling cadence and deadline for a wait
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Delay between polls
    pub interval: Duration,
    /// Overall deadline
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Poll a cluster until it reaches `target`, returning the final record.
///
/// A failure terminal state other than the target yields
/// [`Error::ResourceFailed`]; an elapsed deadline yields [`Error::Timeout`]
/// so callers can tell "took too long" apart from "provider gave up".
/// Cancellation is honored between polls and during the inter-poll sleep.
pub async fn wait_for_cluster_state(
    engine: &dyn ContainerEngine,
    cluster_id: &str,
    target: LifecycleState,
    config: WaitConfig,
    cancel: &CancellationToken,
) -> Result<Cluster> {
    let operation = format!("cluster {target}");
    let start = Instant::now();
    let deadline = start + config.timeout;
    info!(cluster = %cluster_id, target = %target, "waiting for cluster state");

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }

        let cluster = engine.get_cluster(cluster_id).await?;
        let state = cluster.lifecycle_state;
        debug!(cluster = %cluster_id, state = %state, "observed lifecycle state");

        if state == target {
            info!(cluster = %cluster_id, state = %state, "target state reached");
            return Ok(cluster);
        }

        if state.is_terminal() {
            return Err(Error::ResourceFailed {
                kind: "cluster".to_string(),
                id: cluster_id.to_string(),
                state: state.to_string(),
            });
        }

        let now = Instant::now();
        if now + config.interval > deadline {
            return Err(Error::Timeout {
                operation,
                elapsed: start.elapsed(),
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled { operation });
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
