//! Rollback coordination for failed quick-create attempts
//!
//! Compensation is deliberately coarse: deleting the VCN cascades to every
//! dependent resource the attempt created inside it, so the ledger's VCN
//! entry is the only deletion target. Compensation never masks the primary
//! failure; a secondary error during cleanup is reported alongside it, and
//! the primary error always propagates to the caller.

use tracing::{info, warn};

use crate::client::VirtualNetwork;
use crate::network::ResourceLedger;
use crate::Error;

/// What a compensation pass did and what it could not do
#[derive(Debug, Default)]
pub struct CompensationReport {
    /// The VCN that was deleted, when the ledger recorded one
    pub deleted_vcn: Option<String>,
    /// Error hit during cleanup itself, if any. The primary failure is
    /// still the caller's error; this is diagnostic only.
    pub secondary_error: Option<Error>,
}

impl CompensationReport {
    /// Whether cleanup left resources behind that need manual attention
    pub fn needs_manual_cleanup(&self) -> bool {
        self.secondary_error.is_some()
    }
}

/// Compensate a failed provisioning attempt by deleting the VCN the
/// attempt created, if it created one.
///
/// Runs exactly once per failed attempt and is a no-op on an empty
/// ledger. Secondary failures are logged and reported, never raised.
pub async fn compensate(vnet: &dyn VirtualNetwork, ledger: &ResourceLedger) -> CompensationReport {
    let mut report = CompensationReport::default();

    let Some(vcn_id) = ledger.vcn_id() else {
        info!("no VCN recorded, nothing to compensate");
        return report;
    };

    info!(vcn = %vcn_id, resources = ledger.entries().len(), "rolling back created network");
    match vnet.delete_vcn(vcn_id).await {
        Ok(()) => {
            info!(vcn = %vcn_id, "deleted VCN and its dependent resources");
            report.deleted_vcn = Some(vcn_id.to_string());
        }
        Err(e) => {
            warn!(vcn = %vcn_id, error = %e, "VCN deletion failed, manual cleanup required");
            report.secondary_error = Some(e);
        }
    }

    report
}
