//! Turns probe outcomes into persisted statuses.

use crate::db::{Status, TargetRepository, UpdateOutcome};

use super::pipeline::{PipelineResult, ProbeOutcome, Reconciled};

/// Persist the status implied by `outcome`.
///
/// The write is unconditional, even when the status is unchanged. A row
/// deleted mid-probe yields [`Reconciled::TargetGone`].
pub async fn reconcile(repo: &dyn TargetRepository, outcome: &ProbeOutcome) -> PipelineResult {
    let status = Status::from_reachable(outcome.reachable);

    match repo.update_status(outcome.target_id, status).await? {
        UpdateOutcome::Updated => {
            tracing::debug!(
                target_id = outcome.target_id,
                %status,
                observed_at = %outcome.observed_at,
                "status updated"
            );
            Ok(Reconciled::Updated(status))
        }
        UpdateOutcome::NotFound => {
            tracing::debug!(target_id = outcome.target_id, "target removed before write-back");
            Ok(Reconciled::TargetGone)
        }
    }
}
