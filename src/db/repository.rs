//! Storage seam used by the monitor.

use async_trait::async_trait;

use super::models::{Status, Target, UpdateOutcome};
use super::store::DbError;

/// Durable set of monitored targets as seen by the scheduler.
///
/// `update_status` must never create a row: a write for a deleted id
/// reports [`UpdateOutcome::NotFound`].
#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn list_targets(&self) -> Result<Vec<Target>, DbError>;

    async fn update_status(&self, id: i64, status: Status) -> Result<UpdateOutcome, DbError>;
}
