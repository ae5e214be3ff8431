//! The per-target probe-then-reconcile sequence.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::db::{DbError, Status, Target, TargetRepository};
use crate::probe::Prober;

use super::reconciler::reconcile;

/// What one probe observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub target_id: i64,
    pub reachable: bool,
    pub observed_at: DateTime<Utc>,
}

/// How a pipeline ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Updated(Status),
    /// The target was deleted while its probe was in flight.
    TargetGone,
}

/// Pipeline failures. Cloneable so one run can answer several waiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("repository error: {0}")]
    Repository(String),
    #[error("pipeline task panicked")]
    Panicked,
    #[error("coordinator stopped before the pipeline ran")]
    Cancelled,
}

impl From<DbError> for PipelineError {
    fn from(e: DbError) -> Self {
        PipelineError::Repository(e.to_string())
    }
}

pub type PipelineResult = Result<Reconciled, PipelineError>;

/// Prober and repository handles shared by every pipeline run.
#[derive(Clone)]
pub struct Pipeline {
    prober: Arc<dyn Prober>,
    repo: Arc<dyn TargetRepository>,
}

impl Pipeline {
    pub fn new(prober: Arc<dyn Prober>, repo: Arc<dyn TargetRepository>) -> Self {
        Self { prober, repo }
    }

    pub async fn run(&self, target: &Target) -> PipelineResult {
        let reachable = self.prober.probe(&target.url).await;
        let outcome = ProbeOutcome {
            target_id: target.id,
            reachable,
            observed_at: Utc::now(),
        };
        reconcile(self.repo.as_ref(), &outcome).await
    }
}
