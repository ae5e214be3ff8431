//! Scheduler module for periodic and on-demand website checks.

mod coordinator;
mod pipeline;
mod reconciler;
mod stats;

pub use coordinator::*;
pub use pipeline::*;
pub use reconciler::*;
pub use stats::*;

use crate::config::ServerConfig;
use crate::db::{DbError, Status, Target, TargetRepository};
use crate::probe::Prober;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Scheduler error types.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to list targets: {0}")]
    ListTargets(#[from] DbError),
}

/// Tally of one tick's pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub dispatched: usize,
    pub online: usize,
    pub offline: usize,
    pub gone: usize,
    pub failed: usize,
}

/// Pending results of one tick's dispatches.
pub struct TickHandle {
    pending: Vec<DispatchHandle>,
}

impl TickHandle {
    pub async fn wait(self) -> TickSummary {
        let mut summary = TickSummary {
            dispatched: self.pending.len(),
            ..Default::default()
        };

        for handle in self.pending {
            match handle.wait().await {
                Ok(Reconciled::Updated(Status::Online)) => summary.online += 1,
                Ok(Reconciled::Updated(_)) => summary.offline += 1,
                Ok(Reconciled::TargetGone) => summary.gone += 1,
                Err(_) => summary.failed += 1,
            }
        }

        summary
    }
}

/// Drives fleet-wide checks on a fixed cadence and one-off checks for new targets.
pub struct Scheduler {
    repo: Arc<dyn TargetRepository>,
    coordinator: Coordinator,
    stats: Arc<MonitorStats>,
    interval: Duration,
    running: Mutex<Option<(broadcast::Sender<()>, JoinHandle<()>)>>,
}

impl Scheduler {
    pub fn new(
        repo: Arc<dyn TargetRepository>,
        prober: Arc<dyn Prober>,
        config: &ServerConfig,
    ) -> Self {
        let stats = Arc::new(MonitorStats::default());
        let pipeline = Pipeline::new(prober, repo.clone());
        let coordinator = Coordinator::new(
            pipeline,
            stats.clone(),
            config.max_concurrent_probes,
            config.queue_capacity,
        );

        Self {
            repo,
            coordinator,
            stats,
            interval: config.check_interval,
            running: Mutex::new(None),
        }
    }

    /// Start the periodic loop. The first tick fires immediately.
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return; // Already running
        }

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Scheduler: starting periodic checks"
        );

        let (tx, mut rx) = broadcast::channel(1);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(this.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = rx.recv() => break,
                    _ = interval.tick() => {
                        // Failures are logged and counted inside run_tick.
                        if let Ok(handle) = this.run_tick().await {
                            tokio::spawn(async move {
                                let summary = handle.wait().await;
                                tracing::info!(
                                    dispatched = summary.dispatched,
                                    online = summary.online,
                                    offline = summary.offline,
                                    gone = summary.gone,
                                    failed = summary.failed,
                                    "Scheduler: tick complete"
                                );
                            });
                        }
                    }
                }
            }

            tracing::info!("Scheduler: periodic checks stopped");
        });

        *running = Some((tx, handle));
    }

    /// Stop the periodic loop and drain outstanding probes.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some((tx, handle)) = running {
            let _ = tx.send(());
            let _ = handle.await;
        }
        self.coordinator.shutdown().await;
    }

    /// List every target and dispatch a pipeline for each.
    ///
    /// A listing failure aborts this tick only; the next tick retries.
    pub async fn run_tick(&self) -> Result<TickHandle, SchedulerError> {
        self.stats.record_tick();

        let targets = match self.repo.list_targets().await {
            Ok(targets) => targets,
            Err(e) => {
                self.stats.record_tick_failure();
                tracing::error!("Scheduler: failed to list targets: {}", e);
                return Err(e.into());
            }
        };

        tracing::debug!(
            "Scheduler: dispatching {} targets ({} still in flight)",
            targets.len(),
            self.coordinator.in_flight()
        );

        let mut pending = Vec::with_capacity(targets.len());
        for target in targets {
            pending.push(self.coordinator.dispatch(target).await);
        }

        Ok(TickHandle { pending })
    }

    /// Check a freshly created target without waiting for the next tick.
    pub async fn on_target_created(&self, target: Target) -> PipelineResult {
        tracing::info!("Scheduler: immediate check for {} ({})", target.name, target.url);
        self.coordinator.dispatch(target).await.wait().await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
