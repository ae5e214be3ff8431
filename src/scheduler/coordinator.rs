//! Bounded worker pool with per-target mutual exclusion.
//!
//! Jobs travel through a bounded queue to a fixed number of workers, so the
//! number of simultaneous probes never exceeds the worker count no matter how
//! many targets exist. A target with a pipeline already queued or running is
//! never handed to a second worker: later dispatches are parked on its slot
//! and coalesced, and the worker that finishes the current run picks the
//! parked one up next.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::db::Target;

use super::pipeline::{Pipeline, PipelineError, PipelineResult};
use super::stats::MonitorStats;

struct Job {
    target: Target,
    waiters: Vec<oneshot::Sender<PipelineResult>>,
}

/// One entry per target that is queued or running.
#[derive(Default)]
struct Slot {
    parked: Option<Job>,
}

impl Slot {
    fn park(&mut self, job: Job) {
        tracing::debug!(target_id = job.target.id, "target busy, deferring dispatch");
        match self.parked.as_mut() {
            Some(parked) => {
                parked.target = job.target;
                parked.waiters.extend(job.waiters);
            }
            None => self.parked = Some(job),
        }
    }
}

struct Shared {
    pipeline: Arc<Pipeline>,
    stats: Arc<MonitorStats>,
    in_flight: Mutex<HashMap<i64, Slot>>,
}

impl Shared {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<i64, Slot>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Park `job` on its target's slot, or hand it back if the target is idle.
    fn park_if_busy(&self, job: Job) -> Option<Job> {
        let mut in_flight = self.in_flight();
        match in_flight.get_mut(&job.target.id) {
            Some(slot) => {
                slot.park(job);
                None
            }
            None => Some(job),
        }
    }

    /// Take the parked job for `id`, or release the slot if there is none.
    fn next_for(&self, id: i64) -> Option<Job> {
        let mut in_flight = self.in_flight();
        let parked = in_flight.get_mut(&id).and_then(|slot| slot.parked.take());
        if parked.is_none() {
            in_flight.remove(&id);
        }
        parked
    }
}

/// Resolves once the dispatched pipeline (or the run it was folded into) ends.
pub struct DispatchHandle {
    rx: oneshot::Receiver<PipelineResult>,
}

impl DispatchHandle {
    pub async fn wait(self) -> PipelineResult {
        self.rx.await.unwrap_or(Err(PipelineError::Cancelled))
    }
}

pub struct Coordinator {
    shared: Arc<Shared>,
    queue: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Spawn `workers` tasks fed by a queue holding at most `queue_capacity` jobs.
    pub fn new(
        pipeline: Pipeline,
        stats: Arc<MonitorStats>,
        workers: usize,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let shared = Arc::new(Shared {
            pipeline: Arc::new(pipeline),
            stats,
            in_flight: Mutex::new(HashMap::new()),
        });

        let handles = (0..workers.max(1))
            .map(|n| tokio::spawn(run_worker(n, shared.clone(), rx.clone())))
            .collect();

        Self {
            shared,
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Queue a pipeline run for `target`.
    ///
    /// If the target already has a run queued or in progress, this one is
    /// deferred until that run completes. Several deferred dispatches for the
    /// same target collapse into a single run using the newest snapshot.
    ///
    /// Cancel-safe: a slot is only created in the same critical section that
    /// enqueues its job, so dropping this future while it waits for queue
    /// space leaves no trace.
    pub async fn dispatch(&self, target: Target) -> DispatchHandle {
        let (tx, rx) = oneshot::channel();
        let id = target.id;
        let job = Job {
            target,
            waiters: vec![tx],
        };

        // A busy target never needs queue space.
        let Some(job) = self.shared.park_if_busy(job) else {
            return DispatchHandle { rx };
        };

        let sender = self.queue.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let permit = match &sender {
            Some(sender) => sender.reserve().await.ok(),
            None => None,
        };
        let Some(permit) = permit else {
            // Dropping the job drops its waiter, which resolves as Cancelled.
            tracing::warn!(target_id = id, "coordinator stopped, dispatch dropped");
            return DispatchHandle { rx };
        };

        let mut in_flight = self.shared.in_flight();
        match in_flight.get_mut(&id) {
            // Another dispatch claimed the target while we waited; the unused
            // permit returns its capacity on drop.
            Some(slot) => slot.park(job),
            None => {
                in_flight.insert(id, Slot::default());
                permit.send(job);
            }
        }

        DispatchHandle { rx }
    }

    /// Number of targets currently queued or running.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight().len()
    }

    /// Close the queue and wait for workers to drain it.
    pub async fn shutdown(&self) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).take();
        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn run_worker(
    n: usize,
    shared: Arc<Shared>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(mut job) = next else { break };

        loop {
            let id = job.target.id;
            let pipeline = shared.pipeline.clone();
            let target = job.target.clone();

            // Run in its own task so a panic cannot wedge the slot.
            let result = match tokio::spawn(async move { pipeline.run(&target).await }).await {
                Ok(result) => result,
                Err(_) => Err(PipelineError::Panicked),
            };

            match &result {
                Ok(_) => shared.stats.record_pipeline(true),
                Err(e) => {
                    shared.stats.record_pipeline(false);
                    tracing::error!(
                        target_id = id,
                        name = %job.target.name,
                        error = %e,
                        "pipeline failed"
                    );
                }
            }

            for waiter in job.waiters.drain(..) {
                let _ = waiter.send(result.clone());
            }

            match shared.next_for(id) {
                Some(parked) => job = parked,
                None => break,
            }
        }
    }

    tracing::debug!("probe worker {} exiting", n);
}
