//! In-memory doubles for the repository and prober.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

use crate::db::{DbError, Status, Target, TargetRepository, UpdateOutcome};
use crate::probe::Prober;

#[derive(Default)]
pub struct FakeRepo {
    rows: Mutex<BTreeMap<i64, Target>>,
    next_id: AtomicUsize,
    fail_list: AtomicBool,
    failing_updates: Mutex<HashSet<i64>>,
    updates: Mutex<Vec<(i64, Status)>>,
}

impl FakeRepo {
    pub fn insert(&self, name: &str, url: &str) -> Target {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let mut target = Target::new(name, url);
        target.id = id;
        self.rows.lock().unwrap().insert(id, target.clone());
        target
    }

    pub fn remove(&self, id: i64) -> bool {
        self.rows.lock().unwrap().remove(&id).is_some()
    }

    pub fn status(&self, id: i64) -> Option<Status> {
        self.rows.lock().unwrap().get(&id).map(|t| t.status)
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates_for(&self, id: i64) {
        self.failing_updates.lock().unwrap().insert(id);
    }

    /// Every `update_status` call that reached the repository, in order.
    pub fn update_calls(&self) -> Vec<(i64, Status)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl TargetRepository for FakeRepo {
    async fn list_targets(&self) -> Result<Vec<Target>, DbError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DbError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn update_status(&self, id: i64, status: Status) -> Result<UpdateOutcome, DbError> {
        self.updates.lock().unwrap().push((id, status));
        if self.failing_updates.lock().unwrap().contains(&id) {
            return Err(DbError::Poisoned);
        }
        match self.rows.lock().unwrap().get_mut(&id) {
            Some(row) => {
                row.status = status;
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }
}

/// Prober with scripted answers that records overlapping calls per url.
#[derive(Default)]
pub struct FakeProber {
    reachable: Mutex<HashMap<String, bool>>,
    delay: Duration,
    gate: Option<Semaphore>,
    started: Notify,
    in_flight: Mutex<HashSet<String>>,
    overlap: AtomicBool,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeProber {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Block every probe until [`FakeProber::release`] hands out a permit.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn set_reachable(&self, url: &str, reachable: bool) {
        self.reachable.lock().unwrap().insert(url.to_string(), reachable);
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Wait until some probe has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn overlap_detected(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, url: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.in_flight.lock().unwrap().insert(url.to_string()) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.in_flight.lock().unwrap().remove(url);
        self.reachable.lock().unwrap().get(url).copied().unwrap_or(false)
    }
}

