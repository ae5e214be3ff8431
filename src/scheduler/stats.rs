//! Counters describing monitor activity.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MonitorStats {
    ticks: AtomicU64,
    ticks_failed: AtomicU64,
    pipelines_ok: AtomicU64,
    pipelines_failed: AtomicU64,
}

/// Point-in-time copy of [`MonitorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub ticks_failed: u64,
    pub pipelines_ok: u64,
    pub pipelines_failed: u64,
}

impl MonitorStats {
    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_failure(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline(&self, ok: bool) {
        if ok {
            self.pipelines_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pipelines_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            pipelines_ok: self.pipelines_ok.load(Ordering::Relaxed),
            pipelines_failed: self.pipelines_failed.load(Ordering::Relaxed),
        }
    }
}
