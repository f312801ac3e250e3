//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running totals kept by the scheduler. Cheap to bump from the tick loop.
#[derive(Debug, Default)]
pub struct DispatchStats {
    ticks: AtomicU64,
    fired: AtomicU64,
    completed: AtomicU64,
    interrupted: AtomicU64,
    evaluation_failures: AtomicU64,
    execution_failures: AtomicU64,
    disposal_failures: AtomicU64,
    scenes_started: AtomicU64,
    scene_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub fired: u64,
    pub completed: u64,
    pub interrupted: u64,
    pub evaluation_failures: u64,
    pub execution_failures: u64,
    pub disposal_failures: u64,
    pub scenes_started: u64,
    pub scene_failures: u64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl DispatchStats {
    pub fn record_tick(&self) {
        bump(&self.ticks, 1);
    }

    pub fn record_fired(&self) {
        bump(&self.fired, 1);
    }

    pub fn record_completed(&self) {
        bump(&self.completed, 1);
    }

    pub fn record_interrupted(&self) {
        bump(&self.interrupted, 1);
    }

    pub fn record_evaluation_failures(&self, count: usize) {
        bump(&self.evaluation_failures, count as u64);
    }

    pub fn record_execution_failure(&self) {
        bump(&self.execution_failures, 1);
    }

    pub fn record_disposal_failures(&self, count: usize) {
        bump(&self.disposal_failures, count as u64);
    }

    pub fn record_scene_started(&self) {
        bump(&self.scenes_started, 1);
    }

    pub fn record_scene_failure(&self) {
        bump(&self.scene_failures, 1);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            evaluation_failures: self.evaluation_failures.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            disposal_failures: self.disposal_failures.load(Ordering::Relaxed),
            scenes_started: self.scenes_started.load(Ordering::Relaxed),
            scene_failures: self.scene_failures.load(Ordering::Relaxed),
        }
    }
}
