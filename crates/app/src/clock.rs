//! Clock implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use condop_domain::time::TriggerTime;
use tokio::time::Instant;

use crate::ports::Clock;

/// Clock backed by [`tokio::time::Instant`], measured from construction.
///
/// Follows tokio's paused test clock, so timer-driven tests stay
/// deterministic.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> TriggerTime {
        TriggerTime::from_elapsed(self.epoch.elapsed())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `at`.
    pub fn set(&self, at: TriggerTime) {
        self.micros.store(to_micros(at.elapsed()), Ordering::SeqCst);
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(to_micros(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TriggerTime {
        TriggerTime::from_elapsed(Duration::from_micros(self.micros.load(Ordering::SeqCst)))
    }
}

fn to_micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}
