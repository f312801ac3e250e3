//! Time and timestamp helpers.
//!
//! Two notions of time coexist:
//! - [`Timestamp`] is wall-clock UTC, used for records shown to people
//!   (`fired_at`, event times).
//! - [`TriggerTime`] is a monotonic offset from the scheduler's epoch. It is
//!   the only time handlers ever see, which keeps them deterministic: tests
//!   drive them with synthetic trigger times.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UTC timestamp used for event times and fired records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Monotonic instant, expressed as the elapsed time since a clock epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerTime(Duration);

impl TriggerTime {
    /// The clock epoch.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Build from an elapsed duration.
    #[must_use]
    pub const fn from_elapsed(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    /// Build from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Build from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Build from fractional seconds. Negative or non-finite input clamps to
    /// [`TriggerTime::ZERO`].
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
    }

    /// Elapsed time since the epoch.
    #[must_use]
    pub const fn elapsed(self) -> Duration {
        self.0
    }

    /// Elapsed seconds since the epoch.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Time between `earlier` and `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// `self + offset`, saturating at the maximum representable time.
    #[must_use]
    pub fn saturating_add(self, offset: Duration) -> Self {
        Self(self.0.saturating_add(offset))
    }
}

impl fmt::Display for TriggerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Convert a seconds value from configuration into a [`Duration`].
///
/// Returns `None` for negative, NaN or infinite input.
#[must_use]
pub fn duration_from_secs_f64(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}
