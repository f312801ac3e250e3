use std::sync::{Arc, Mutex, PoisonError};

use condop_app::ports::StateSource;
use condop_domain::error::EvaluationError;
use condop_domain::state::StateSnapshot;
use condop_domain::time::TriggerTime;

#[derive(Default)]
struct ScreenState {
    snapshot: Arc<StateSnapshot>,
    failure: Option<String>,
}

/// A screen whose recognised states are set by hand.
///
/// Cloning yields another handle to the same screen, so a feeder task and
/// the handlers reading it can share one instance.
#[derive(Clone, Default)]
pub struct VirtualScreen {
    inner: Arc<Mutex<ScreenState>>,
}

impl VirtualScreen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScreenState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Record that `state` was recognised at `at`.
    pub fn observe(&self, state: &str, at: TriggerTime, value: Option<i64>) {
        self.with_state(|s| Arc::make_mut(&mut s.snapshot).record(state, at, value));
    }

    /// Drop the record of `state`.
    pub fn forget(&self, state: &str) {
        self.with_state(|s| {
            Arc::make_mut(&mut s.snapshot).clear(state);
        });
    }

    /// Replace every record at once.
    pub fn replace(&self, snapshot: StateSnapshot) {
        self.with_state(|s| s.snapshot = Arc::new(snapshot));
    }

    /// Make every following snapshot fail with `reason`, as if capture broke.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.with_state(|s| s.failure = Some(reason));
    }

    pub fn recover(&self) {
        self.with_state(|s| s.failure = None);
    }
}

impl StateSource for VirtualScreen {
    fn snapshot(&self) -> Result<Arc<StateSnapshot>, EvaluationError> {
        self.with_state(|s| match &s.failure {
            Some(reason) => Err(EvaluationError::SourceUnavailable(reason.clone())),
            None => Ok(s.snapshot.clone()),
        })
    }
}
