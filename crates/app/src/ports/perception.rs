//! Perception port — the producer of semantic state.
//!
//! How a snapshot is produced (screen capture, template matching, …) is the
//! adapter's business. Handlers call [`StateSource::snapshot`] from inside
//! their evaluation, so it must be cheap and must never wait on network or
//! disk.

use std::sync::Arc;

use condop_domain::error::EvaluationError;
use condop_domain::state::StateSnapshot;

/// Supplies the current [`StateSnapshot`].
pub trait StateSource: Send + Sync {
    /// Return the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::SourceUnavailable`] when no usable snapshot
    /// exists right now (e.g. a dropped capture frame).
    fn snapshot(&self) -> Result<Arc<StateSnapshot>, EvaluationError>;
}

impl<T: StateSource + ?Sized> StateSource for Arc<T> {
    fn snapshot(&self) -> Result<Arc<StateSnapshot>, EvaluationError> {
        (**self).snapshot()
    }
}
