//! State handler port — one condition and the operations it triggers.

use condop_domain::error::{DisposalError, EvaluationError};
use condop_domain::time::TriggerTime;

use crate::ports::operation::OpSequence;

/// Maps a trigger time to an optional operation sequence.
///
/// A handler is owned by exactly one [`SceneHandler`](crate::scene_handler::SceneHandler)
/// and its priority is its position in that scene's list.
///
/// # Contract
///
/// - [`get_operations`](Self::get_operations) depends only on `trigger_time`,
///   the handler's own state and already-available perception data. It must
///   not block. Debounce and cooldown are computed from `trigger_time`, never
///   from a wall clock, so identical inputs replay identically.
/// - An evaluation failure is reported as `Err`; the owning scene treats it as
///   "no match" for that tick and moves on to the next handler.
/// - [`dispose`](Self::dispose) is called exactly once by the owning scene,
///   possibly before any evaluation. It must not panic.
pub trait StateHandler: Send {
    /// Name used in logs, events and fired records.
    fn name(&self) -> &str;

    /// Evaluate the condition at `trigger_time`.
    ///
    /// Returns `Ok(None)` when the condition does not hold.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when the condition cannot be decided
    /// this tick.
    fn get_operations(
        &mut self,
        trigger_time: TriggerTime,
    ) -> Result<Option<OpSequence>, EvaluationError>;

    /// Release every resource the handler holds.
    ///
    /// # Errors
    ///
    /// Returns a [`DisposalError`] describing what could not be released.
    /// Remaining resources must still be released before returning.
    fn dispose(&mut self) -> Result<(), DisposalError>;
}
