//! Closure-backed state handler.

use condop_domain::error::{DisposalError, EvaluationError};
use condop_domain::time::TriggerTime;

use crate::ports::{OpSequence, StateHandler};

type EvaluateFn =
    Box<dyn FnMut(TriggerTime) -> Result<Option<OpSequence>, EvaluationError> + Send>;
type DisposeFn = Box<dyn FnOnce() -> Result<(), DisposalError> + Send>;

/// A [`StateHandler`] whose evaluation is a closure.
///
/// Operations registered with [`owning`](Self::owning) are disposed together
/// with the handler.
pub struct FnHandler {
    name: String,
    evaluate: EvaluateFn,
    on_dispose: Option<DisposeFn>,
    owned: Vec<OpSequence>,
}

impl FnHandler {
    #[must_use]
    pub fn new<F>(name: impl Into<String>, evaluate: F) -> Self
    where
        F: FnMut(TriggerTime) -> Result<Option<OpSequence>, EvaluationError> + Send + 'static,
    {
        Self {
            name: name.into(),
            evaluate: Box::new(evaluate),
            on_dispose: None,
            owned: Vec::new(),
        }
    }

    /// Run `f` when the handler is disposed.
    #[must_use]
    pub fn on_dispose<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Result<(), DisposalError> + Send + 'static,
    {
        self.on_dispose = Some(Box::new(f));
        self
    }

    /// Dispose `ops` when the handler is disposed.
    #[must_use]
    pub fn owning(mut self, ops: OpSequence) -> Self {
        self.owned.push(ops);
        self
    }
}

impl StateHandler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_operations(
        &mut self,
        trigger_time: TriggerTime,
    ) -> Result<Option<OpSequence>, EvaluationError> {
        (self.evaluate)(trigger_time)
    }

    fn dispose(&mut self) -> Result<(), DisposalError> {
        for ops in self.owned.drain(..) {
            ops.dispose_all();
        }
        match self.on_dispose.take() {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}
