//! Scene handler — strict first-match evaluation over ordered state handlers.
//!
//! A scene owns its handlers exclusively. On every tick it asks them in list
//! order and keeps the **first** match; ties always go to the earlier
//! handler. Disposal cascades to every handler exactly once, even when some
//! of them fail to release their resources.

use std::time::Duration;

use condop_domain::error::{DisposalError, EvaluationError, ValidationError};
use condop_domain::scene::EvaluationMode;
use condop_domain::time::TriggerTime;

use crate::ports::{OpSequence, StateHandler};

/// Consecutive evaluation failures after which a handler is reported as
/// persistently failing.
pub const DEFAULT_FAILURE_WARN_THRESHOLD: u32 = 10;

/// The winning handler of one tick.
#[derive(Debug, Clone)]
pub struct Match {
    /// Position of the handler in the scene (0 = highest priority).
    pub index: usize,
    pub handler: String,
    pub operations: OpSequence,
}

/// A handler that could not evaluate on this tick.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub index: usize,
    pub handler: String,
    pub error: EvaluationError,
    /// How many ticks in a row this handler has failed, this one included.
    pub consecutive: u32,
}

/// Everything one tick of evaluation produced.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub matched: Option<Match>,
    pub failures: Vec<HandlerFailure>,
}

struct Slot {
    handler: Box<dyn StateHandler>,
    consecutive_failures: u32,
}

/// One operating context: ordered handlers plus a polling interval.
pub struct SceneHandler {
    name: String,
    interval: Duration,
    mode: EvaluationMode,
    failure_warn_threshold: u32,
    slots: Vec<Slot>,
    disposed: bool,
}

impl SceneHandler {
    /// Create a scene. `handlers` are in priority order, highest first.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInterval`] when `interval` is zero.
    /// The handlers are disposed in that case.
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        handlers: Vec<Box<dyn StateHandler>>,
    ) -> Result<Self, ValidationError> {
        let mut scene = Self {
            name: name.into(),
            interval,
            mode: EvaluationMode::default(),
            failure_warn_threshold: DEFAULT_FAILURE_WARN_THRESHOLD,
            slots: handlers
                .into_iter()
                .map(|handler| Slot {
                    handler,
                    consecutive_failures: 0,
                })
                .collect(),
            disposed: false,
        };
        if interval.is_zero() {
            // the handlers were handed over, so they are ours to release
            if let Err(errors) = scene.dispose() {
                tracing::debug!(scene = %scene.name, failed = errors.len(), "rejected scene left handlers behind");
            }
            return Err(ValidationError::InvalidInterval(0.0));
        }
        Ok(scene)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report a handler as persistently failing after `threshold`
    /// consecutive failures. Zero counts as one.
    #[must_use]
    pub fn with_failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.failure_warn_threshold = threshold.max(1);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    /// Handler names in priority order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.handler.name()).collect()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Operations of the first matching handler, or `None`.
    ///
    /// Evaluation failures count as "no match"; use
    /// [`evaluate`](Self::evaluate) to see them.
    pub fn get_operations(&mut self, trigger_time: TriggerTime) -> Option<OpSequence> {
        self.evaluate(trigger_time).matched.map(|m| m.operations)
    }

    /// Ask the handlers in priority order at `trigger_time`.
    ///
    /// In [`EvaluationMode::FirstMatch`] the walk stops at the first match.
    /// In [`EvaluationMode::EvaluateAll`] every handler is asked and later
    /// matches are discarded. A failing handler never stops the walk.
    ///
    /// A disposed scene asks nobody and matches nothing.
    pub fn evaluate(&mut self, trigger_time: TriggerTime) -> Evaluation {
        let mut evaluation = Evaluation::default();
        if self.disposed {
            tracing::debug!(scene = %self.name, "evaluation skipped, scene disposed");
            return evaluation;
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let name = slot.handler.name().to_string();
            match slot.handler.get_operations(trigger_time) {
                Ok(result) => {
                    slot.consecutive_failures = 0;
                    let Some(operations) = result else {
                        tracing::trace!(scene = %self.name, handler = %name, %trigger_time, "no match");
                        continue;
                    };
                    if evaluation.matched.is_some() {
                        tracing::trace!(scene = %self.name, handler = %name, "lower-priority match discarded");
                        continue;
                    }
                    tracing::debug!(scene = %self.name, handler = %name, index, %trigger_time, "handler matched");
                    evaluation.matched = Some(Match {
                        index,
                        handler: name,
                        operations,
                    });
                    if self.mode == EvaluationMode::FirstMatch {
                        break;
                    }
                }
                Err(error) => {
                    slot.consecutive_failures = slot.consecutive_failures.saturating_add(1);
                    let consecutive = slot.consecutive_failures;
                    if consecutive == self.failure_warn_threshold {
                        tracing::warn!(
                            scene = %self.name,
                            handler = %name,
                            consecutive,
                            %error,
                            "handler keeps failing to evaluate"
                        );
                    } else {
                        tracing::debug!(scene = %self.name, handler = %name, consecutive, %error, "handler evaluation failed");
                    }
                    evaluation.failures.push(HandlerFailure {
                        index,
                        handler: name,
                        error,
                        consecutive,
                    });
                }
            }
        }

        evaluation
    }

    /// Dispose every handler exactly once.
    ///
    /// Keeps going after a failure and returns every collected error. Calling
    /// it again is a no-op that returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the [`DisposalError`]s reported by the handlers, in handler
    /// order.
    pub fn dispose(&mut self) -> Result<(), Vec<DisposalError>> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        let mut errors = Vec::new();
        for slot in &mut self.slots {
            if let Err(err) = slot.handler.dispose() {
                tracing::warn!(scene = %self.name, handler = slot.handler.name(), %err, "handler disposal failed");
                errors.push(err);
            }
        }
        tracing::debug!(scene = %self.name, handlers = self.slots.len(), failed = errors.len(), "scene disposed");

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Drop for SceneHandler {
    fn drop(&mut self) {
        if !self.disposed {
            tracing::warn!(scene = %self.name, "scene dropped without disposal, disposing now");
            if let Err(errors) = self.dispose() {
                tracing::debug!(scene = %self.name, failed = errors.len(), "dropped scene left handlers behind");
            }
        }
    }
}

impl std::fmt::Debug for SceneHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHandler")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("mode", &self.mode)
            .field("handlers", &self.handler_names())
            .field("disposed", &self.disposed)
            .finish()
    }
}
