//! Declarative condition handler with debounce and cooldown.

use std::sync::Arc;
use std::time::Duration;

use condop_domain::condition::Condition;
use condop_domain::error::{DispatchError, DisposalError, EvaluationError, ValidationError};
use condop_domain::scene::HandlerConfig;
use condop_domain::time::TriggerTime;

use crate::ports::{AtomicOp, OpFactory, OpSequence, StateHandler, StateSource};

/// Where a [`ConditionHandler`] is in its fire cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready to fire as soon as the condition holds long enough.
    Armed,
    /// The condition has held for `streak` consecutive ticks, not yet enough.
    Pending { streak: u32 },
    /// Recently fired; ignores its condition until `until`.
    CoolingDown { until: TriggerTime },
}

/// Fires a fixed operation sequence when a [`Condition`] holds.
///
/// - **Debounce**: the condition must hold on `debounce_ticks` consecutive
///   evaluations before the handler fires. A false evaluation or a failed
///   snapshot resets the streak.
/// - **Cooldown**: after firing, the handler reports no match until
///   `cooldown` has elapsed (measured in trigger time).
///
/// The operations are built once and reused on every fire; they are disposed
/// with the handler.
pub struct ConditionHandler<S> {
    name: String,
    condition: Condition,
    debounce_ticks: u32,
    cooldown: Duration,
    ops: OpSequence,
    source: S,
    phase: Phase,
    last_fired: Option<TriggerTime>,
    disposed: bool,
}

impl<S: StateSource> ConditionHandler<S> {
    /// Handler that fires `ops` on every tick its condition holds.
    #[must_use]
    pub fn new(name: impl Into<String>, condition: Condition, ops: OpSequence, source: S) -> Self {
        Self {
            name: name.into(),
            condition,
            debounce_ticks: 1,
            cooldown: Duration::ZERO,
            ops,
            source,
            phase: Phase::Armed,
            last_fired: None,
            disposed: false,
        }
    }

    /// Require `ticks` consecutive matches before firing. Zero counts as one.
    #[must_use]
    pub fn with_debounce_ticks(mut self, ticks: u32) -> Self {
        self.debounce_ticks = ticks.max(1);
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Build from configuration, realising each op spec through `ops`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the configuration is invalid or an
    /// operation cannot be built. Operations built before the failure are
    /// disposed.
    pub fn from_config(
        config: &HandlerConfig,
        source: S,
        ops: &impl OpFactory,
    ) -> Result<Self, DispatchError> {
        config.validate()?;

        let mut built: Vec<Arc<dyn AtomicOp>> = Vec::with_capacity(config.operations.len());
        for spec in &config.operations {
            match ops.build(spec) {
                Ok(op) => built.push(op),
                Err(err) => {
                    for op in &built {
                        op.dispose();
                    }
                    return Err(err);
                }
            }
        }
        let Some(sequence) = OpSequence::new(built) else {
            return Err(ValidationError::NoOperations(config.name.clone()).into());
        };

        Ok(Self::new(
            config.name.clone(),
            config.condition.clone(),
            sequence,
            source,
        )
        .with_debounce_ticks(config.debounce_ticks)
        .with_cooldown(config.cooldown()))
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Trigger time of the most recent fire.
    #[must_use]
    pub fn last_fired(&self) -> Option<TriggerTime> {
        self.last_fired
    }

    fn fire(&mut self, at: TriggerTime) -> OpSequence {
        self.last_fired = Some(at);
        self.phase = if self.cooldown.is_zero() {
            Phase::Armed
        } else {
            Phase::CoolingDown {
                until: at.saturating_add(self.cooldown),
            }
        };
        tracing::trace!(handler = %self.name, %at, phase = ?self.phase, "condition handler fired");
        self.ops.clone()
    }
}

impl<S: StateSource> StateHandler for ConditionHandler<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_operations(
        &mut self,
        trigger_time: TriggerTime,
    ) -> Result<Option<OpSequence>, EvaluationError> {
        if self.disposed {
            return Ok(None);
        }

        if let Phase::CoolingDown { until } = self.phase {
            if trigger_time < until {
                return Ok(None);
            }
            self.phase = Phase::Armed;
        }

        let snapshot = match self.source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.phase = Phase::Armed;
                return Err(err);
            }
        };

        if !self.condition.evaluate(&snapshot, trigger_time) {
            self.phase = Phase::Armed;
            return Ok(None);
        }

        let streak = match self.phase {
            Phase::Pending { streak } => streak.saturating_add(1),
            Phase::Armed | Phase::CoolingDown { .. } => 1,
        };
        if streak < self.debounce_ticks {
            self.phase = Phase::Pending { streak };
            return Ok(None);
        }

        Ok(Some(self.fire(trigger_time)))
    }

    fn dispose(&mut self) -> Result<(), DisposalError> {
        if !self.disposed {
            self.ops.dispose_all();
            self.disposed = true;
        }
        Ok(())
    }
}
