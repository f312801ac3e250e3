//! Scene configuration — an operating context with ordered handlers.
//!
//! A [`SceneConfig`] lists its handlers highest priority first. The order is
//! load-bearing: the scheduler fires the first handler whose condition holds,
//! so interrupt-style handlers (dodge, emergency heal) must come before
//! routine ones (basic attack).

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::ValidationError;
use crate::operation::OpSpec;
use crate::time::duration_from_secs_f64;

/// Longest accepted polling interval.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// How a scene consults its handlers on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Stop at the first handler that matches; lower-priority handlers are
    /// not asked on that tick.
    #[default]
    FirstMatch,
    /// Ask every handler on every tick so their internal bookkeeping
    /// advances; only the highest-priority match is kept.
    EvaluateAll,
}

/// Declarative description of one state handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub name: String,
    /// Defaults to [`Condition::Always`].
    #[serde(default)]
    pub condition: Condition,
    /// Consecutive ticks the condition must hold before the handler fires.
    #[serde(default = "default_debounce_ticks")]
    pub debounce_ticks: u32,
    /// Minimum time between two fires of this handler.
    #[serde(default)]
    pub cooldown_seconds: f64,
    pub operations: Vec<OpSpec>,
}

fn default_debounce_ticks() -> u32 {
    1
}

impl HandlerConfig {
    /// Create a builder for constructing a [`HandlerConfig`].
    #[must_use]
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::default()
    }

    /// Cooldown as a [`Duration`]. Invalid values map to zero; call
    /// [`validate`](Self::validate) to reject them instead.
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        duration_from_secs_f64(self.cooldown_seconds).unwrap_or(Duration::ZERO)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `operations` is empty ([`ValidationError::NoOperations`])
    /// - `cooldown_seconds` is negative or not finite ([`ValidationError::InvalidCooldown`])
    /// - the condition or an operation spec is invalid
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.operations.is_empty() {
            return Err(ValidationError::NoOperations(self.name.clone()));
        }
        if duration_from_secs_f64(self.cooldown_seconds).is_none() {
            return Err(ValidationError::InvalidCooldown(self.cooldown_seconds));
        }
        self.condition.validate()?;
        self.operations.iter().try_for_each(OpSpec::validate)
    }
}

/// Step-by-step builder for [`HandlerConfig`].
#[derive(Debug, Default)]
pub struct HandlerConfigBuilder {
    name: Option<String>,
    condition: Option<Condition>,
    debounce_ticks: Option<u32>,
    cooldown_seconds: f64,
    operations: Vec<OpSpec>,
}

impl HandlerConfigBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn debounce_ticks(mut self, ticks: u32) -> Self {
        self.debounce_ticks = Some(ticks);
        self
    }

    #[must_use]
    pub fn cooldown_seconds(mut self, seconds: f64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn operation(mut self, op: OpSpec) -> Self {
        self.operations.push(op);
        self
    }

    /// Consume the builder, validate, and return a [`HandlerConfig`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if required fields are missing or invalid.
    pub fn build(self) -> Result<HandlerConfig, ValidationError> {
        let config = HandlerConfig {
            name: self.name.unwrap_or_default(),
            condition: self.condition.unwrap_or(Condition::Always),
            debounce_ticks: self.debounce_ticks.unwrap_or_else(default_debounce_ticks),
            cooldown_seconds: self.cooldown_seconds,
            operations: self.operations,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Declarative description of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub name: String,
    /// Minimum time between two ticks of this scene.
    pub interval_seconds: f64,
    #[serde(default)]
    pub evaluation: EvaluationMode,
    /// Handlers in priority order, highest first.
    pub handlers: Vec<HandlerConfig>,
}

impl SceneConfig {
    /// Create a builder for constructing a [`SceneConfig`].
    #[must_use]
    pub fn builder() -> SceneConfigBuilder {
        SceneConfigBuilder::default()
    }

    /// Polling interval as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInterval`] unless the interval is
    /// greater than zero and at most [`MAX_INTERVAL`].
    pub fn interval(&self) -> Result<Duration, ValidationError> {
        match duration_from_secs_f64(self.interval_seconds) {
            Some(d) if !d.is_zero() && d <= MAX_INTERVAL => Ok(d),
            _ => Err(ValidationError::InvalidInterval(self.interval_seconds)),
        }
    }

    /// Check domain invariants, including every handler's.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the interval is not in `(0, MAX_INTERVAL]` ([`ValidationError::InvalidInterval`])
    /// - there are no handlers ([`ValidationError::NoHandlers`])
    /// - two handlers share a name ([`ValidationError::DuplicateHandler`])
    /// - any handler is invalid
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.interval()?;
        if self.handlers.is_empty() {
            return Err(ValidationError::NoHandlers(self.name.clone()));
        }
        let mut seen = HashSet::new();
        for handler in &self.handlers {
            handler.validate()?;
            if !seen.insert(handler.name.as_str()) {
                return Err(ValidationError::DuplicateHandler(handler.name.clone()));
            }
        }
        Ok(())
    }
}

/// Step-by-step builder for [`SceneConfig`].
#[derive(Debug, Default)]
pub struct SceneConfigBuilder {
    name: Option<String>,
    interval_seconds: Option<f64>,
    evaluation: EvaluationMode,
    handlers: Vec<HandlerConfig>,
}

impl SceneConfigBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn interval_seconds(mut self, seconds: f64) -> Self {
        self.interval_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn evaluation(mut self, mode: EvaluationMode) -> Self {
        self.evaluation = mode;
        self
    }

    /// Append a handler below every handler added so far.
    #[must_use]
    pub fn handler(mut self, handler: HandlerConfig) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Consume the builder, validate, and return a [`SceneConfig`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if required fields are missing or invalid.
    pub fn build(self) -> Result<SceneConfig, ValidationError> {
        let config = SceneConfig {
            name: self.name.unwrap_or_default(),
            interval_seconds: self.interval_seconds.unwrap_or(0.0),
            evaluation: self.evaluation,
            handlers: self.handlers,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str) -> OpSpec {
        OpSpec::Press {
            key: key.to_string(),
            hold_ms: 0,
        }
    }

    fn handler(name: &str) -> HandlerConfig {
        HandlerConfig::builder()
            .name(name)
            .operation(press("j"))
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_scene_when_required_fields_provided() {
        let scene = SceneConfig::builder()
            .name("combat")
            .interval_seconds(0.02)
            .handler(handler("dodge"))
            .handler(handler("attack"))
            .build()
            .unwrap();
        assert_eq!(scene.handlers.len(), 2);
        assert_eq!(scene.handlers[0].name, "dodge");
        assert_eq!(scene.evaluation, EvaluationMode::FirstMatch);
        assert_eq!(scene.interval().unwrap(), Duration::from_millis(20));
    }

    #[test]
    fn should_default_handler_to_always_and_single_tick_debounce() {
        let h = handler("attack");
        assert_eq!(h.condition, Condition::Always);
        assert_eq!(h.debounce_ticks, 1);
        assert_eq!(h.cooldown(), Duration::ZERO);
    }

    #[test]
    fn should_reject_zero_interval() {
        let result = SceneConfig::builder()
            .name("combat")
            .interval_seconds(0.0)
            .handler(handler("attack"))
            .build();
        assert_eq!(result, Err(ValidationError::InvalidInterval(0.0)));
    }

    #[test]
    fn should_reject_non_finite_interval() {
        let result = SceneConfig::builder()
            .name("combat")
            .interval_seconds(f64::INFINITY)
            .handler(handler("attack"))
            .build();
        assert!(matches!(result, Err(ValidationError::InvalidInterval(_))));
    }

    #[test]
    fn should_reject_interval_longer_than_an_hour() {
        let result = SceneConfig::builder()
            .name("slow")
            .interval_seconds(1.0e19)
            .handler(handler("attack"))
            .build();
        assert_eq!(result, Err(ValidationError::InvalidInterval(1.0e19)));

        let hourly = SceneConfig::builder()
            .name("slow")
            .interval_seconds(3600.0)
            .handler(handler("attack"))
            .build();
        assert!(hourly.is_ok());
    }

    #[test]
    fn should_reject_scene_without_handlers() {
        let result = SceneConfig::builder()
            .name("idle")
            .interval_seconds(1.0)
            .build();
        assert_eq!(result, Err(ValidationError::NoHandlers("idle".to_string())));
    }

    #[test]
    fn should_reject_duplicate_handler_names() {
        let result = SceneConfig::builder()
            .name("combat")
            .interval_seconds(1.0)
            .handler(handler("attack"))
            .handler(handler("attack"))
            .build();
        assert_eq!(
            result,
            Err(ValidationError::DuplicateHandler("attack".to_string()))
        );
    }

    #[test]
    fn should_reject_handler_without_operations() {
        let result = HandlerConfig::builder().name("noop").build();
        assert_eq!(result, Err(ValidationError::NoOperations("noop".to_string())));
    }

    #[test]
    fn should_reject_negative_cooldown() {
        let result = HandlerConfig::builder()
            .name("attack")
            .cooldown_seconds(-1.0)
            .operation(press("j"))
            .build();
        assert_eq!(result, Err(ValidationError::InvalidCooldown(-1.0)));
    }

    #[test]
    fn should_reject_empty_scene_name() {
        let result = SceneConfig::builder()
            .interval_seconds(1.0)
            .handler(handler("attack"))
            .build();
        assert_eq!(result, Err(ValidationError::EmptyName));
    }

    #[test]
    fn should_deserialize_scene_from_json_with_defaults() {
        let json = serde_json::json!({
            "name": "combat",
            "interval_seconds": 0.05,
            "handlers": [{
                "name": "dodge",
                "condition": { "type": "seen", "state": "flash", "within_seconds": 0.3 },
                "operations": [{ "type": "press", "key": "shift" }]
            }]
        });
        let scene: SceneConfig = serde_json::from_value(json).unwrap();
        assert_eq!(scene.evaluation, EvaluationMode::FirstMatch);
        assert_eq!(scene.handlers[0].debounce_ticks, 1);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn should_deserialize_evaluate_all_mode() {
        let json = serde_json::json!({
            "name": "combat",
            "interval_seconds": 0.05,
            "evaluation": "evaluate_all",
            "handlers": []
        });
        let scene: SceneConfig = serde_json::from_value(json).unwrap();
        assert_eq!(scene.evaluation, EvaluationMode::EvaluateAll);
    }
}
