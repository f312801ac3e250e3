//! Condition — a declarative predicate over state records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::state::StateSnapshot;
use crate::time::{TriggerTime, duration_from_secs_f64};

/// A predicate evaluated against a [`StateSnapshot`] at a given trigger time.
///
/// Evaluation is pure: the same snapshot and trigger time always give the
/// same answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Always holds.
    #[default]
    Always,
    /// Never holds.
    Never,
    /// The state was observed no more than `within_seconds` ago.
    Seen {
        state: String,
        within_seconds: f64,
    },
    /// The state carries a reading of at least `min`.
    ValueAtLeast { state: String, min: i64 },
    /// The state carries a reading strictly below `max`.
    ValueBelow { state: String, max: i64 },
    /// Every nested condition holds. Empty means true.
    All { of: Vec<Condition> },
    /// At least one nested condition holds. Empty means false.
    Any { of: Vec<Condition> },
    /// The nested condition does not hold.
    Not { condition: Box<Condition> },
}

impl Condition {
    /// Evaluate the predicate.
    #[must_use]
    pub fn evaluate(&self, snapshot: &StateSnapshot, now: TriggerTime) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Seen {
                state,
                within_seconds,
            } => {
                let Some(window) = duration_from_secs_f64(*within_seconds) else {
                    return false;
                };
                snapshot
                    .get(state)
                    // an observation stamped after `now` is treated as current
                    .is_some_and(|r| now.saturating_since(r.observed_at) <= window)
            }
            Self::ValueAtLeast { state, min } => snapshot.value(state).is_some_and(|v| v >= *min),
            Self::ValueBelow { state, max } => snapshot.value(state).is_some_and(|v| v < *max),
            Self::All { of } => of.iter().all(|c| c.evaluate(snapshot, now)),
            Self::Any { of } => of.iter().any(|c| c.evaluate(snapshot, now)),
            Self::Not { condition } => !condition.evaluate(snapshot, now),
        }
    }

    /// Check that every time window is a valid duration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidWindow`] for a negative or
    /// non-finite `within_seconds`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Seen { within_seconds, .. } => {
                if duration_from_secs_f64(*within_seconds).is_none() {
                    return Err(ValidationError::InvalidWindow(*within_seconds));
                }
                Ok(())
            }
            Self::All { of } | Self::Any { of } => of.iter().try_for_each(Self::validate),
            Self::Not { condition } => condition.validate(),
            Self::Always | Self::Never | Self::ValueAtLeast { .. } | Self::ValueBelow { .. } => {
                Ok(())
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::Never => f.write_str("never"),
            Self::Seen {
                state,
                within_seconds,
            } => write!(f, "seen({state}, {within_seconds}s)"),
            Self::ValueAtLeast { state, min } => write!(f, "{state} >= {min}"),
            Self::ValueBelow { state, max } => write!(f, "{state} < {max}"),
            Self::All { of } => write_joined(f, "all", of),
            Self::Any { of } => write_joined(f, "any", of),
            Self::Not { condition } => write!(f, "not({condition})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, name: &str, of: &[Condition]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, c) in of.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(state: &str, within_seconds: f64) -> Condition {
        Condition::Seen {
            state: state.to_string(),
            within_seconds,
        }
    }

    #[test]
    fn should_hold_when_state_seen_inside_window() {
        let snapshot = StateSnapshot::new().with("flash", TriggerTime::from_secs(9), None);
        assert!(seen("flash", 1.0).evaluate(&snapshot, TriggerTime::from_secs(10)));
    }

    #[test]
    fn should_not_hold_when_state_seen_outside_window() {
        let snapshot = StateSnapshot::new().with("flash", TriggerTime::from_secs(5), None);
        assert!(!seen("flash", 1.0).evaluate(&snapshot, TriggerTime::from_secs(10)));
    }

    #[test]
    fn should_not_hold_when_state_never_seen() {
        assert!(!seen("flash", 60.0).evaluate(&StateSnapshot::new(), TriggerTime::ZERO));
    }

    #[test]
    fn should_compare_values() {
        let snapshot = StateSnapshot::new().with("energy", TriggerTime::ZERO, Some(50));
        let at_least = Condition::ValueAtLeast {
            state: "energy".to_string(),
            min: 50,
        };
        let below = Condition::ValueBelow {
            state: "energy".to_string(),
            max: 50,
        };
        assert!(at_least.evaluate(&snapshot, TriggerTime::ZERO));
        assert!(!below.evaluate(&snapshot, TriggerTime::ZERO));
    }

    #[test]
    fn should_not_hold_value_condition_without_reading() {
        let snapshot = StateSnapshot::new().with("energy", TriggerTime::ZERO, None);
        let c = Condition::ValueAtLeast {
            state: "energy".to_string(),
            min: 0,
        };
        assert!(!c.evaluate(&snapshot, TriggerTime::ZERO));
    }

    #[test]
    fn should_combine_conditions() {
        let snapshot = StateSnapshot::new().with("a", TriggerTime::ZERO, None);
        let all = Condition::All {
            of: vec![seen("a", 1.0), Condition::Always],
        };
        let any = Condition::Any {
            of: vec![seen("b", 1.0), Condition::Never],
        };
        let not = Condition::Not {
            condition: Box::new(any.clone()),
        };
        assert!(all.evaluate(&snapshot, TriggerTime::ZERO));
        assert!(!any.evaluate(&snapshot, TriggerTime::ZERO));
        assert!(not.evaluate(&snapshot, TriggerTime::ZERO));
    }

    #[test]
    fn should_treat_empty_all_as_true_and_empty_any_as_false() {
        let snapshot = StateSnapshot::new();
        assert!(Condition::All { of: vec![] }.evaluate(&snapshot, TriggerTime::ZERO));
        assert!(!Condition::Any { of: vec![] }.evaluate(&snapshot, TriggerTime::ZERO));
    }

    #[test]
    fn should_reject_negative_window_nested_in_combinator() {
        let c = Condition::Not {
            condition: Box::new(Condition::All {
                of: vec![seen("a", -1.0)],
            }),
        };
        assert_eq!(c.validate(), Err(ValidationError::InvalidWindow(-1.0)));
    }

    #[test]
    fn should_display_nested_condition() {
        let c = Condition::All {
            of: vec![seen("flash", 0.5), Condition::Not {
                condition: Box::new(Condition::Never),
            }],
        };
        assert_eq!(c.to_string(), "all(seen(flash, 0.5s), not(never))");
    }

    #[test]
    fn should_deserialize_seen_from_tagged_json() {
        let json = serde_json::json!({
            "type": "seen",
            "state": "flash",
            "within_seconds": 0.3
        });
        let c: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(c, seen("flash", 0.3));
    }

    #[test]
    fn should_deserialize_nested_not_from_tagged_json() {
        let json = serde_json::json!({
            "type": "not",
            "condition": { "type": "always" }
        });
        let c: Condition = serde_json::from_value(json).unwrap();
        assert!(matches!(c, Condition::Not { .. }));
    }
}
