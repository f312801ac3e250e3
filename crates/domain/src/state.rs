//! State records — what perception reports about the environment.
//!
//! Perception collaborators translate raw screen data into named states
//! (`"dodge_flash"`, `"boss_hp"`, …). Each state remembers the trigger time it
//! was last observed and, optionally, an integer reading. Handlers only ever
//! look at these records, never at the raw data.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::TriggerTime;

/// The latest observation of one named state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// When the state was last observed.
    pub observed_at: TriggerTime,
    /// Optional reading attached to the observation (e.g. a gauge level).
    #[serde(default)]
    pub value: Option<i64>,
}

/// Point-in-time view of every recorded state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    records: BTreeMap<String, StateRecord>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` was observed at `at`, replacing any older record.
    ///
    /// Observations older than the stored one are ignored so that late
    /// perception results never move a state back in time.
    pub fn record(&mut self, name: impl Into<String>, at: TriggerTime, value: Option<i64>) {
        let name = name.into();
        match self.records.get(&name) {
            Some(existing) if existing.observed_at > at => {}
            _ => {
                self.records.insert(
                    name,
                    StateRecord {
                        observed_at: at,
                        value,
                    },
                );
            }
        }
    }

    /// Builder-style variant of [`record`](Self::record).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, at: TriggerTime, value: Option<i64>) -> Self {
        self.record(name, at, value);
        self
    }

    /// Forget a state entirely.
    pub fn clear(&mut self, name: &str) -> Option<StateRecord> {
        self.records.remove(name)
    }

    /// Latest record for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StateRecord> {
        self.records.get(name)
    }

    /// Time elapsed between the last observation of `name` and `now`.
    #[must_use]
    pub fn elapsed_since(&self, name: &str, now: TriggerTime) -> Option<Duration> {
        self.get(name).map(|r| now.saturating_since(r.observed_at))
    }

    /// Latest reading for `name`, if one was attached.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|r| r.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_record_and_read_back_state() {
        let snapshot = StateSnapshot::new().with("dodge_flash", TriggerTime::from_secs(2), None);
        let record = snapshot.get("dodge_flash").unwrap();
        assert_eq!(record.observed_at, TriggerTime::from_secs(2));
        assert!(record.value.is_none());
    }

    #[test]
    fn should_ignore_observation_older_than_stored_one() {
        let mut snapshot = StateSnapshot::new();
        snapshot.record("energy", TriggerTime::from_secs(5), Some(80));
        snapshot.record("energy", TriggerTime::from_secs(3), Some(10));
        assert_eq!(snapshot.value("energy"), Some(80));
    }

    #[test]
    fn should_replace_record_with_newer_observation() {
        let mut snapshot = StateSnapshot::new();
        snapshot.record("energy", TriggerTime::from_secs(3), Some(10));
        snapshot.record("energy", TriggerTime::from_secs(5), Some(80));
        assert_eq!(snapshot.value("energy"), Some(80));
    }

    #[test]
    fn should_compute_elapsed_since_last_observation() {
        let snapshot = StateSnapshot::new().with("boss", TriggerTime::from_secs(4), None);
        assert_eq!(
            snapshot.elapsed_since("boss", TriggerTime::from_secs(10)),
            Some(Duration::from_secs(6))
        );
        assert_eq!(snapshot.elapsed_since("missing", TriggerTime::from_secs(10)), None);
    }

    #[test]
    fn should_clear_state() {
        let mut snapshot = StateSnapshot::new().with("boss", TriggerTime::ZERO, None);
        assert!(snapshot.clear("boss").is_some());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn should_iterate_in_name_order() {
        let snapshot = StateSnapshot::new()
            .with("b", TriggerTime::ZERO, None)
            .with("a", TriggerTime::ZERO, None);
        let names: Vec<_> = snapshot.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
