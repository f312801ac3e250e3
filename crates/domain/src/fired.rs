//! Fired records — what the scheduler last dispatched, for display.

use serde::{Deserialize, Serialize};

use crate::id::{FireId, RunId};
use crate::time::{Timestamp, TriggerTime};

/// How a fired sequence ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SequenceOutcome {
    /// Still executing.
    InProgress,
    /// Every operation completed (or was left running in the background).
    Completed,
    /// Operation `index` failed; the rest of the sequence was skipped.
    Failed { index: usize, reason: String },
    /// Stop or scene switch interrupted the sequence before operation `index`
    /// finished.
    Interrupted { index: usize },
}

/// The last operation sequence the scheduler fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredSequence {
    pub id: FireId,
    pub run_id: RunId,
    pub scene: String,
    pub handler: String,
    /// Human-readable labels of the operations, in execution order.
    pub operations: Vec<String>,
    pub trigger_time: TriggerTime,
    pub fired_at: Timestamp,
    pub outcome: SequenceOutcome,
}
