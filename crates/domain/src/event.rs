//! Dispatch events — an immutable record of something the scheduler did.
//!
//! Events carry a loosely structured JSON payload so that observers (a log
//! sink, a UI) can display them without depending on every internal type.

use serde::{Deserialize, Serialize};

use crate::id::{EventId, RunId};
use crate::time::{Timestamp, now};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SceneStarted,
    SceneStopped,
    /// The tick loop died without being asked to stop.
    SceneFailed,
    SequenceFired,
    SequenceCompleted,
    EvaluationFailed,
    ExecutionFailed,
    DisposalFailed,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SceneStarted => "scene_started",
            Self::SceneStopped => "scene_stopped",
            Self::SceneFailed => "scene_failed",
            Self::SequenceFired => "sequence_fired",
            Self::SequenceCompleted => "sequence_completed",
            Self::EvaluationFailed => "evaluation_failed",
            Self::ExecutionFailed => "execution_failed",
            Self::DisposalFailed => "disposal_failed",
        };
        f.write_str(s)
    }
}

/// A single observable event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub id: EventId,
    pub event_type: EventType,
    /// Scene activation the event belongs to.
    pub run_id: Option<RunId>,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl DispatchEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: EventType, run_id: Option<RunId>, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            run_id,
            data,
            timestamp: now(),
        }
    }
}
