//! Operation specs — declarative descriptions of atomic operations.
//!
//! A spec says *what* to do; an execution adapter turns it into a concrete
//! operation that knows *how*.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A single step of a prerecorded operation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpSpec {
    /// Press and release a key, holding it for `hold_ms`.
    Press {
        key: String,
        #[serde(default)]
        hold_ms: u64,
    },
    /// Press a key and keep it down; the key is released on disposal or by a
    /// later [`OpSpec::Release`].
    Hold { key: String },
    /// Release a previously held key.
    Release { key: String },
    /// Pause before the next step.
    Wait { millis: u64 },
}

impl OpSpec {
    /// Check that the spec is executable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyKey`] when a key-based spec names no key.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Press { key, .. } | Self::Hold { key } | Self::Release { key } => {
                if key.trim().is_empty() {
                    return Err(ValidationError::EmptyKey);
                }
                Ok(())
            }
            Self::Wait { .. } => Ok(()),
        }
    }
}

impl fmt::Display for OpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Press { key, hold_ms: 0 } => write!(f, "press({key})"),
            Self::Press { key, hold_ms } => write!(f, "press({key}, {hold_ms}ms)"),
            Self::Hold { key } => write!(f, "hold({key})"),
            Self::Release { key } => write!(f, "release({key})"),
            Self::Wait { millis } => write!(f, "wait({millis}ms)"),
        }
    }
}
