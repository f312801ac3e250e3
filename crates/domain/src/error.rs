//! Error types shared across the workspace.
//!
//! Each failure class of the dispatcher has its own typed error. They all
//! convert into [`DispatchError`] via `#[from]`, which is what crosses port
//! boundaries.

/// Top-level error for the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("evaluation error")]
    Evaluation(#[from] EvaluationError),

    #[error("execution error")]
    Execution(#[from] ExecutionError),

    #[error("disposal error")]
    Disposal(#[from] DisposalError),

    #[error("lifecycle error")]
    Lifecycle(#[from] LifecycleError),
}

/// A configuration value breaks a domain invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("interval must be greater than zero and at most one hour, got {0} seconds")]
    InvalidInterval(f64),

    #[error("cooldown must be a finite, non-negative number of seconds, got {0}")]
    InvalidCooldown(f64),

    #[error("time window must be a finite, non-negative number of seconds, got {0}")]
    InvalidWindow(f64),

    #[error("scene `{0}` has no handlers")]
    NoHandlers(String),

    #[error("handler `{0}` has no operations")]
    NoOperations(String),

    #[error("duplicate handler name `{0}`")]
    DuplicateHandler(String),

    #[error("duplicate scene name `{0}`")]
    DuplicateScene(String),

    #[error("operation key must not be empty")]
    EmptyKey,
}

/// A named item does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} `{name}` not found")]
pub struct NotFoundError {
    pub kind: &'static str,
    pub name: String,
}

/// A state handler could not decide its condition for one tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// The perception source could not produce a snapshot.
    #[error("state source unavailable: {0}")]
    SourceUnavailable(String),

    /// The handler's own logic failed.
    #[error("handler failed: {0}")]
    Handler(String),
}

/// An atomic operation failed while executing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The operation ran and reported a failure.
    #[error("operation `{op}` failed: {reason}")]
    Failed { op: String, reason: String },

    /// The operation was executed after it had been disposed.
    #[error("operation `{0}` already disposed")]
    Disposed(String),
}

/// A handler failed to release a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("handler `{handler}` failed to dispose: {reason}")]
pub struct DisposalError {
    pub handler: String,
    pub reason: String,
}

/// A scheduler request is not valid in its current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("a scene is already running; switch scenes instead")]
    AlreadyRunning,

    #[error("no scene is running")]
    NotRunning,

    #[error("the scheduler is stopped")]
    Stopped,
}
