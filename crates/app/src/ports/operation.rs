//! Atomic operation port — the execution collaborator's contract.
//!
//! The engine never interprets what an operation does. It awaits
//! [`AtomicOp::execute`] and routes failures to observability; everything
//! else (key injection, timing) lives behind the trait.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use condop_domain::error::{DispatchError, ExecutionError};
use condop_domain::operation::OpSpec;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Successful result of executing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    /// The operation finished.
    Completed,
    /// The operation started a long-lived effect (e.g. a held key) that keeps
    /// going after `execute` returns. [`AtomicOp::dispose`] ends it.
    Running,
}

/// A single executable step.
///
/// Operations are usually built once, when their handler is constructed, and
/// reused on every fire. They are disposed together with their handler, not
/// after each execution.
pub trait AtomicOp: Send + Sync {
    /// Short human-readable description, e.g. `press(j)`.
    fn label(&self) -> String;

    /// Perform the side effect.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the step could not be carried out.
    fn execute(&self) -> BoxFuture<'_, Result<OpStatus, ExecutionError>>;

    /// Release any handle the operation holds.
    ///
    /// Must be idempotent, must not panic, and must be safe after a partial
    /// or failed execution (or no execution at all).
    fn dispose(&self);
}

/// An ordered, **non-empty** sequence of operations.
///
/// Emptiness is ruled out at construction so that "no match" is only ever
/// expressed as `None`.
#[derive(Clone)]
pub struct OpSequence(Arc<[Arc<dyn AtomicOp>]>);

impl OpSequence {
    /// Wrap `ops`, or return `None` if there are none.
    #[must_use]
    pub fn new(ops: Vec<Arc<dyn AtomicOp>>) -> Option<Self> {
        if ops.is_empty() {
            return None;
        }
        Some(Self(Arc::from(ops)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AtomicOp>> {
        self.0.iter()
    }

    /// Labels of every operation, in order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|op| op.label()).collect()
    }

    /// Whether both sequences share the same backing operations.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Dispose every operation in the sequence.
    pub fn dispose_all(&self) {
        for op in self.0.iter() {
            op.dispose();
        }
    }
}

impl fmt::Debug for OpSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

/// Builds concrete operations from declarative specs.
///
/// Implemented by execution adapters.
pub trait OpFactory: Send + Sync {
    /// Build the operation described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the spec cannot be realised by this
    /// adapter.
    fn build(&self, spec: &OpSpec) -> Result<Arc<dyn AtomicOp>, DispatchError>;
}

impl<T: OpFactory + ?Sized> OpFactory for Arc<T> {
    fn build(&self, spec: &OpSpec) -> Result<Arc<dyn AtomicOp>, DispatchError> {
        (**self).build(spec)
    }
}
