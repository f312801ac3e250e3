//! Test doubles shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use condop_domain::error::{
    DispatchError, DisposalError, EvaluationError, ExecutionError, NotFoundError,
};
use condop_domain::event::{DispatchEvent, EventType};
use condop_domain::operation::OpSpec;
use condop_domain::state::StateSnapshot;
use condop_domain::time::TriggerTime;

use crate::handlers::FnHandler;
use crate::ports::{
    AtomicOp, BoxFuture, EventPublisher, OpFactory, OpSequence, OpStatus, StateHandler, StateSource,
};

// ── Journal ────────────────────────────────────────────────────

/// Ordered log of everything test doubles did, shared between them.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

// ── Recording operation ────────────────────────────────────────

pub struct RecordingOp {
    label: String,
    journal: Option<Journal>,
    delay: Option<Duration>,
    fail: bool,
    executions: AtomicUsize,
    disposals: AtomicUsize,
}

impl RecordingOp {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            journal: None,
            delay: None,
            fail: false,
            executions: AtomicUsize::new(0),
            disposals: AtomicUsize::new(0),
        }
    }

    pub fn arc(label: &str) -> Arc<dyn AtomicOp> {
        Arc::new(Self::new(label))
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn journaled(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn dispose_count(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    fn note(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(entry);
        }
    }
}

impl AtomicOp for RecordingOp {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn execute(&self) -> BoxFuture<'_, Result<OpStatus, ExecutionError>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.executions.fetch_add(1, Ordering::SeqCst);
            self.note(format!("exec:{}", self.label));
            if self.fail {
                return Err(ExecutionError::Failed {
                    op: self.label.clone(),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(OpStatus::Completed)
        })
    }

    fn dispose(&self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        self.note(format!("dispose-op:{}", self.label));
    }
}

pub fn as_dyn(op: &Arc<RecordingOp>) -> Arc<dyn AtomicOp> {
    op.clone()
}

/// Sequence of fresh recording ops with the given labels.
pub fn seq(labels: &[&str]) -> OpSequence {
    OpSequence::new(labels.iter().map(|l| RecordingOp::arc(l)).collect()).unwrap()
}

// ── Recording op factory ───────────────────────────────────────

/// Builds a [`RecordingOp`] per spec, labelled with the spec's display form.
/// Specs naming the rejected key fail to build.
#[derive(Default)]
pub struct RecordingFactory {
    built: Mutex<Vec<Arc<RecordingOp>>>,
    journal: Option<Journal>,
    reject: Option<String>,
}

impl RecordingFactory {
    pub fn journaled(journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Self::default()
        }
    }

    pub fn rejecting(mut self, key: &str) -> Self {
        self.reject = Some(key.to_string());
        self
    }

    pub fn built(&self) -> Vec<Arc<RecordingOp>> {
        self.built.lock().unwrap().clone()
    }
}

impl OpFactory for RecordingFactory {
    fn build(&self, spec: &OpSpec) -> Result<Arc<dyn AtomicOp>, DispatchError> {
        if let OpSpec::Press { key, .. } | OpSpec::Hold { key } | OpSpec::Release { key } = spec
            && self.reject.as_deref() == Some(key.as_str())
        {
            return Err(NotFoundError {
                kind: "key",
                name: key.clone(),
            }
            .into());
        }
        let mut op = RecordingOp::new(spec.to_string());
        if let Some(journal) = &self.journal {
            op = op.journaled(journal);
        }
        let op = Arc::new(op);
        self.built.lock().unwrap().push(op.clone());
        Ok(op)
    }
}

// ── Stub state source ──────────────────────────────────────────

pub struct StubSource {
    snapshot: Mutex<Arc<StateSnapshot>>,
    failure: Mutex<Option<String>>,
}

impl StubSource {
    pub fn with(snapshot: StateSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Arc::new(snapshot)),
            failure: Mutex::new(None),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with(StateSnapshot::new())
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }
}

impl StateSource for StubSource {
    fn snapshot(&self) -> Result<Arc<StateSnapshot>, EvaluationError> {
        if let Some(reason) = self.failure.lock().unwrap().clone() {
            return Err(EvaluationError::SourceUnavailable(reason));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

// ── Tracked handler ────────────────────────────────────────────

/// Counts evaluations and disposals of a handler built by [`tracked`].
#[derive(Default)]
pub struct HandlerProbe {
    calls: AtomicUsize,
    disposals: AtomicUsize,
    fail_dispose: AtomicBool,
    journal: Option<Journal>,
}

impl HandlerProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn journaled(journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            journal: Some(journal.clone()),
            ..Self::default()
        })
    }

    pub fn failing_dispose(self: Arc<Self>) -> Arc<Self> {
        self.fail_dispose.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    fn note(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(entry);
        }
    }
}

/// Wrap `evaluate` in a handler that reports to `probe`.
pub fn tracked<F>(name: &str, probe: &Arc<HandlerProbe>, mut evaluate: F) -> Box<dyn StateHandler>
where
    F: FnMut(TriggerTime) -> Result<Option<OpSequence>, EvaluationError> + Send + 'static,
{
    let eval_probe = probe.clone();
    let dispose_probe = probe.clone();
    let eval_name = name.to_string();
    let dispose_name = name.to_string();
    let handler = FnHandler::new(name, move |t| {
        eval_probe.calls.fetch_add(1, Ordering::SeqCst);
        eval_probe.note(format!("eval:{eval_name}"));
        evaluate(t)
    })
    .on_dispose(move || {
        dispose_probe.disposals.fetch_add(1, Ordering::SeqCst);
        dispose_probe.note(format!("dispose:{dispose_name}"));
        if dispose_probe.fail_dispose.load(Ordering::SeqCst) {
            return Err(DisposalError {
                handler: dispose_name,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    });
    Box::new(handler)
}

/// Handler that never matches.
pub fn never(name: &str, probe: &Arc<HandlerProbe>) -> Box<dyn StateHandler> {
    tracked(name, probe, |_| Ok(None))
}

/// Handler that matches on every tick with `ops`.
pub fn always(name: &str, probe: &Arc<HandlerProbe>, ops: OpSequence) -> Box<dyn StateHandler> {
    tracked(name, probe, move |_| Ok(Some(ops.clone())))
}

// ── Spy publisher ──────────────────────────────────────────────

#[derive(Default)]
pub struct SpyPublisher {
    pub events: Mutex<Vec<DispatchEvent>>,
}

impl SpyPublisher {
    pub fn types(&self) -> Vec<EventType> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type)
            .collect()
    }

    pub fn of_type(&self, event_type: EventType) -> Vec<DispatchEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl EventPublisher for SpyPublisher {
    fn publish(
        &self,
        event: DispatchEvent,
    ) -> impl std::future::Future<Output = Result<(), DispatchError>> + Send {
        self.events.lock().unwrap().push(event);
        async { Ok(()) }
    }
}
