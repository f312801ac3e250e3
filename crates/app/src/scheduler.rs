//! Scheduler — drives the active scene's tick loop and owns its lifecycle.
//!
//! ```text
//! Idle ──start_scene──▶ Running ──switch_scene──▶ Switching ──▶ Running
//!                          │                                      │
//!                          └────────────────stop──────────────────┴──▶ Stopped
//! ```
//!
//! Each active scene runs on one tokio task: evaluate, maybe execute the
//! fired sequence op by op, then wait for the next tick. Control requests
//! are serialized through an async mutex. A scene is always handed back by
//! its task and disposed before the next one is built, so two scenes never
//! overlap.
//!
//! A tick loop that dies on its own (a panicking handler or operation) is
//! reported as [`EventType::SceneFailed`] and the scheduler falls back to
//! [`DriverState::Idle`].

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;

use condop_domain::error::{DispatchError, LifecycleError};
use condop_domain::event::{DispatchEvent, EventType};
use condop_domain::fired::{FiredSequence, SequenceOutcome};
use condop_domain::id::{FireId, RunId};
use condop_domain::scene::SceneConfig;
use condop_domain::time::now;

use crate::ports::{Clock, EventPublisher, OpSequence, OpStatus, SceneFactory};
use crate::scene_handler::SceneHandler;
use crate::stats::{DispatchStats, StatsSnapshot};

/// Observable scheduler state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Running { scene: String, run_id: RunId },
    Switching { from: String, to: String },
    Stopped,
}

struct Shared<C, P> {
    clock: C,
    publisher: P,
    stats: DispatchStats,
    last_fired: Mutex<Option<FiredSequence>>,
    state: watch::Sender<DriverState>,
}

impl<C, P: EventPublisher> Shared<C, P> {
    async fn emit(&self, event_type: EventType, run_id: RunId, data: serde_json::Value) {
        let event = DispatchEvent::new(event_type, Some(run_id), data);
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(%err, %event_type, "failed to publish dispatch event");
        }
    }

    fn set_state(&self, state: DriverState) {
        self.state.send_replace(state);
    }

    fn is_running(&self, run_id: RunId) -> bool {
        matches!(&*self.state.borrow(), DriverState::Running { run_id: current, .. } if *current == run_id)
    }

    /// Report a tick loop that ended without a cancel.
    async fn fail_run(&self, run_id: RunId, scene: &str, reason: String) {
        tracing::error!(%scene, %run_id, %reason, "scene task failed");
        self.stats.record_scene_failure();
        self.emit(
            EventType::SceneFailed,
            run_id,
            serde_json::json!({ "scene": scene, "reason": reason }),
        )
        .await;
        self.state.send_if_modified(|state| {
            let current = matches!(state, DriverState::Running { run_id: id, .. } if *id == run_id);
            if current {
                *state = DriverState::Idle;
            }
            current
        });
    }

    fn store_fired(&self, fired: FiredSequence) {
        *self.last_fired.lock().unwrap_or_else(PoisonError::into_inner) = Some(fired);
    }

    fn finish_fired(&self, id: FireId, outcome: SequenceOutcome) {
        let mut guard = self.last_fired.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fired) = guard.as_mut().filter(|f| f.id == id) {
            fired.outcome = outcome;
        }
    }
}

struct ActiveRun {
    run_id: RunId,
    scene: String,
    cancel: watch::Sender<bool>,
    /// Yields the scene back, or `None` when its tick loop died.
    task: JoinHandle<Option<SceneHandler>>,
}

enum Phase {
    Idle,
    Running(ActiveRun),
    Stopped,
}

/// Runs one scene at a time and switches between scenes on request.
pub struct Scheduler<F, C, P> {
    factory: F,
    shared: Arc<Shared<C, P>>,
    control: tokio::sync::Mutex<Phase>,
}

impl<F, C, P> Scheduler<F, C, P>
where
    F: SceneFactory,
    C: Clock + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Create an idle scheduler.
    pub fn new(factory: F, clock: C, publisher: P) -> Self {
        let (state, _) = watch::channel(DriverState::Idle);
        Self {
            factory,
            shared: Arc::new(Shared {
                clock,
                publisher,
                stats: DispatchStats::default(),
                last_fired: Mutex::new(None),
                state,
            }),
            control: tokio::sync::Mutex::new(Phase::Idle),
        }
    }

    /// Build the scene described by `config` and start ticking it.
    ///
    /// The first tick is evaluated immediately.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyRunning`] if a scene is active
    /// - [`LifecycleError::Stopped`] after [`stop`](Self::stop)
    /// - any error of the scene factory
    pub async fn start_scene(&self, config: &SceneConfig) -> Result<RunId, DispatchError> {
        let mut phase = self.control.lock().await;
        self.reap_failed(&mut phase).await;
        match &*phase {
            Phase::Running(_) => return Err(LifecycleError::AlreadyRunning.into()),
            Phase::Stopped => return Err(LifecycleError::Stopped.into()),
            Phase::Idle => {}
        }

        let scene = self.factory.build(config)?;
        let run = self.launch(scene).await;
        let run_id = run.run_id;
        *phase = Phase::Running(run);
        Ok(run_id)
    }

    /// Replace the running scene with the one described by `config`.
    ///
    /// The configuration is validated first; an invalid one leaves the
    /// current scene running. Otherwise the current scene is halted and
    /// fully disposed before the new one is built. If building then fails
    /// the scheduler is left idle.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotRunning`] when idle (use
    ///   [`start_scene`](Self::start_scene))
    /// - [`LifecycleError::Stopped`] after [`stop`](Self::stop)
    /// - validation or scene factory errors
    pub async fn switch_scene(&self, config: &SceneConfig) -> Result<RunId, DispatchError> {
        let mut phase = self.control.lock().await;
        match &*phase {
            Phase::Idle => return Err(LifecycleError::NotRunning.into()),
            Phase::Stopped => return Err(LifecycleError::Stopped.into()),
            Phase::Running(_) => {}
        }
        config.validate()?;

        if let Phase::Running(run) = std::mem::replace(&mut *phase, Phase::Idle) {
            tracing::info!(from = %run.scene, to = %config.name, "switching scene");
            self.shared.set_state(DriverState::Switching {
                from: run.scene.clone(),
                to: config.name.clone(),
            });
            self.halt(run).await;
        }

        let scene = match self.factory.build(config) {
            Ok(scene) => scene,
            Err(err) => {
                tracing::warn!(scene = %config.name, %err, "failed to build scene, scheduler idle");
                self.shared.set_state(DriverState::Idle);
                return Err(err);
            }
        };
        let run = self.launch(scene).await;
        let run_id = run.run_id;
        *phase = Phase::Running(run);
        Ok(run_id)
    }

    /// Halt and dispose the active scene, then refuse further work.
    ///
    /// Interrupts a pending tick or a running sequence at its current await
    /// point. Calling it again is a no-op.
    pub async fn stop(&self) {
        let mut phase = self.control.lock().await;
        match std::mem::replace(&mut *phase, Phase::Stopped) {
            Phase::Running(run) => self.halt(run).await,
            Phase::Idle => {}
            Phase::Stopped => return,
        }
        self.shared.set_state(DriverState::Stopped);
        tracing::info!("scheduler stopped");
    }

    /// The most recently fired sequence and how it ended.
    #[must_use]
    pub fn last_fired(&self) -> Option<FiredSequence> {
        self.shared
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Clear out a run whose tick loop is gone.
    async fn reap_failed(&self, phase: &mut Phase) {
        let failed = matches!(
            &*phase,
            Phase::Running(run) if run.task.is_finished() || !self.shared.is_running(run.run_id)
        );
        if failed && let Phase::Running(run) = std::mem::replace(phase, Phase::Idle) {
            self.halt(run).await;
        }
    }

    async fn launch(&self, scene: SceneHandler) -> ActiveRun {
        let run_id = RunId::new();
        let name = scene.name().to_string();

        self.shared.stats.record_scene_started();
        self.shared
            .emit(
                EventType::SceneStarted,
                run_id,
                serde_json::json!({
                    "scene": name,
                    "interval_seconds": scene.interval().as_secs_f64(),
                    "handlers": scene.handler_names(),
                }),
            )
            .await;
        self.shared.set_state(DriverState::Running {
            scene: name.clone(),
            run_id,
        });
        tracing::info!(scene = %name, %run_id, interval = ?scene.interval(), "scene started");

        let (cancel, cancelled) = watch::channel(false);
        let span = tracing::info_span!("scene", scene = %name, run = %run_id.short());
        let ticking = tokio::spawn(drive(self.shared.clone(), scene, run_id, cancelled).instrument(span));
        let shared = self.shared.clone();
        let scene_name = name.clone();
        let task = tokio::spawn(async move {
            match ticking.await {
                Ok(scene) => Some(scene),
                // the scene was dropped while unwinding, which disposed it
                Err(err) => {
                    shared.fail_run(run_id, &scene_name, err.to_string()).await;
                    None
                }
            }
        });

        ActiveRun {
            run_id,
            scene: name,
            cancel,
            task,
        }
    }

    async fn halt(&self, run: ActiveRun) {
        run.cancel.send_replace(true);
        match run.task.await {
            Ok(Some(mut scene)) => {
                if let Err(errors) = scene.dispose() {
                    self.shared.stats.record_disposal_failures(errors.len());
                    for err in errors {
                        self.shared
                            .emit(
                                EventType::DisposalFailed,
                                run.run_id,
                                serde_json::json!({
                                    "scene": run.scene,
                                    "handler": err.handler,
                                    "reason": err.reason,
                                }),
                            )
                            .await;
                    }
                }
            }
            Ok(None) => {}
            Err(err) => tracing::error!(scene = %run.scene, %err, "scene supervisor failed"),
        }

        self.shared
            .emit(
                EventType::SceneStopped,
                run.run_id,
                serde_json::json!({ "scene": run.scene }),
            )
            .await;
        tracing::info!(scene = %run.scene, run_id = %run.run_id, "scene stopped");
    }
}

impl<F, C, P> Drop for Scheduler<F, C, P> {
    fn drop(&mut self) {
        if let Phase::Running(run) = self.control.get_mut() {
            // the task hands the scene back and its output is dropped, which
            // disposes it
            run.cancel.send_replace(true);
        }
    }
}

/// Tick loop of one scene. Returns the scene once cancelled.
async fn drive<C, P>(
    shared: Arc<Shared<C, P>>,
    mut scene: SceneHandler,
    run_id: RunId,
    mut cancel: watch::Receiver<bool>,
) -> SceneHandler
where
    C: Clock,
    P: EventPublisher + Send + Sync,
{
    let interval = scene.interval();
    loop {
        let cancelled = *cancel.borrow();
        if cancelled {
            break;
        }

        let started = Instant::now();
        if tick(&shared, &mut scene, run_id, &mut cancel).await.is_break() {
            break;
        }

        // an overrunning tick makes this deadline already due
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            () = sleep_until(started.checked_add(interval)) => {}
        }
    }
    tracing::debug!("tick loop finished");
    scene
}

/// Sleep until `deadline`; a deadline past the end of time never comes.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// One evaluate-then-maybe-execute cycle.
async fn tick<C, P>(
    shared: &Shared<C, P>,
    scene: &mut SceneHandler,
    run_id: RunId,
    cancel: &mut watch::Receiver<bool>,
) -> ControlFlow<()>
where
    C: Clock,
    P: EventPublisher + Send + Sync,
{
    let trigger_time = shared.clock.now();
    shared.stats.record_tick();
    let evaluation = scene.evaluate(trigger_time);

    if !evaluation.failures.is_empty() {
        shared.stats.record_evaluation_failures(evaluation.failures.len());
        for failure in &evaluation.failures {
            shared
                .emit(
                    EventType::EvaluationFailed,
                    run_id,
                    serde_json::json!({
                        "scene": scene.name(),
                        "handler": failure.handler,
                        "error": failure.error.to_string(),
                        "consecutive": failure.consecutive,
                    }),
                )
                .await;
        }
    }

    let Some(matched) = evaluation.matched else {
        return ControlFlow::Continue(());
    };

    let fired = FiredSequence {
        id: FireId::new(),
        run_id,
        scene: scene.name().to_string(),
        handler: matched.handler,
        operations: matched.operations.labels(),
        trigger_time,
        fired_at: now(),
        outcome: SequenceOutcome::InProgress,
    };
    let fire_id = fired.id;
    tracing::debug!(handler = %fired.handler, %trigger_time, ops = ?fired.operations, "sequence fired");
    shared.stats.record_fired();
    shared
        .emit(
            EventType::SequenceFired,
            run_id,
            serde_json::json!({
                "fire_id": fire_id,
                "scene": fired.scene,
                "handler": fired.handler,
                "operations": fired.operations,
                "trigger_time": trigger_time.as_secs_f64(),
            }),
        )
        .await;
    let handler = fired.handler.clone();
    shared.store_fired(fired);

    let outcome = execute(&matched.operations, cancel).await;
    shared.finish_fired(fire_id, outcome.clone());

    match &outcome {
        SequenceOutcome::Failed { index, reason } => {
            tracing::warn!(%handler, index, %reason, "operation failed, rest of sequence skipped");
            shared.stats.record_execution_failure();
            shared
                .emit(
                    EventType::ExecutionFailed,
                    run_id,
                    serde_json::json!({
                        "fire_id": fire_id,
                        "scene": scene.name(),
                        "handler": handler,
                        "index": index,
                        "reason": reason,
                    }),
                )
                .await;
            ControlFlow::Continue(())
        }
        SequenceOutcome::Interrupted { index } => {
            tracing::debug!(%handler, index, "sequence interrupted");
            shared.stats.record_interrupted();
            shared
                .emit(
                    EventType::SequenceCompleted,
                    run_id,
                    serde_json::json!({ "fire_id": fire_id, "handler": handler, "outcome": outcome }),
                )
                .await;
            ControlFlow::Break(())
        }
        SequenceOutcome::Completed | SequenceOutcome::InProgress => {
            shared.stats.record_completed();
            shared
                .emit(
                    EventType::SequenceCompleted,
                    run_id,
                    serde_json::json!({ "fire_id": fire_id, "handler": handler, "outcome": outcome }),
                )
                .await;
            ControlFlow::Continue(())
        }
    }
}

/// Run `ops` strictly in order, stopping at the first failure or on cancel.
async fn execute(ops: &OpSequence, cancel: &mut watch::Receiver<bool>) -> SequenceOutcome {
    for (index, op) in ops.iter().enumerate() {
        tokio::select! {
            biased;
            _ = cancel.changed() => return SequenceOutcome::Interrupted { index },
            result = op.execute() => match result {
                Ok(OpStatus::Completed) => {}
                Ok(OpStatus::Running) => {
                    tracing::trace!(op = %op.label(), "operation left running");
                }
                Err(err) => {
                    return SequenceOutcome::Failed {
                        index,
                        reason: err.to_string(),
                    };
                }
            },
        }
    }
    SequenceOutcome::Completed
}
