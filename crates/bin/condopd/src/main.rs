//! # condopd — condop daemon
//!
//! Composition root that wires the virtual adapter into the scheduler and
//! runs the default scene until interrupted.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Construct the virtual screen and keyboard (adapters)
//! - Construct the scene factory, event bus and scheduler, injecting the
//!   adapters via port traits
//! - Feed demo perception states and log every dispatch event
//! - Stop the scheduler cleanly on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no dispatch logic belongs here.

mod config;

use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing_subscriber::EnvFilter;

use condop_adapter_virtual::{VirtualInput, VirtualScreen};
use condop_app::clock::MonotonicClock;
use condop_app::event_bus::InProcessEventBus;
use condop_app::ports::Clock;
use condop_app::scene_factory::ConditionSceneFactory;
use condop_app::scheduler::Scheduler;
use condop_domain::event::{DispatchEvent, EventType};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter `{}`", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Adapters
    let screen = VirtualScreen::new();
    let input = VirtualInput::new();

    // Event bus
    let event_bus = InProcessEventBus::new(config.scheduler.event_capacity);
    let logger = tokio::spawn(log_events(event_bus.subscribe()));

    // Scheduler
    let clock = MonotonicClock::new();
    let factory = ConditionSceneFactory::new(screen.clone(), input.clone())
        .with_failure_warn_threshold(config.scheduler.failure_warn_threshold);
    let scheduler = Scheduler::new(factory, clock, event_bus);

    let scene = config.default_scene()?;
    scheduler
        .start_scene(scene)
        .await
        .with_context(|| format!("failed to start scene `{}`", scene.name))?;

    let feeder = tokio::spawn(feed_demo_states(screen, clock));

    tracing::info!(scene = %scene.name, scenes = config.scenes.len(), "condopd running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    scheduler.stop().await;
    feeder.abort();
    logger.abort();

    let stats = scheduler.stats();
    tracing::info!(
        ticks = stats.ticks,
        fired = stats.fired,
        execution_failures = stats.execution_failures,
        key_events = input.key_event_count(),
        held_keys = ?input.held_keys(),
        "condopd stopped"
    );
    Ok(())
}

/// Write every dispatch event to the log.
async fn log_events(receiver: broadcast::Receiver<DispatchEvent>) {
    let mut events = BroadcastStream::new(receiver);
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => match event.event_type {
                EventType::SequenceFired | EventType::SequenceCompleted => {
                    tracing::debug!(event = %event.event_type, data = %event.data, "dispatch event");
                }
                EventType::EvaluationFailed
                | EventType::ExecutionFailed
                | EventType::DisposalFailed => {
                    tracing::warn!(event = %event.event_type, data = %event.data, "dispatch event");
                }
                EventType::SceneFailed => {
                    tracing::error!(event = %event.event_type, data = %event.data, "dispatch event");
                }
                EventType::SceneStarted | EventType::SceneStopped => {
                    tracing::info!(event = %event.event_type, data = %event.data, "dispatch event");
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger fell behind");
            }
        }
    }
}

/// Stand-in for a perception pipeline: an enemy flashes every 1.5 s and the
/// boss loses health while energy builds up.
async fn feed_demo_states(screen: VirtualScreen, clock: MonotonicClock) {
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut beat: i64 = 0;
    loop {
        ticker.tick().await;
        let now = clock.now();
        if beat % 3 == 0 {
            screen.observe("enemy_flash", now, None);
        }
        screen.observe("boss_hp", now, Some((100 - beat * 4).max(0)));
        screen.observe("energy", now, Some(beat % 6));
        tracing::trace!(beat, %now, "demo states fed");
        beat = (beat + 1) % 30;
    }
}
