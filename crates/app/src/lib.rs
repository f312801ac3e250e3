//! # condop-app
//!
//! Dispatch engine — **port definitions** (traits) and the logic that drives
//! them.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `AtomicOp` — one executable step with an idempotent cleanup
//!   - `OpFactory` — turns declarative op specs into atomic ops
//!   - `StateSource` — the perception collaborator's current snapshot
//!   - `StateHandler` — one condition mapping a trigger time to operations
//!   - `SceneFactory` — builds a scene from its configuration
//!   - `EventPublisher` — observability sink for dispatch events
//!   - `Clock` — monotonic time source
//! - Evaluate scenes: strict first-match priority over ordered handlers
//!   (`SceneHandler`)
//! - Drive the tick loop, execute fired sequences and manage scene switching
//!   and shutdown (`Scheduler`)
//! - Provide stock handlers (`ConditionHandler`, `FnHandler`), the stock
//!   `ConditionSceneFactory` and an in-process event bus
//!
//! ## Dependency rule
//! Depends on `condop-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates.

pub mod clock;
pub mod event_bus;
pub mod handlers;
pub mod ports;
pub mod scene_factory;
pub mod scene_handler;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;
