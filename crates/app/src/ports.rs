//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the dispatch engine and the outside
//! world. They live here (in `app`) so that both the engine and the adapters
//! can depend on them without creating circular dependencies.

pub mod clock;
pub mod event_bus;
pub mod operation;
pub mod perception;
pub mod scene_factory;
pub mod state_handler;

pub use clock::Clock;
pub use event_bus::EventPublisher;
pub use operation::{AtomicOp, BoxFuture, OpFactory, OpSequence, OpStatus};
pub use perception::StateSource;
pub use scene_factory::SceneFactory;
pub use state_handler::StateHandler;
