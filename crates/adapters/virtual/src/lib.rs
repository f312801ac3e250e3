//! # condop-adapter-virtual
//!
//! Virtual perception and input for demos and tests.
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`VirtualScreen`] | `StateSource` | States are set by hand; can be told to fail |
//! | [`VirtualInput`] | `OpFactory` | Key presses land in a bounded, inspectable journal; held keys are released on dispose |
//!
//! ## Dependency rule
//!
//! Depends on `condop-app` (port traits) and `condop-domain` only.

mod input;
mod screen;

pub use input::{DEFAULT_JOURNAL_CAPACITY, KeyEvent, VirtualInput};
pub use screen::VirtualScreen;
