//! Stock state handlers.
//!
//! - [`ConditionHandler`] — declarative condition with debounce and cooldown,
//!   the handler every configured scene is made of.
//! - [`FnHandler`] — wraps closures, for embedding custom logic without a
//!   dedicated type.

mod condition;
mod func;

pub use condition::{ConditionHandler, Phase};
pub use func::FnHandler;
