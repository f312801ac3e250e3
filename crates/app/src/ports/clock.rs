//! Clock port — where trigger times come from.

use std::sync::Arc;

use condop_domain::time::TriggerTime;

/// Monotonic time source handed to the scheduler.
pub trait Clock: Send + Sync {
    /// Current trigger time.
    fn now(&self) -> TriggerTime;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> TriggerTime {
        (**self).now()
    }
}
