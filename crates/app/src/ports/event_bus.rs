//! Event bus port — publish dispatch events to observers.

use std::future::Future;

use condop_domain::error::DispatchError;
use condop_domain::event::DispatchEvent;

/// Publishes dispatch events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(
        &self,
        event: DispatchEvent,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: DispatchEvent,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        (**self).publish(event)
    }
}
