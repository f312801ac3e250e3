//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use condop_domain::error::DispatchError;
use condop_domain::event::DispatchEvent;

use crate::ports::EventPublisher;

/// Default channel capacity; slow subscribers lag past this many events.
pub const DEFAULT_CAPACITY: usize = 256;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped). A subscriber that falls behind by more
/// than the capacity loses the oldest events and sees
/// [`broadcast::error::RecvError::Lagged`].
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<DispatchEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(
        &self,
        event: DispatchEvent,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            tracing::trace!(event = %event.event_type, "no subscriber for dispatch event");
        }
        async { Ok(()) }
    }
}
