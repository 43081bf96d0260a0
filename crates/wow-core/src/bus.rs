//! In-process pub/sub for cross-component signaling.
//!
//! Subscribers run synchronously, in registration order, inside the
//! publisher's call. A panicking callback is caught and logged; it never
//! propagates and never unsubscribes itself.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// A published event: name plus free-form detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEvent {
    pub name: String,
    pub detail: String,
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type Callback = Box<dyn FnMut(&BusEvent)>;

struct Subscriber {
    id: SubscriberId,
    event: String,
    callback: Callback,
}

/// Synchronous event bus owned by the gateway context.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
    published: u64,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// Register a callback for `event`. Returns an id for [`unsubscribe`].
    ///
    /// [`unsubscribe`]: EventBus::unsubscribe
    pub fn subscribe(
        &mut self,
        event: impl Into<String>,
        callback: impl FnMut(&BusEvent) + 'static,
    ) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            event: event.into(),
            callback: Box::new(callback),
        });
        id
    }

    /// Deliver `event` to every matching subscriber, in registration order.
    pub fn publish(&mut self, event: impl Into<String>, detail: impl Into<String>) {
        let event = BusEvent {
            name: event.into(),
            detail: detail.into(),
        };
        self.published += 1;
        for sub in self
            .subscribers
            .iter_mut()
            .filter(|s| s.event == event.name)
        {
            let result = catch_unwind(AssertUnwindSafe(|| (sub.callback)(&event)));
            if result.is_err() {
                tracing::warn!(event = %event.name, "event bus callback panicked");
            }
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Drop all subscribers.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Number of events published over the bus lifetime.
    pub fn published_count(&self) -> u64 {
        self.published
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("published", &self.published)
            .finish()
    }
}
