//! Observer registry for world events.

use std::fmt;

use skirmish_core::Event;

/// Handle returned when registering an event handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

impl SubscriptionId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

type Handler = Box<dyn FnMut(&Event)>;

/// Handlers notified with every event produced by `apply`.
///
/// Handlers are invoked in registration order, and each one sees the events
/// of a single `apply` call in emission order.
#[derive(Default)]
pub(crate) struct Subscribers {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u32,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.handlers.push((id, handler));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    pub(crate) fn publish(&mut self, events: &[Event]) {
        if events.is_empty() {
            return;
        }

        for (_, handler) in &mut self.handlers {
            for event in events {
                handler(event);
            }
        }
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("handlers", &self.handlers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
