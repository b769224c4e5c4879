//! Publish/subscribe bus.

use std::fmt;

/// An event that can be routed by kind.
pub trait Event {
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`EventBus::subscribe`]; pass it to
/// [`EventBus::unsubscribe`] to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Entry<E: Event, S: ?Sized> {
    id: u64,
    kind: Option<E::Kind>,
    listener: Box<dyn Fn(&E, &S)>,
}

/// Listeners keyed by event kind, delivered in registration order.
pub struct EventBus<E: Event, S: ?Sized> {
    next_id: u64,
    entries: Vec<Entry<E, S>>,
}

impl<E: Event, S: ?Sized> EventBus<E, S> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    fn push(&mut self, kind: Option<E::Kind>, listener: Box<dyn Fn(&E, &S)>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry { id, kind, listener });
        Subscription(id)
    }

    /// Subscribes to events of one kind.
    pub fn subscribe<F>(&mut self, kind: E::Kind, listener: F) -> Subscription
    where
        F: Fn(&E, &S) + 'static,
    {
        self.push(Some(kind), Box::new(listener))
    }

    /// Subscribes to every event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> Subscription
    where
        F: Fn(&E, &S) + 'static,
    {
        self.push(None, Box::new(listener))
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != subscription.0);
        self.entries.len() != before
    }

    /// Delivers `event` to every matching listener.
    pub fn publish(&self, event: &E, source: &S) {
        let kind = event.kind();
        for entry in &self.entries {
            if entry.kind.map_or(true, |k| k == kind) {
                (entry.listener)(event, source);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<E: Event, S: ?Sized> Default for EventBus<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event, S: ?Sized> fmt::Debug for EventBus<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.entries.len())
            .finish()
    }
}
