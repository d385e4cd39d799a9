//! Handler registry for push channel events.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::channel::{ChannelEvent, EventKind};
use crate::util::lock;

/// Event handler; identity is the `Arc` allocation.
pub type Handler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler(callback: impl Fn(&ChannelEvent) + Send + Sync + 'static) -> Handler {
    Arc::new(callback)
}

fn same_handler(left: &Handler, right: &Handler) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

/// Set of handlers per event kind.
///
/// Registering the same handler twice keeps a single entry. Dispatch order
/// is unspecified.
#[derive(Default)]
pub struct ObserverSet {
    handlers: Mutex<HashMap<EventKind, Vec<Handler>>>,
}

impl ObserverSet {
    /// Returns `false` when the handler was already registered for `kind`.
    pub fn insert(&self, kind: EventKind, handler: Handler) -> bool {
        let mut handlers = lock(&self.handlers);
        let entry = handlers.entry(kind).or_default();
        if entry.iter().any(|existing| same_handler(existing, &handler)) {
            return false;
        }
        entry.push(handler);
        true
    }

    /// Returns `false` when the handler was not registered for `kind`.
    pub fn remove(&self, kind: EventKind, handler: &Handler) -> bool {
        let mut handlers = lock(&self.handlers);
        let Some(entry) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|existing| !same_handler(existing, handler));
        let removed = entry.len() != before;
        if entry.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    pub fn clear(&self) {
        lock(&self.handlers).clear();
    }

    pub fn count(&self, kind: EventKind) -> usize {
        lock(&self.handlers).get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.handlers).is_empty()
    }

    /// Invoke every handler registered for the event's kind.
    ///
    /// Handlers run on a snapshot taken before the first call, so they may
    /// register or deregister handlers themselves.
    pub fn dispatch(&self, event: &ChannelEvent) -> usize {
        let snapshot = lock(&self.handlers)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }
}

impl fmt::Debug for ObserverSet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = lock(&self.handlers);
        let mut map = formatter.debug_map();
        for (kind, entries) in handlers.iter() {
            map.entry(kind, &entries.len());
        }
        map.finish()
    }
}
