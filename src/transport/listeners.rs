//! BiDi event listener registry.
//!
//! Listeners are registered either for an exact method name or as wildcards
//! receiving every event. Dispatch order is: exact-name listeners in
//! registration order, then wildcard listeners in registration order.
//!
//! A panicking listener is caught and logged; the remaining listeners still
//! run.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, trace};

use crate::identifiers::{IdSequence, ListenerId};
use crate::protocol::Event;

// ============================================================================
// Types
// ============================================================================

/// Event listener callback.
pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Method filter value that registers a wildcard listener.
pub const WILDCARD: &str = "*";

struct Entry {
    id: ListenerId,
    method: Option<String>,
    listener: EventListener,
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Ordered set of event listeners owned by one connection.
#[derive(Default)]
pub struct ListenerRegistry {
    ids: IdSequence,
    entries: Mutex<Vec<Entry>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `method`, or for every event if `method` is `"*"`.
    pub fn add(&self, method: &str, listener: EventListener) -> ListenerId {
        let id = ListenerId::from_raw(self.ids.next_raw());
        let method = (method != WILDCARD).then(|| method.to_string());
        trace!(%id, method = method.as_deref().unwrap_or(WILDCARD), "Listener added");

        self.entries.lock().push(Entry {
            id,
            method,
            listener,
        });
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Delivers `event` to matching listeners and returns how many ran.
    ///
    /// The listener set is snapshotted before the first call, so listeners
    /// may register or remove listeners without deadlocking.
    pub fn dispatch(&self, event: &Event) -> usize {
        let targets: Vec<EventListener> = {
            let entries = self.entries.lock();
            let exact = entries
                .iter()
                .filter(|e| e.method.as_deref() == Some(event.method.as_str()));
            let wildcard = entries.iter().filter(|e| e.method.is_none());
            exact
                .chain(wildcard)
                .map(|e| Arc::clone(&e.listener))
                .collect()
        };

        for listener in &targets {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(method = %event.method, "Event listener panicked");
            }
        }

        targets.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> EventListener {
        let log = Arc::clone(log);
        Arc::new(move |_event: &Event| log.lock().push(tag))
    }

    #[test]
    fn test_fan_out_exact_then_wildcard() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add(WILDCARD, recorder(&log, "any"));
        registry.add("log.entryAdded", recorder(&log, "first"));
        registry.add("log.entryAdded", recorder(&log, "second"));
        registry.add("network.beforeRequestSent", recorder(&log, "other"));

        let ran = registry.dispatch(&Event::new("log.entryAdded", Value::Null));

        assert_eq!(ran, 3);
        assert_eq!(*log.lock(), vec!["first", "second", "any"]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add("log.entryAdded", recorder(&log, "a"));
        registry.add("log.entryAdded", Arc::new(|_: &Event| panic!("listener bug")));
        registry.add(WILDCARD, recorder(&log, "b"));

        registry.dispatch(&Event::new("log.entryAdded", Value::Null));

        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = registry.add("x.y", recorder(&log, "gone"));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());

        registry.dispatch(&Event::new("x.y", Value::Null));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_listener_may_register_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = Arc::clone(&registry);

        registry.add(
            "x.y",
            Arc::new(move |_: &Event| {
                inner.add("x.z", Arc::new(|_: &Event| {}));
            }),
        );

        registry.dispatch(&Event::new("x.y", Value::Null));
        assert_eq!(registry.len(), 2);
    }
}
