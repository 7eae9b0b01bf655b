//! A minimal subscribe/emit registry keyed by event name.
//!
//! `on`/`off` register and deregister listeners by a monotonically
//! allocated id; `emit` looks up listeners for one event name and calls
//! each in turn. A plain owned map, not an `Arc<RwLock<HashMap<...>>>`:
//! this core is single-threaded and cooperative, so there is no
//! concurrent access to defend against, and carrying the lock would be
//! ambient complexity with nothing to protect.

use std::collections::HashMap;

/// Implemented by the event payload types (`NodeEvent`, `GraphEvent`) so
/// [`Observer`] can dispatch by event name without knowing their shape.
pub trait EventPayload {
    /// One of the stable event identifiers: `"update"`, `"history"`,
    /// `"conflict"`.
    fn kind(&self) -> &'static str;
}

/// A single event listener. Boxed `Fn`, not `FnMut`: a listener may be
/// invoked any number of times and must not assume exclusive access to
/// state outside the closure.
pub type Listener<E> = Box<dyn Fn(&E)>;

/// Subscribe/emit registry for one owner (a `Node` or a `Graph`).
pub struct Observer<E> {
    listeners: HashMap<&'static str, Vec<(u64, Listener<E>)>>,
    next_id: u64,
}

impl<E: EventPayload> Observer<E> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a listener for `event`. Returns a handle for `off`.
    pub fn on(&mut self, event: &'static str, callback: Listener<E>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners.entry(event).or_default().push((id, callback));
        id
    }

    /// Deregister a listener by the handle `on` returned.
    pub fn off(&mut self, event: &'static str, id: u64) {
        if let Some(entries) = self.listeners.get_mut(event) {
            entries.retain(|(listener_id, _)| *listener_id != id);
            if entries.is_empty() {
                self.listeners.remove(event);
            }
        }
    }

    /// Remove every listener for `event`.
    pub fn off_all(&mut self, event: &'static str) {
        self.listeners.remove(event);
    }

    /// Dispatch `payload` to every listener registered for its kind, in
    /// registration order. Listener panics/exceptions propagate to the
    /// caller of the emitting operation — this core performs no
    /// listener-level error handling.
    pub fn emit(&self, payload: &E) {
        if let Some(entries) = self.listeners.get(payload.kind()) {
            for (_, callback) in entries {
                callback(payload);
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &'static str) -> usize {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }
}

impl<E: EventPayload> Default for Observer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Observer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("event_types", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    enum TestEvent {
        Ping,
    }

    impl EventPayload for TestEvent {
        fn kind(&self) -> &'static str {
            "ping"
        }
    }

    #[test]
    fn emit_calls_registered_listeners_in_order() {
        let mut observer: Observer<TestEvent> = Observer::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let calls_a = calls.clone();
        observer.on("ping", Box::new(move |_| calls_a.borrow_mut().push("a")));
        let calls_b = calls.clone();
        observer.on("ping", Box::new(move |_| calls_b.borrow_mut().push("b")));

        observer.emit(&TestEvent::Ping);
        assert_eq!(*calls.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn off_removes_only_that_listener() {
        let mut observer: Observer<TestEvent> = Observer::new();
        let calls = Rc::new(RefCell::new(0));

        let calls_a = calls.clone();
        let id_a = observer.on("ping", Box::new(move |_| *calls_a.borrow_mut() += 1));
        let calls_b = calls.clone();
        observer.on("ping", Box::new(move |_| *calls_b.borrow_mut() += 1));

        observer.off("ping", id_a);
        observer.emit(&TestEvent::Ping);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn emit_with_no_listeners_is_a_no_op() {
        let observer: Observer<TestEvent> = Observer::new();
        observer.emit(&TestEvent::Ping);
    }
}
