//! Functionality for single-threaded notifying.
//!
//! An `Event` is a list of listeners that are invoked in the order they
//! were registered every time the event is emitted. Listeners can be removed
//! at any time, even from inside a listener of the same event while it is
//! being emitted.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifier of a single listener registered on an `Event`. Identifiers
/// are never reused by the same event.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ListenerId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

/// List of listeners that can be notified with a value of type `T`.
pub struct Event<T> {
    listeners: RefCell<Vec<(ListenerId, Listener<T>)>>,
    next_id: Cell<u64>,
}

impl<T> Event<T> {
    /// Creates a new event with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Registers a listener and returns the identifier that can be used
    /// to remove it later.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Removes the listener. Returns `false` if no such listener was
    /// registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|(x, _)| *x == id) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.listeners.borrow().iter().any(|(x, _)| *x == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes all listeners with the provided value.
    ///
    /// Listeners registered during the emit are not invoked by it. Listeners
    /// removed during the emit are not invoked if they were not invoked yet.
    pub fn emit(&self, value: &T) {
        // no borrow may be held while listeners run, they can re-enter
        let snapshot = self.listeners.borrow().clone();

        for (id, listener) in snapshot {
            if self.is_subscribed(id) {
                listener(value);
            }
        }
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::notification::Event;
    use quickcheck_macros::quickcheck;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_in_registration_order() {
        let event = Event::<u32>::new();
        let log = Rc::new(RefCell::new(vec![]));

        for tag in 0..3 {
            let log = log.clone();
            event.subscribe(move |v: &u32| log.borrow_mut().push((tag, *v)));
        }

        event.emit(&7);

        assert_eq!(*log.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let event = Event::<()>::new();
        let calls = Rc::new(RefCell::new(0));

        let c = calls.clone();
        let id = event.subscribe(move |_| *c.borrow_mut() += 1);

        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.emit(&());

        assert_eq!(*calls.borrow(), 0);
        assert!(event.is_empty());
    }

    #[test]
    fn listener_can_unsubscribe_itself_during_emit() {
        let event = Rc::new(Event::<()>::new());
        let calls = Rc::new(RefCell::new(0));
        let own_id = Rc::new(RefCell::new(None));

        let (e, c, o) = (event.clone(), calls.clone(), own_id.clone());
        let id = event.subscribe(move |_| {
            *c.borrow_mut() += 1;
            if let Some(id) = *o.borrow() {
                e.unsubscribe(id);
            }
        });
        *own_id.borrow_mut() = Some(id);

        event.emit(&());
        event.emit(&());

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn listener_removed_by_earlier_listener_is_skipped() {
        let event = Rc::new(Event::<()>::new());
        let calls = Rc::new(RefCell::new(vec![]));
        let victim = Rc::new(RefCell::new(None));

        let (e, v) = (event.clone(), victim.clone());
        event.subscribe(move |_| {
            if let Some(id) = *v.borrow() {
                e.unsubscribe(id);
            }
        });
        let c = calls.clone();
        let id = event.subscribe(move |_| c.borrow_mut().push("victim"));
        *victim.borrow_mut() = Some(id);

        event.emit(&());

        assert!(calls.borrow().is_empty());
    }

    #[quickcheck]
    fn every_listener_called_once_per_emit(listeners: u8) -> bool {
        let event = Event::<()>::new();
        let calls = Rc::new(RefCell::new(0usize));

        for _ in 0..listeners {
            let c = calls.clone();
            event.subscribe(move |_| *c.borrow_mut() += 1);
        }
        event.emit(&());

        let result = *calls.borrow() == listeners as usize;
        result
    }
}
