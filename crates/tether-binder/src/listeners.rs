//! Listener lists with snapshot-then-fire semantics.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. A listener added while the set is firing is not called for the
//!    event in flight; it joins before the next event.
//! 3. Dropping a [`Registration`] removes the listener before the next
//!    event. [`Registration::detach`] keeps it for the set's lifetime.
//!
//! # Failure Modes
//!
//! - Listener panics: propagate to the caller of `fire`; the set stays
//!   usable but may keep a pending registration until the next fire.
//! - Set dropped while registrations alive: dropping the registration is a
//!   no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<E> = Rc<dyn Fn(&E)>;

struct ListenerState<E> {
    next_id: u64,
    active: Vec<(u64, Listener<E>)>,
    pending: Vec<(u64, Listener<E>)>,
    firing: usize,
}

/// An ordered set of event listeners.
pub struct ListenerSet<E> {
    state: Rc<RefCell<ListenerState<E>>>,
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(ListenerState {
                next_id: 0,
                active: Vec::new(),
                pending: Vec::new(),
                firing: 0,
            })),
        }
    }
}

impl<E: 'static> ListenerSet<E> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. Dropping the returned guard removes it.
    pub fn add(&self, listener: impl Fn(&E) + 'static) -> Registration {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            let entry: (u64, Listener<E>) = (id, Rc::new(listener));
            if state.firing > 0 {
                state.pending.push(entry);
            } else {
                state.active.push(entry);
            }
            id
        };

        let weak: Weak<RefCell<ListenerState<E>>> = Rc::downgrade(&self.state);
        Registration {
            remove: Some(Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    let mut state = state.borrow_mut();
                    state.active.retain(|(existing, _)| *existing != id);
                    state.pending.retain(|(existing, _)| *existing != id);
                }
            })),
        }
    }

    /// Notify every active listener of `event`.
    ///
    /// No borrow is held while listeners run, so they may register or remove
    /// listeners on this same set.
    pub fn fire(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = {
            let mut state = self.state.borrow_mut();
            state.firing += 1;
            state.active.iter().map(|(_, l)| Rc::clone(l)).collect()
        };

        for listener in &snapshot {
            listener(event);
        }

        let mut state = self.state.borrow_mut();
        state.firing -= 1;
        if state.firing == 0 && !state.pending.is_empty() {
            let pending = std::mem::take(&mut state.pending);
            state.active.extend(pending);
        }
    }

    /// Number of registered listeners, including pending ones.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.borrow();
        state.active.len() + state.pending.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ListenerSet")
            .field("active", &state.active.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Guard returned when registering a listener.
#[must_use = "dropping this guard removes the listener"]
pub struct Registration {
    remove: Option<Box<dyn FnOnce()>>,
}

impl Registration {
    /// Remove the listener now.
    pub fn remove(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }

    /// Keep the listener registered for the lifetime of its set.
    pub fn detach(mut self) {
        self.remove = None;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("attached", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fires_in_registration_order() {
        let set = ListenerSet::<u32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&log);
        let b = Rc::clone(&log);
        let _ra = set.add(move |e| a.borrow_mut().push(("a", *e)));
        let _rb = set.add(move |e| b.borrow_mut().push(("b", *e)));
        set.fire(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropping_registration_removes_listener() {
        let set = ListenerSet::<()>::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let reg = set.add(move |_| c.set(c.get() + 1));
        set.fire(&());
        drop(reg);
        set.fire(&());
        assert_eq!(count.get(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn detached_registration_stays() {
        let set = ListenerSet::<()>::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        set.add(move |_| c.set(c.get() + 1)).detach();
        set.fire(&());
        set.fire(&());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn listener_added_while_firing_waits_for_next_event() {
        let set = Rc::new(ListenerSet::<()>::new());
        let inner_calls = Rc::new(Cell::new(0));
        let registrations = Rc::new(RefCell::new(Vec::new()));

        let set_handle = Rc::clone(&set);
        let calls = Rc::clone(&inner_calls);
        let regs = Rc::clone(&registrations);
        set.add(move |_| {
            let calls = Rc::clone(&calls);
            let reg = set_handle.add(move |_| calls.set(calls.get() + 1));
            regs.borrow_mut().push(reg);
        })
        .detach();

        set.fire(&());
        assert_eq!(inner_calls.get(), 0);
        set.fire(&());
        assert_eq!(inner_calls.get(), 1);
    }

    #[test]
    fn registration_outliving_set_is_harmless() {
        let set = ListenerSet::<()>::new();
        let reg = set.add(|_| {});
        drop(set);
        drop(reg);
    }
}
