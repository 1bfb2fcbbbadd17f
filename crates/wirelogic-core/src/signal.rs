//! Ordered multicast callbacks
//!
//! - [`Signal`] calls every connected callback in connection order
//! - [`FilterSignal`] runs predicates in order and stops at the first `false`
//! - [`Connection`] is the disposable handle returned by `connect`
//!
//! # Snapshot semantics
//!
//! `fire` iterates a copy of the subscriber list taken when the fire starts.
//! Callbacks connected during a fire are not called by it. A callback that is
//! disconnected during a fire (by itself or by an earlier callback) is skipped
//! from that point on. No `RefCell` borrow is held while user code runs, so
//! callbacks may freely connect, disconnect, or fire the same signal again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type SlotId = u64;

struct Slot<F: ?Sized> {
    id: SlotId,
    callback: Rc<F>,
    alive: Rc<Cell<bool>>,
}

/// Subscriber storage shared by both signal flavours
struct SlotList<F: ?Sized> {
    slots: RefCell<Vec<Slot<F>>>,
    next_id: Cell<SlotId>,
}

/// Type-erased removal so a [`Connection`] does not carry the callback type
trait SlotOwner {
    fn remove(&self, id: SlotId);
}

impl<F: ?Sized + 'static> SlotList<F> {
    fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn insert(list: &Rc<Self>, callback: Rc<F>) -> Connection {
        let id = list.next_id.get();
        list.next_id.set(id + 1);
        let alive = Rc::new(Cell::new(true));
        list.slots.borrow_mut().push(Slot {
            id,
            callback,
            alive: alive.clone(),
        });

        let weak: Weak<Self> = Rc::downgrade(list);
        let owner: Weak<dyn SlotOwner> = weak;
        Connection { id, alive, owner }
    }

    fn snapshot(&self) -> Vec<(Rc<F>, Rc<Cell<bool>>)> {
        self.slots
            .borrow()
            .iter()
            .map(|slot| (slot.callback.clone(), slot.alive.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    fn clear(&self) {
        // Dropping callbacks may run arbitrary Drop code that disconnects from
        // this very list, so release the borrow first.
        let old = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in &old {
            slot.alive.set(false);
        }
        drop(old);
    }
}

impl<F: ?Sized> SlotOwner for SlotList<F> {
    fn remove(&self, id: SlotId) {
        let removed = {
            let mut slots = self.slots.borrow_mut();
            slots
                .iter()
                .position(|slot| slot.id == id)
                .map(|index| slots.remove(index))
        };
        drop(removed);
    }
}

/// Disposable handle for one connected callback
///
/// Dropping a `Connection` does not disconnect; call [`Connection::disconnect`]
/// or hand the connection to an [`EventHandler`](crate::EventHandler) that owns
/// its teardown.
#[derive(Clone)]
pub struct Connection {
    id: SlotId,
    alive: Rc<Cell<bool>>,
    owner: Weak<dyn SlotOwner>,
}

impl Connection {
    /// Disconnect the callback. Idempotent.
    pub fn disconnect(&self) {
        if self.alive.replace(false) {
            if let Some(owner) = self.owner.upgrade() {
                owner.remove(self.id);
            }
        }
    }

    /// Whether the callback is still connected
    pub fn is_connected(&self) -> bool {
        self.alive.get() && self.owner.strong_count() > 0
    }

    fn belongs_to<F: ?Sized>(&self, list: &Rc<SlotList<F>>) -> bool {
        self.owner.as_ptr() as *const () == Rc::as_ptr(list) as *const ()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Ordered multicast callback registry
///
/// Cloning a `Signal` yields another handle to the same subscriber list.
pub struct Signal<A: 'static> {
    slots: Rc<SlotList<dyn Fn(&A)>>,
}

impl<A: 'static> Signal<A> {
    /// Create a signal with no subscribers
    pub fn new() -> Self {
        Self {
            slots: Rc::new(SlotList::new()),
        }
    }

    /// Append a callback; it runs after every callback connected before it
    pub fn connect(&self, callback: impl Fn(&A) + 'static) -> Connection {
        let callback: Rc<dyn Fn(&A)> = Rc::new(callback);
        SlotList::insert(&self.slots, callback)
    }

    /// Disconnect a handle previously returned by this signal
    ///
    /// Returns false (and does nothing) for a handle owned by another signal.
    pub fn disconnect(&self, connection: &Connection) -> bool {
        if !connection.belongs_to(&self.slots) {
            return false;
        }
        connection.disconnect();
        true
    }

    /// Call every connected callback with `args`, in connection order
    pub fn fire(&self, args: &A) {
        for (callback, alive) in self.slots.snapshot() {
            if alive.get() {
                callback(args);
            }
        }
    }

    /// Number of connected callbacks
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing is connected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Disconnect every callback
    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// A signal whose subscribers are predicates
///
/// Used for gating and validation rather than propagation: `fire` returns
/// `false` as soon as one predicate vetoes, without calling the rest.
pub struct FilterSignal<A: 'static> {
    slots: Rc<SlotList<dyn Fn(&A) -> bool>>,
}

impl<A: 'static> FilterSignal<A> {
    /// Create a filter with no predicates
    pub fn new() -> Self {
        Self {
            slots: Rc::new(SlotList::new()),
        }
    }

    /// Append a predicate
    pub fn connect(&self, predicate: impl Fn(&A) -> bool + 'static) -> Connection {
        let predicate: Rc<dyn Fn(&A) -> bool> = Rc::new(predicate);
        SlotList::insert(&self.slots, predicate)
    }

    /// Disconnect a handle previously returned by this filter
    pub fn disconnect(&self, connection: &Connection) -> bool {
        if !connection.belongs_to(&self.slots) {
            return false;
        }
        connection.disconnect();
        true
    }

    /// Run predicates in order; `false` at the first veto, `true` otherwise
    pub fn fire(&self, args: &A) -> bool {
        for (predicate, alive) in self.slots.snapshot() {
            if alive.get() && !predicate(args) {
                return false;
            }
        }
        true
    }

    /// Number of connected predicates
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if nothing is connected
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: 'static> Default for FilterSignal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Clone for FilterSignal<A> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

impl<A: 'static> fmt::Debug for FilterSignal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSignal")
            .field("predicates", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&i32)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &str| -> Box<dyn Fn(&i32)> {
            let sink = sink.clone();
            let name = name.to_string();
            Box::new(move |v: &i32| sink.borrow_mut().push(format!("{}:{}", name, v)))
        };
        (log, make)
    }

    #[test]
    fn test_fire_in_connection_order() {
        let signal: Signal<i32> = Signal::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let c = make("c");
        let _ = signal.connect(move |v| a(v));
        let _ = signal.connect(move |v| b(v));
        let _ = signal.connect(move |v| c(v));

        signal.fire(&1);
        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let signal: Signal<i32> = Signal::new();
        let (log, make) = recorder();
        let a = make("a");
        let conn = signal.connect(move |v| a(v));
        assert!(conn.is_connected());

        assert!(signal.disconnect(&conn));
        conn.disconnect();
        assert!(!conn.is_connected());
        assert!(signal.is_empty());

        signal.fire(&1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_foreign_handle_is_ignored() {
        let first: Signal<i32> = Signal::new();
        let second: Signal<i32> = Signal::new();
        let conn = first.connect(|_| {});

        assert!(!second.disconnect(&conn));
        assert!(conn.is_connected(), "foreign disconnect must be a no-op");
    }

    #[test]
    fn test_self_disconnect_during_fire() {
        let signal: Signal<i32> = Signal::new();
        let calls = Rc::new(Cell::new(0));
        let handle: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));

        let calls_in = calls.clone();
        let handle_in = handle.clone();
        let conn = signal.connect(move |_| {
            calls_in.set(calls_in.get() + 1);
            if let Some(conn) = handle_in.borrow().as_ref() {
                conn.disconnect();
            }
        });
        *handle.borrow_mut() = Some(conn);

        signal.fire(&0);
        signal.fire(&0);
        assert_eq!(calls.get(), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_disconnect_later_subscriber_mid_fire() {
        let signal: Signal<i32> = Signal::new();
        let later_calls = Rc::new(Cell::new(0));
        let later: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));

        let later_in = later.clone();
        let _ = signal.connect(move |_| {
            if let Some(conn) = later_in.borrow().as_ref() {
                conn.disconnect();
            }
        });
        let counter = later_calls.clone();
        *later.borrow_mut() = Some(signal.connect(move |_| counter.set(counter.get() + 1)));

        signal.fire(&0);
        assert_eq!(later_calls.get(), 0, "disconnected callback must be skipped");
    }

    #[test]
    fn test_connect_during_fire_waits_for_next_fire() {
        let signal: Signal<i32> = Signal::new();
        let added_calls = Rc::new(Cell::new(0));

        let inner = signal.clone();
        let counter = added_calls.clone();
        let _ = signal.connect(move |v| {
            if *v == 0 {
                let counter = counter.clone();
                let _ = inner.connect(move |_| counter.set(counter.get() + 1));
            }
        });

        signal.fire(&0);
        assert_eq!(added_calls.get(), 0);
        signal.fire(&1);
        assert_eq!(added_calls.get(), 1);
    }

    #[test]
    fn test_reentrant_fire() {
        let signal: Signal<i32> = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner = signal.clone();
        let sink = seen.clone();
        let _ = signal.connect(move |v| {
            sink.borrow_mut().push(*v);
            if *v < 3 {
                inner.fire(&(v + 1));
            }
        });

        signal.fire(&0);
        assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_clear() {
        let signal: Signal<i32> = Signal::new();
        let conn = signal.connect(|_| {});
        let _ = signal.connect(|_| {});
        assert_eq!(signal.len(), 2);

        signal.clear();
        assert!(signal.is_empty());
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_filter_short_circuits() {
        let filter: FilterSignal<i32> = FilterSignal::new();
        let reached = Rc::new(Cell::new(false));

        let _ = filter.connect(|v| *v >= 0);
        let _ = filter.connect(|v| *v < 10);
        let flag = reached.clone();
        let _ = filter.connect(move |_| {
            flag.set(true);
            true
        });

        assert!(filter.fire(&5));
        assert!(reached.get());

        reached.set(false);
        assert!(!filter.fire(&12));
        assert!(!reached.get(), "predicates after a veto must not run");
    }

    #[test]
    fn test_empty_filter_passes() {
        let filter: FilterSignal<()> = FilterSignal::new();
        assert!(filter.fire(&()));
    }
}
