//! Observable values with change notification
//!
//! An [`ObservableValue`] holds one value and a `changed` signal. Every `set`
//! passes the candidate through the middleware stack (registration order),
//! then through the optional decorator, and only stores and notifies when the
//! result differs from the current value.
//!
//! Setting a value synchronously runs every subscriber before `set` returns,
//! and subscribers may set other observables in turn. Nothing here detects
//! feedback loops: wiring a value back into itself recurses until the
//! decorated value settles, or forever if it never does.

use crate::signal::{Connection, Signal};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Decorator<T> = Box<dyn Fn(T) -> T>;
type Middleware<T> = Rc<dyn Fn(T, &T) -> T>;

struct ObservableInner<T: 'static> {
    value: RefCell<T>,
    changed: Signal<(T, T)>,
    decorator: Option<Decorator<T>>,
    middleware: RefCell<Vec<Middleware<T>>>,
}

/// A shared value with change notification
///
/// Cloning produces another handle to the same value; this is how an output
/// port is handed to the blocks that read it.
pub struct ObservableValue<T: 'static> {
    inner: Rc<ObservableInner<T>>,
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> {
    /// Create an observable with no decorator
    pub fn new(value: T) -> Self {
        Self::build(value, None)
    }

    /// Create an observable whose every assigned value passes through `decorate`
    ///
    /// The initial value is decorated too.
    pub fn with_decorator(value: T, decorate: impl Fn(T) -> T + 'static) -> Self {
        let value = decorate(value);
        Self::build(value, Some(Box::new(decorate)))
    }

    fn build(value: T, decorator: Option<Decorator<T>>) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                changed: Signal::new(),
                decorator,
                middleware: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current (decorated) value
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Assign a value
    ///
    /// Middleware runs first, in registration order, each seeing the previous
    /// stored value; the decorator runs last. `changed` fires with
    /// `(new, prev)` only when the result differs from the stored value.
    pub fn set(&self, value: T) {
        let prev = self.get();
        let middleware: Vec<Middleware<T>> = self.inner.middleware.borrow().clone();

        let mut candidate = value;
        for step in middleware {
            candidate = step(candidate, &prev);
        }
        if let Some(decorate) = &self.inner.decorator {
            candidate = decorate(candidate);
        }
        if candidate == prev {
            return;
        }

        *self.inner.value.borrow_mut() = candidate.clone();
        self.inner.changed.fire(&(candidate, prev));
    }

    /// The `(value, prev)` change signal
    pub fn changed(&self) -> &Signal<(T, T)> {
        &self.inner.changed
    }

    /// Subscribe to changes
    ///
    /// With `fire_immediately`, the callback also runs once right away with the
    /// current value as both `value` and `prev`.
    pub fn subscribe(
        &self,
        callback: impl Fn(&T, &T) + 'static,
        fire_immediately: bool,
    ) -> Connection {
        let callback = Rc::new(callback);
        let on_change = callback.clone();
        let connection = self
            .inner
            .changed
            .connect(move |change: &(T, T)| on_change(&change.0, &change.1));

        if fire_immediately {
            let current = self.get();
            callback(&current, &current);
        }
        connection
    }

    /// Push a middleware `(candidate, prev) -> candidate` onto the stack
    pub fn add_middleware(&self, middleware: impl Fn(T, &T) -> T + 'static) {
        self.inner
            .middleware
            .borrow_mut()
            .push(Rc::new(middleware));
    }

    /// Whether a decorator was installed at construction
    pub fn is_decorated(&self) -> bool {
        self.inner.decorator.is_some()
    }

    /// Number of connected change subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.changed.len()
    }

    /// Whether two handles refer to the same value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Derive a read-only observable that tracks `f(self)`
    ///
    /// The derived value recomputes on every source change and notifies its
    /// own subscribers only when its result changes. The source keeps only a
    /// weak link: dropping every clone of the derived value disconnects it.
    pub fn create_based<U: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&T) -> U + 'static,
    ) -> ReadonlyObservableValue<U> {
        let derived = ObservableValue::new(f(&self.get()));
        let target = Rc::downgrade(&derived.inner);
        let source = Rc::downgrade(&self.inner);
        // A nested set may already have moved the source past the fired value.
        let connection = self.subscribe(
            move |_, _| {
                if let (Some(inner), Some(source)) = (target.upgrade(), source.upgrade()) {
                    let current = ObservableValue { inner: source }.get();
                    ObservableValue { inner }.set(f(&current));
                }
            },
            false,
        );

        ReadonlyObservableValue {
            value: derived,
            links: vec![Rc::new(SourceLink {
                connection,
                _source: Box::new(self.clone()),
            })],
        }
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for ObservableValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: 'static> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableValue")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.changed.len())
            .finish()
    }
}

/// Holds the source alive and subscribed; disconnects on drop
struct SourceLink {
    connection: Connection,
    _source: Box<dyn Any>,
}

impl Drop for SourceLink {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}

/// A derived observable that can be read and subscribed to but not set
pub struct ReadonlyObservableValue<T: 'static> {
    value: ObservableValue<T>,
    links: Vec<Rc<SourceLink>>,
}

impl<T: Clone + PartialEq + 'static> ReadonlyObservableValue<T> {
    /// Current derived value
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Subscribe to changes of the derived value
    pub fn subscribe(
        &self,
        callback: impl Fn(&T, &T) + 'static,
        fire_immediately: bool,
    ) -> Connection {
        self.value.subscribe(callback, fire_immediately)
    }

    /// The `(value, prev)` change signal
    pub fn changed(&self) -> &Signal<(T, T)> {
        self.value.changed()
    }

    /// Derive again; the new value keeps this one's source links alive
    pub fn create_based<U: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&T) -> U + 'static,
    ) -> ReadonlyObservableValue<U> {
        let mut derived = self.value.create_based(f);
        derived.links.extend(self.links.iter().cloned());
        derived
    }

    /// Whether two handles refer to the same derived value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.value.ptr_eq(&other.value)
    }
}

impl<T: 'static> Clone for ReadonlyObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            links: self.links.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadonlyObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadonlyObservableValue")
            .field(&self.value)
            .finish()
    }
}
