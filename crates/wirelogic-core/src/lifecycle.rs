//! Block lifecycle
//!
//! ```text
//! Constructed --enable--> Enabled --disable--> Disabled --enable--> Enabled
//!      any state --destroy--> Destroyed (terminal)
//! ```
//!
//! A [`Component`] owns everything a block must release when it stops: the
//! subscriptions registered in its [`EventHandler`] and the handles of tasks
//! it scheduled. Subscriptions are only live while the component is enabled.

use crate::observable::ObservableValue;
use crate::scheduler::{Scheduler, Task, TaskHandle};
use crate::signal::{Connection, Signal};
use log::debug;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Lifecycle state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Constructed,
    Enabled,
    Disabled,
    Destroyed,
}

type Connector = Rc<dyn Fn() -> Connection>;

/// Subscriptions that connect on enable and disconnect on disable
///
/// Each registration is a connector closure; enabling calls every connector in
/// registration order and keeps the returned connections.
#[derive(Default)]
pub struct EventHandler {
    connectors: RefCell<Vec<Connector>>,
    live: RefCell<Vec<Connection>>,
    enabled: Cell<bool>,
}

impl EventHandler {
    /// Create a disabled handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector; connects right away if the handler is enabled
    pub fn register(&self, connect: impl Fn() -> Connection + 'static) {
        let connector: Connector = Rc::new(connect);
        self.connectors.borrow_mut().push(connector.clone());
        if self.enabled.get() {
            self.connect_one(&connector);
        }
    }

    /// Subscribe to an observable while enabled
    pub fn subscribe_observable<T: Clone + PartialEq + 'static>(
        &self,
        observable: &ObservableValue<T>,
        callback: impl Fn(&T, &T) + 'static,
        fire_immediately: bool,
    ) {
        let observable = observable.clone();
        let callback = Rc::new(callback);
        self.register(move || {
            let callback = callback.clone();
            observable.subscribe(move |value, prev| callback(value, prev), fire_immediately)
        });
    }

    /// Connect to a signal while enabled
    pub fn subscribe_signal<A: 'static>(&self, signal: &Signal<A>, callback: impl Fn(&A) + 'static) {
        let signal = signal.clone();
        let callback = Rc::new(callback);
        self.register(move || {
            let callback = callback.clone();
            signal.connect(move |args| callback(args))
        });
    }

    /// Connect every registered subscription
    ///
    /// A fire-immediately callback may disable the handler again; the
    /// remaining connectors are then skipped.
    pub fn enable(&self) {
        if self.enabled.replace(true) {
            return;
        }
        let connectors: Vec<Connector> = self.connectors.borrow().clone();
        for connector in &connectors {
            if !self.enabled.get() {
                break;
            }
            self.connect_one(connector);
        }
    }

    fn connect_one(&self, connector: &Connector) {
        let connection = connector();
        if self.enabled.get() {
            self.live.borrow_mut().push(connection);
        } else {
            connection.disconnect();
        }
    }

    /// Disconnect every live subscription (registrations are kept)
    pub fn disable(&self) {
        if !self.enabled.replace(false) {
            return;
        }
        let live = std::mem::take(&mut *self.live.borrow_mut());
        for connection in &live {
            connection.disconnect();
        }
    }

    /// Disable and forget every registration
    pub fn clear(&self) {
        self.disable();
        let connectors = std::mem::take(&mut *self.connectors.borrow_mut());
        drop(connectors);
    }

    /// Whether subscriptions are currently connected
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Number of registered subscriptions
    pub fn len(&self) -> usize {
        self.connectors.borrow().len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.connectors.borrow().is_empty()
    }

    /// Number of currently connected subscriptions
    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("registered", &self.len())
            .field("live", &self.live_count())
            .field("enabled", &self.enabled.get())
            .finish()
    }
}

struct ComponentCore {
    label: String,
    state: Cell<LifecycleState>,
    events: EventHandler,
    tasks: RefCell<Vec<TaskHandle>>,
    scheduler: Option<Rc<dyn Scheduler>>,
    on_enabled: Signal<()>,
    on_disabled: Signal<()>,
    on_destroyed: Signal<()>,
}

impl ComponentCore {
    fn schedule(&self, delay: f64, task: Task) -> Option<TaskHandle> {
        if self.state.get() != LifecycleState::Enabled {
            debug!("{}: not enabled, dropping scheduled task", self.label);
            return None;
        }
        let Some(scheduler) = &self.scheduler else {
            debug!("{}: no scheduler, dropping scheduled task", self.label);
            return None;
        };
        let handle = scheduler.submit(delay, task);
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(TaskHandle::is_pending);
        tasks.push(handle.clone());
        Some(handle)
    }

    fn cancel_tasks(&self) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        for task in &tasks {
            task.cancel();
        }
    }
}

/// Lifecycle state plus the resources released on disable and destroy
///
/// Dropping a component that was never destroyed destroys it.
pub struct Component {
    core: Rc<ComponentCore>,
}

impl Component {
    /// Create a component without a scheduler
    pub fn new(label: impl Into<String>) -> Self {
        Self::build(label.into(), None)
    }

    /// Create a component that can schedule tasks
    pub fn with_scheduler(label: impl Into<String>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::build(label.into(), Some(scheduler))
    }

    fn build(label: String, scheduler: Option<Rc<dyn Scheduler>>) -> Self {
        Self {
            core: Rc::new(ComponentCore {
                label,
                state: Cell::new(LifecycleState::Constructed),
                events: EventHandler::new(),
                tasks: RefCell::new(Vec::new()),
                scheduler,
                on_enabled: Signal::new(),
                on_disabled: Signal::new(),
                on_destroyed: Signal::new(),
            }),
        }
    }

    /// Label used in log output
    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        self.core.state.get()
    }

    /// Subscriptions owned by this component
    pub fn events(&self) -> &EventHandler {
        &self.core.events
    }

    /// Enter the Enabled state
    ///
    /// Returns `false` if already enabled or destroyed.
    pub fn enable(&self) -> bool {
        let core = &self.core;
        match core.state.get() {
            LifecycleState::Enabled | LifecycleState::Destroyed => return false,
            LifecycleState::Constructed | LifecycleState::Disabled => {}
        }
        debug!("{}: enabled", core.label);
        core.state.set(LifecycleState::Enabled);
        core.events.enable();
        if core.state.get() == LifecycleState::Enabled {
            core.on_enabled.fire(&());
        }
        true
    }

    /// Leave the Enabled state, disconnecting subscriptions and cancelling tasks
    ///
    /// Returns `false` unless the component was enabled.
    pub fn disable(&self) -> bool {
        let core = &self.core;
        if core.state.get() != LifecycleState::Enabled {
            return false;
        }
        debug!("{}: disabled", core.label);
        core.state.set(LifecycleState::Disabled);
        core.events.disable();
        core.cancel_tasks();
        core.on_disabled.fire(&());
        true
    }

    /// Enter the terminal Destroyed state
    ///
    /// Returns `false` if already destroyed.
    pub fn destroy(&self) -> bool {
        let core = &self.core;
        if core.state.get() == LifecycleState::Destroyed {
            return false;
        }
        debug!("{}: destroyed", core.label);
        core.state.set(LifecycleState::Destroyed);
        core.events.clear();
        core.cancel_tasks();
        core.on_destroyed.fire(&());
        core.on_enabled.clear();
        core.on_disabled.clear();
        core.on_destroyed.clear();
        true
    }

    /// Submit a task to the scheduler while enabled
    ///
    /// The handle is cancelled on disable or destroy. Returns `None` when the
    /// component is not enabled or has no scheduler.
    pub fn schedule(&self, delay: f64, task: impl FnOnce() + 'static) -> Option<TaskHandle> {
        self.core.schedule(delay, Box::new(task))
    }

    /// A weak handle usable from inside subscriptions
    pub fn handle(&self) -> ComponentHandle {
        ComponentHandle {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Number of scheduled tasks still pending
    pub fn pending_tasks(&self) -> usize {
        self.core
            .tasks
            .borrow()
            .iter()
            .filter(|task| task.is_pending())
            .count()
    }

    /// Fired after entering Enabled
    pub fn on_enabled(&self) -> &Signal<()> {
        &self.core.on_enabled
    }

    /// Fired after leaving Enabled
    pub fn on_disabled(&self) -> &Signal<()> {
        &self.core.on_disabled
    }

    /// Fired after entering Destroyed
    pub fn on_destroyed(&self) -> &Signal<()> {
        &self.core.on_destroyed
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("label", &self.core.label)
            .field("state", &self.state())
            .field("events", &self.core.events)
            .finish()
    }
}

/// Weak handle to a [`Component`]
///
/// Captured by subscriptions that need to schedule work without keeping the
/// block alive. Every operation is a no-op once the component is gone.
#[derive(Clone)]
pub struct ComponentHandle {
    core: Weak<ComponentCore>,
}

impl ComponentHandle {
    /// Current state, `Destroyed` once the component is dropped
    pub fn state(&self) -> LifecycleState {
        self.core
            .upgrade()
            .map_or(LifecycleState::Destroyed, |core| core.state.get())
    }

    /// Submit a task while the component is enabled
    pub fn schedule(&self, delay: f64, task: impl FnOnce() + 'static) -> Option<TaskHandle> {
        self.core.upgrade()?.schedule(delay, Box::new(task))
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentHandle").field(&self.state()).finish()
    }
}

/// Lifecycle operations, provided over a [`Component`]
pub trait Lifecycle {
    /// The component holding this object's state
    fn component(&self) -> &Component;

    fn state(&self) -> LifecycleState {
        self.component().state()
    }

    fn is_enabled(&self) -> bool {
        self.state() == LifecycleState::Enabled
    }

    fn is_destroyed(&self) -> bool {
        self.state() == LifecycleState::Destroyed
    }

    fn enable(&self) -> bool {
        self.component().enable()
    }

    fn disable(&self) -> bool {
        self.component().disable()
    }

    fn destroy(&self) -> bool {
        self.component().destroy()
    }
}

impl Lifecycle for Component {
    fn component(&self) -> &Component {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SimulatedScheduler;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        (count, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn test_state_machine() {
        let component = Component::new("test");
        assert_eq!(component.state(), LifecycleState::Constructed);
        assert!(!component.disable(), "cannot disable before enabling");

        assert!(component.enable());
        assert!(!component.enable());
        assert!(component.disable());
        assert_eq!(component.state(), LifecycleState::Disabled);
        assert!(component.enable());

        assert!(component.destroy());
        assert!(!component.destroy());
        assert!(!component.enable(), "destroyed is terminal");
        assert!(!component.disable());
        assert_eq!(component.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn test_subscriptions_live_only_while_enabled() {
        let component = Component::new("test");
        let source = ObservableValue::new(0);
        let (count, bump) = counter();
        component
            .events()
            .subscribe_observable(&source, move |_, _| bump(), false);

        source.set(1);
        assert_eq!(count.get(), 0, "not connected before enable");

        component.enable();
        source.set(2);
        assert_eq!(count.get(), 1);

        component.disable();
        source.set(3);
        assert_eq!(count.get(), 1, "disconnected while disabled");
        assert_eq!(source.subscriber_count(), 0);

        component.enable();
        source.set(4);
        assert_eq!(count.get(), 2, "reconnected on re-enable");

        component.destroy();
        source.set(5);
        assert_eq!(count.get(), 2);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_fire_immediately_on_each_enable() {
        let component = Component::new("test");
        let source = ObservableValue::new(7);
        let (count, bump) = counter();
        component
            .events()
            .subscribe_observable(&source, move |_, _| bump(), true);

        assert_eq!(count.get(), 0);
        component.enable();
        assert_eq!(count.get(), 1);
        component.disable();
        component.enable();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_register_while_enabled_connects_now() {
        let component = Component::new("test");
        component.enable();
        let signal: Signal<u32> = Signal::new();
        let (count, bump) = counter();
        component.events().subscribe_signal(&signal, move |_| bump());

        signal.fire(&1);
        assert_eq!(count.get(), 1);
        assert_eq!(component.events().live_count(), 1);
    }

    #[test]
    fn test_hooks_fire_after_transitions() {
        let component = Component::new("test");
        let (enabled, on_enabled) = counter();
        let (disabled, on_disabled) = counter();
        let (destroyed, on_destroyed) = counter();
        let _c1 = component.on_enabled().connect(move |_| on_enabled());
        let _c2 = component.on_disabled().connect(move |_| on_disabled());
        let _c3 = component.on_destroyed().connect(move |_| on_destroyed());

        component.enable();
        component.disable();
        component.destroy();
        component.destroy();
        assert_eq!(
            (enabled.get(), disabled.get(), destroyed.get()),
            (1, 1, 1),
            "each hook fires once"
        );
    }

    #[test]
    fn test_schedule_only_while_enabled_and_cancelled_on_disable() {
        let scheduler = Rc::new(SimulatedScheduler::new());
        let component = Component::with_scheduler("test", scheduler.clone());
        let (count, bump) = counter();
        let bump = Rc::new(bump);

        let b = bump.clone();
        assert!(component.schedule(1.0, move || b()).is_none());

        component.enable();
        let b = bump.clone();
        let handle = component.schedule(1.0, move || b()).expect("enabled");
        assert_eq!(component.pending_tasks(), 1);

        component.disable();
        assert!(handle.is_cancelled());
        scheduler.advance(2.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_drop_tears_down() {
        let scheduler = Rc::new(SimulatedScheduler::new());
        let source = ObservableValue::new(0);
        let (count, bump) = counter();
        let handle;
        {
            let component = Component::with_scheduler("test", scheduler.clone());
            component
                .events()
                .subscribe_observable(&source, |_, _| {}, false);
            component.enable();
            handle = component.schedule(1.0, bump);
            assert_eq!(source.subscriber_count(), 1);
        }

        assert_eq!(source.subscriber_count(), 0);
        assert!(handle.is_some_and(|h| h.is_cancelled()));
        scheduler.advance(2.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_weak_handle() {
        let component = Component::new("test");
        let handle = component.handle();
        component.enable();
        assert_eq!(handle.state(), LifecycleState::Enabled);
        assert!(
            handle.schedule(0.0, || {}).is_none(),
            "no scheduler installed"
        );

        drop(component);
        assert_eq!(handle.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn test_destroy_from_fire_immediately_callback() {
        let component = Rc::new(Component::new("test"));
        let source = ObservableValue::new(1);
        let other = ObservableValue::new(2);

        let weak = Rc::downgrade(&component);
        component.events().subscribe_observable(
            &source,
            move |_, _| {
                if let Some(component) = weak.upgrade() {
                    component.destroy();
                }
            },
            true,
        );
        component
            .events()
            .subscribe_observable(&other, |_, _| {}, true);

        component.enable();
        assert_eq!(component.state(), LifecycleState::Destroyed);
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(other.subscriber_count(), 0);
    }
}
