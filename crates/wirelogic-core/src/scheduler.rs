//! Deferred tasks
//!
//! Blocks never sleep or spawn timers themselves. They submit a task with a
//! delay to the host-provided [`Scheduler`] and keep the returned
//! [`TaskHandle`] so the task can be cancelled when the block is disabled or
//! destroyed.
//!
//! [`SimulatedScheduler`] is the in-engine implementation: a virtual clock that
//! only moves when the host calls [`SimulatedScheduler::advance`].

use ordered_float::OrderedFloat;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// A deferred unit of work
pub type Task = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Done,
    Cancelled,
}

/// Shared cancellation handle for a submitted task
#[derive(Clone)]
pub struct TaskHandle {
    state: Rc<Cell<TaskState>>,
    release: Rc<dyn Fn()>,
}

impl TaskHandle {
    /// Handle whose `cancel` also runs `release`, so the scheduler can drop
    /// the queued task right away
    fn with_release(release: impl Fn() + 'static) -> Self {
        Self {
            state: Rc::new(Cell::new(TaskState::Pending)),
            release: Rc::new(release),
        }
    }

    /// Cancel the task if it has not run yet
    ///
    /// Returns `true` if this call cancelled it.
    pub fn cancel(&self) -> bool {
        if self.state.get() != TaskState::Pending {
            return false;
        }
        self.state.set(TaskState::Cancelled);
        (self.release)();
        true
    }

    /// Still waiting to run
    pub fn is_pending(&self) -> bool {
        self.state.get() == TaskState::Pending
    }

    /// Cancelled before it ran
    pub fn is_cancelled(&self) -> bool {
        self.state.get() == TaskState::Cancelled
    }

    fn complete(&self) {
        self.state.set(TaskState::Done);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskHandle").field(&self.state.get()).finish()
    }
}

/// Host capability for running a task after a delay in seconds
pub trait Scheduler {
    /// Submit `task` to run `delay` seconds from now
    fn submit(&self, delay: f64, task: Task) -> TaskHandle;
}

type QueueKey = (OrderedFloat<f64>, u64);
type Queue = RefCell<BTreeMap<QueueKey, Queued>>;

struct Queued {
    task: Task,
    handle: TaskHandle,
}

/// A virtual-time scheduler advanced explicitly by the host
///
/// Tasks run in `(due time, submission order)` order. Cancelling a task
/// removes it from the queue immediately.
pub struct SimulatedScheduler {
    now: Cell<f64>,
    next_seq: Cell<u64>,
    queue: Rc<Queue>,
}

impl SimulatedScheduler {
    /// Create a scheduler at time zero
    pub fn new() -> Self {
        Self {
            now: Cell::new(0.0),
            next_seq: Cell::new(0),
            queue: Rc::new(RefCell::new(BTreeMap::new())),
        }
    }

    /// Current virtual time in seconds
    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Number of tasks still waiting to run
    pub fn pending(&self) -> usize {
        self.queue
            .borrow()
            .values()
            .filter(|queued| queued.handle.is_pending())
            .count()
    }

    /// Advance virtual time by `dt` seconds, running every task that falls due
    ///
    /// While a task runs, `now` is its due time. Tasks submitted during the
    /// advance run too if they fall due before it ends. Returns the number of
    /// tasks run.
    pub fn advance(&self, dt: f64) -> usize {
        let target = self.now.get() + sanitize(dt);
        let mut ran = 0;

        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let ready = queue
                    .first_key_value()
                    .is_some_and(|((due, _), _)| due.into_inner() <= target);
                if ready {
                    queue.pop_first()
                } else {
                    None
                }
            };
            let Some(((due, _), queued)) = next else {
                break;
            };

            if !queued.handle.is_pending() {
                continue;
            }
            self.now.set(due.into_inner());
            queued.handle.complete();
            (queued.task)();
            ran += 1;
        }

        self.now.set(target);
        ran
    }
}

impl Scheduler for SimulatedScheduler {
    fn submit(&self, delay: f64, task: Task) -> TaskHandle {
        let due = self.now.get() + sanitize(delay);
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let key = (OrderedFloat(due), seq);
        let queue: Weak<Queue> = Rc::downgrade(&self.queue);
        let handle = TaskHandle::with_release(move || {
            if let Some(queue) = queue.upgrade() {
                // dropped outside the borrow; a task's captures may touch the queue
                let removed = queue.borrow_mut().remove(&key);
                drop(removed);
            }
        });
        self.queue.borrow_mut().insert(
            key,
            Queued {
                task,
                handle: handle.clone(),
            },
        );
        handle
    }
}

impl Default for SimulatedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimulatedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

fn sanitize(delay: f64) -> f64 {
    if delay.is_finite() && delay > 0.0 {
        delay
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Task {
        let log = log.clone();
        Box::new(move || log.borrow_mut().push(label))
    }

    #[test]
    fn test_runs_in_due_then_submission_order() {
        let scheduler = SimulatedScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.submit(2.0, push(&log, "late"));
        scheduler.submit(1.0, push(&log, "first"));
        scheduler.submit(1.0, push(&log, "second"));

        assert_eq!(scheduler.advance(0.5), 0);
        assert_eq!(scheduler.advance(1.0), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(scheduler.advance(0.5), 1);
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
        assert_eq!(scheduler.now(), 2.0);
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let scheduler = SimulatedScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let handle = scheduler.submit(1.0, push(&log, "cancelled"));
        assert!(handle.is_pending());
        assert!(handle.cancel());
        assert!(!handle.cancel(), "second cancel is a no-op");
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(5.0);
        assert!(log.borrow().is_empty());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_cancel_releases_queued_task() {
        let scheduler = SimulatedScheduler::new();
        let captured = Rc::new(());
        let held = captured.clone();

        let handle = scheduler.submit(10.0, Box::new(move || drop(held)));
        assert_eq!(Rc::strong_count(&captured), 2);
        handle.cancel();
        assert_eq!(
            Rc::strong_count(&captured),
            1,
            "cancel drops the task before its due time"
        );
        assert!(scheduler.queue.borrow().is_empty());
    }

    #[test]
    fn test_cancel_after_scheduler_dropped() {
        let scheduler = SimulatedScheduler::new();
        let handle = scheduler.submit(1.0, Box::new(|| {}));
        drop(scheduler);
        assert!(handle.cancel());
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_now_is_due_time_while_running() {
        let scheduler = Rc::new(SimulatedScheduler::new());
        let seen = Rc::new(Cell::new(-1.0));

        let clock = scheduler.clone();
        let sink = seen.clone();
        scheduler.submit(0.75, Box::new(move || sink.set(clock.now())));

        scheduler.advance(2.0);
        assert_eq!(seen.get(), 0.75);
        assert_eq!(scheduler.now(), 2.0);
    }

    #[test]
    fn test_task_submitted_during_advance() {
        let scheduler = Rc::new(SimulatedScheduler::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = scheduler.clone();
        let inner_log = log.clone();
        scheduler.submit(
            1.0,
            Box::new(move || {
                inner_log.borrow_mut().push("outer");
                let nested_log = inner_log.clone();
                inner.submit(0.5, Box::new(move || nested_log.borrow_mut().push("nested")));
                let late_log = inner_log.clone();
                inner.submit(5.0, Box::new(move || late_log.borrow_mut().push("late")));
            }),
        );

        scheduler.advance(2.0);
        assert_eq!(*log.borrow(), vec!["outer", "nested"]);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_bad_delays_run_immediately() {
        let scheduler = SimulatedScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.submit(-3.0, push(&log, "negative"));
        scheduler.submit(f64::NAN, push(&log, "nan"));
        scheduler.advance(0.0);
        assert_eq!(*log.borrow(), vec!["negative", "nan"]);
    }
}
