//! Deferred callbacks: "run this after the current synchronous step,
//! unless canceled first".
//!
//! Observed roots only need the [`Scheduler`] trait. [`TaskQueue`] is the
//! provided implementation: a FIFO queue that the host drains between steps
//! of its own loop with [`TaskQueue::run_pending`]. Each thread has a default
//! queue, used by [`crate::Observed::wrap`] and drained by
//! [`crate::run_pending`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce()>;

/// Identifies a scheduled task for cancellation. Handles are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

pub trait Scheduler {
    /// Queues `task` to run after the current synchronous step, in FIFO order
    /// relative to other scheduled tasks.
    fn schedule(&self, task: Task) -> TaskHandle;

    /// Drops a task that has not run yet. Canceling a handle that already
    /// ran or was already canceled does nothing.
    fn cancel(&self, handle: TaskHandle);
}

// ── TaskQueue ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Rc<QueueState>,
}

#[derive(Default)]
struct QueueState {
    last_handle: Cell<u64>,
    running: Cell<bool>,
    tasks: RefCell<VecDeque<(TaskHandle, Task)>>,
}

thread_local! {
    static CURRENT: TaskQueue = TaskQueue::new();
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's default queue.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the oldest pending task. Returns `false` if nothing ran, either
    /// because the queue is empty or because a task is already running on
    /// this queue.
    pub fn run_next(&self) -> bool {
        if self.inner.running.get() {
            return false;
        }
        let next = self.inner.tasks.borrow_mut().pop_front();
        let Some((_, task)) = next else {
            return false;
        };
        self.inner.running.set(true);
        let _reset = RunningGuard(&self.inner.running);
        task();
        true
    }

    /// Runs tasks until the queue is idle, including tasks scheduled by the
    /// tasks themselves. Returns how many ran.
    ///
    /// Called from inside a running task this returns `0` without running
    /// anything, so tasks never nest.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) -> TaskHandle {
        let handle = TaskHandle(self.inner.last_handle.get() + 1);
        self.inner.last_handle.set(handle.0);
        self.inner.tasks.borrow_mut().push_back((handle, task));
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        self.inner.tasks.borrow_mut().retain(|(h, _)| *h != handle);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .field("running", &self.inner.running.get())
            .finish()
    }
}

/// Drains the calling thread's default queue.
pub fn run_pending() -> usize {
    TaskQueue::current().run_pending()
}
