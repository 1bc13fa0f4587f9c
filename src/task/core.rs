use crate::fork::{CancelHandle, Settle};
use crate::promise::Promise;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

type Computation<E, S> = dyn Fn(Settle<E, S>) -> CancelHandle;

/// A lazy, cancellable computation that either fails with `E` or succeeds
/// with `S`.
///
/// A `Task` does nothing until it is [forked](Self::fork). Every fork runs
/// the computation again, independently, and delivers at most one outcome
/// to the callbacks it was given. Composition never reaches into a task: a
/// combinator wraps the tasks it receives in a new computation which forks
/// them.
///
/// Cloning a `Task` is cheap and yields a handle to the same computation.
pub struct Task<E, S> {
    /// The wrapped computation, run once per fork.
    computation: Rc<Computation<E, S>>,

    /// Set by [`cancel`](Self::cancel). Shared by every clone.
    cancelled: Rc<Cell<bool>>,
}

impl<E: 'static, S: 'static> Task<E, S> {
    /// Creates a task from its computation.
    ///
    /// The computation receives the [`Settle`] channels of the fork and
    /// returns a [`CancelHandle`] for whatever it started (a timer, child
    /// forks), or [`CancelHandle::noop`] when it settled synchronously or
    /// owns nothing cancellable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::{CancelHandle, Task};
    ///
    /// let task: Task<String, u32> = Task::new(|settle| {
    ///     settle.resolve(42);
    ///     CancelHandle::noop()
    /// });
    /// ```
    pub fn new<F>(computation: F) -> Self
    where
        F: Fn(Settle<E, S>) -> CancelHandle + 'static,
    {
        Self {
            computation: Rc::new(computation),
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    /// Starts the computation.
    ///
    /// At most one of `reject` or `resolve` is ever called, at most once.
    /// The returned handle cancels this particular run and every child it
    /// started.
    pub fn fork<R, V>(&self, reject: R, resolve: V) -> CancelHandle
    where
        R: FnOnce(E) + 'static,
        V: FnOnce(S) + 'static,
    {
        if self.cancelled.get() {
            tracing::trace!("fork skipped, task was cancelled before use");
            return CancelHandle::noop();
        }

        tracing::trace!("forking task");

        let handle = CancelHandle::new();
        let settle = Settle::new(reject, resolve, handle.clone());

        let child = (self.computation)(settle);
        handle.link(child);

        handle
    }

    /// Forks this task straight into the channels of another fork and links
    /// the child's cancellation to it.
    pub(crate) fn fork_into(&self, settle: &Settle<E, S>) -> CancelHandle {
        let child = self.fork(settle.rejecter(), settle.resolver());
        settle.link(child.clone());
        child
    }

    /// Marks the task as cancelled before use.
    ///
    /// Every later fork, through any clone, returns an inert handle without
    /// running the computation. Forks already running are not affected; use
    /// the handle they returned for those.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any
    /// clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl<E, S> Clone for Task<E, S> {
    fn clone(&self) -> Self {
        Self {
            computation: self.computation.clone(),
            cancelled: self.cancelled.clone(),
        }
    }
}

impl<E, S> fmt::Debug for Task<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("cancelled", &self.cancelled.get())
            .finish_non_exhaustive()
    }
}

/// Conversion into a [`Task`] at combinator boundaries.
///
/// Combinators that accept "a task or an eager future" take `impl IntoTask`.
/// Tasks convert to themselves; a [`Promise`] becomes an already-started
/// task whose cancellation only detaches the continuation.
pub trait IntoTask {
    type Error;
    type Output;

    fn into_task(self) -> Task<Self::Error, Self::Output>;
}

impl<E, S> IntoTask for Task<E, S> {
    type Error = E;
    type Output = S;

    fn into_task(self) -> Task<E, S> {
        self
    }
}

/// Either a [`Task`] or a [`Promise`], for collections mixing both.
pub enum TaskOrPromise<E, S> {
    Task(Task<E, S>),
    Promise(Promise<E, S>),
}

impl<E, S> From<Task<E, S>> for TaskOrPromise<E, S> {
    fn from(task: Task<E, S>) -> Self {
        Self::Task(task)
    }
}

impl<E, S> From<Promise<E, S>> for TaskOrPromise<E, S> {
    fn from(promise: Promise<E, S>) -> Self {
        Self::Promise(promise)
    }
}

impl<E: Clone + 'static, S: Clone + 'static> IntoTask for TaskOrPromise<E, S> {
    type Error = E;
    type Output = S;

    fn into_task(self) -> Task<E, S> {
        match self {
            Self::Task(task) => task,
            Self::Promise(promise) => promise.into_task(),
        }
    }
}
