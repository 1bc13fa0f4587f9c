//! Tasks settled from outside their computation.

use crate::fork::{CancelHandle, Settle};
use crate::task::{IntoTask, Task};
use crate::utils::{Slab, SlabKey};

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

enum LastState<E, S> {
    Pending,
    Failed(E),
    Succeeded(S),
}

/// Callbacks of a [`watch`](ExternalTask::watch) observer.
struct Watcher<E, S> {
    reject: Rc<dyn Fn(E)>,
    resolve: Rc<dyn Fn(S)>,
}

impl<E, S> Clone for Watcher<E, S> {
    fn clone(&self) -> Self {
        Self {
            reject: self.reject.clone(),
            resolve: self.resolve.clone(),
        }
    }
}

struct ExternalState<E, S> {
    last: LastState<E, S>,

    /// Forks registered while the state was pending.
    waiting: Slab<Settle<E, S>>,

    /// Observers receiving every state.
    watchers: Slab<Watcher<E, S>>,
}

/// A [`Task`] settled by calls to [`resolve`](Self::resolve) and
/// [`reject`](Self::reject).
///
/// The task remembers the last state it was given. A fork made after a
/// `resolve` or `reject` receives that state synchronously; a fork made
/// while pending waits for the next call. Each call overwrites the
/// remembered state and notifies every fork currently waiting, so the
/// external task behaves as a small broadcast variable. Every individual
/// fork still receives at most one outcome; use [`watch`](Self::watch) to
/// observe the whole stream of states.
///
/// `ExternalTask` dereferences to its [`Task`], so it can be forked and
/// composed directly.
///
/// # Examples
///
/// ```rust
/// use forked::ExternalTask;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let external = ExternalTask::<(), i32>::new();
/// let seen = Rc::new(Cell::new(0));
///
/// external.map(|v| v * 2).fork(|_| {}, {
///     let seen = seen.clone();
///     move |v| seen.set(v)
/// });
/// external.resolve(21);
///
/// assert_eq!(seen.get(), 42);
/// ```
pub struct ExternalTask<E, S> {
    task: Task<E, S>,
    state: Rc<RefCell<ExternalState<E, S>>>,
}

enum Replay<E, S> {
    Resolve(S),
    Reject(E),
    Wait(SlabKey),
}

impl<E: Clone + 'static, S: Clone + 'static> ExternalTask<E, S> {
    pub fn new() -> Self {
        let state = Rc::new(RefCell::new(ExternalState {
            last: LastState::<E, S>::Pending,
            waiting: Slab::default(),
            watchers: Slab::default(),
        }));

        let task = Task::new({
            let state = state.clone();

            move |settle: Settle<E, S>| {
                let replay = {
                    let mut guard = state.borrow_mut();
                    let external = &mut *guard;

                    match external.last {
                        LastState::Succeeded(ref value) => Replay::Resolve(value.clone()),
                        LastState::Failed(ref error) => Replay::Reject(error.clone()),
                        LastState::Pending => Replay::Wait(external.waiting.insert(settle.clone())),
                    }
                };

                match replay {
                    Replay::Resolve(value) => {
                        settle.resolve(value);
                        CancelHandle::noop()
                    }
                    Replay::Reject(error) => {
                        settle.reject(error);
                        CancelHandle::noop()
                    }
                    Replay::Wait(key) => unregister(Rc::downgrade(&state), key),
                }
            }
        });

        Self { task, state }
    }

    /// Records `value`, resolves every waiting fork with it and notifies
    /// every watcher.
    pub fn resolve(&self, value: S) {
        let (waiting, watchers) = {
            let mut state = self.state.borrow_mut();
            state.last = LastState::Succeeded(value.clone());
            (state.waiting.drain(), state.watchers.values())
        };

        tracing::debug!(forks = waiting.len(), watchers = watchers.len(), "external task resolved");

        for settle in waiting {
            settle.resolve(value.clone());
        }

        for watcher in watchers {
            (watcher.resolve)(value.clone());
        }
    }

    /// Records `error`, rejects every waiting fork with it and notifies
    /// every watcher.
    pub fn reject(&self, error: E) {
        let (waiting, watchers) = {
            let mut state = self.state.borrow_mut();
            state.last = LastState::Failed(error.clone());
            (state.waiting.drain(), state.watchers.values())
        };

        tracing::debug!(forks = waiting.len(), watchers = watchers.len(), "external task rejected");

        for settle in waiting {
            settle.reject(error.clone());
        }

        for watcher in watchers {
            (watcher.reject)(error.clone());
        }
    }

    /// Observes every state the task goes through.
    ///
    /// Unlike a fork, a watcher stays attached: the remembered state, if
    /// any, is replayed right away and every later `resolve` or `reject`
    /// calls the matching callback again. Cancelling the returned handle
    /// detaches the watcher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::ExternalTask;
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// let status = ExternalTask::<&str, u8>::new();
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    ///
    /// let (errors, values) = (seen.clone(), seen.clone());
    /// status.watch(
    ///     move |e| errors.borrow_mut().push(Err(e)),
    ///     move |v| values.borrow_mut().push(Ok(v)),
    /// );
    ///
    /// status.resolve(1);
    /// status.reject("offline");
    ///
    /// assert_eq!(*seen.borrow(), [Ok(1), Err("offline")]);
    /// ```
    pub fn watch(&self, on_reject: impl Fn(E) + 'static, on_resolve: impl Fn(S) + 'static) -> CancelHandle {
        let watcher = Watcher {
            reject: Rc::new(on_reject) as Rc<dyn Fn(E)>,
            resolve: Rc::new(on_resolve) as Rc<dyn Fn(S)>,
        };

        let (key, replay) = {
            let mut state = self.state.borrow_mut();
            let replay = match state.last {
                LastState::Succeeded(ref value) => Some(Ok(value.clone())),
                LastState::Failed(ref error) => Some(Err(error.clone())),
                LastState::Pending => None,
            };
            (state.watchers.insert(watcher.clone()), replay)
        };

        match replay {
            Some(Ok(value)) => (watcher.resolve)(value),
            Some(Err(error)) => (watcher.reject)(error),
            None => {}
        }

        let state = Rc::downgrade(&self.state);
        CancelHandle::from_fn(move || {
            if let Some(state) = state.upgrade() {
                state.borrow_mut().watchers.remove(key);
            }
        })
    }

    /// Returns `true` until the first `resolve` or `reject`.
    pub fn is_pending(&self) -> bool {
        matches!(self.state.borrow().last, LastState::Pending)
    }

    /// Number of forks waiting for the next state. Watchers are not counted.
    pub fn waiting(&self) -> usize {
        self.state.borrow().waiting.len()
    }

    /// The underlying task.
    pub fn task(&self) -> Task<E, S> {
        self.task.clone()
    }
}

fn unregister<E: 'static, S: 'static>(state: Weak<RefCell<ExternalState<E, S>>>, key: SlabKey) -> CancelHandle {
    CancelHandle::from_fn(move || {
        if let Some(state) = state.upgrade() {
            state.borrow_mut().waiting.remove(key);
        }
    })
}

impl<E: Clone + 'static, S: Clone + 'static> Default for ExternalTask<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> Clone for ExternalTask<E, S> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            state: self.state.clone(),
        }
    }
}

impl<E, S> Deref for ExternalTask<E, S> {
    type Target = Task<E, S>;

    fn deref(&self) -> &Task<E, S> {
        &self.task
    }
}

impl<E, S> IntoTask for ExternalTask<E, S> {
    type Error = E;
    type Output = S;

    fn into_task(self) -> Task<E, S> {
        self.task
    }
}

impl<E, S> fmt::Debug for ExternalTask<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let last = match state.last {
            LastState::Pending => "pending",
            LastState::Failed(_) => "failed",
            LastState::Succeeded(_) => "succeeded",
        };

        f.debug_struct("ExternalTask")
            .field("last", &last)
            .field("waiting", &state.waiting.len())
            .finish()
    }
}

/// Creates a pending [`ExternalTask`].
pub fn external<E: Clone + 'static, S: Clone + 'static>() -> ExternalTask<E, S> {
    ExternalTask::new()
}

/// Adapts a callback-style API.
///
/// Returns an external task and a trigger. Calling the trigger runs `f` and
/// resolves the task with `Ok` or rejects it with `Err`. The trigger can be
/// cloned and called any number of times.
///
/// # Examples
///
/// ```rust
/// use forked::emitter;
///
/// let (parsed, on_input) = emitter(|raw: &str| raw.parse::<u8>().map_err(|e| e.to_string()));
///
/// on_input("7");
///
/// parsed.fork(|e| panic!("{e}"), |n| assert_eq!(n, 7));
/// ```
pub fn emitter<A, E, S, F>(f: F) -> (ExternalTask<E, S>, impl Fn(A) + Clone + 'static)
where
    E: Clone + 'static,
    S: Clone + 'static,
    A: 'static,
    F: Fn(A) -> Result<S, E> + 'static,
{
    let external = ExternalTask::new();
    let f = Rc::new(f);

    let trigger = {
        let external = external.clone();
        move |args: A| match f(args) {
            Ok(value) => external.resolve(value),
            Err(error) => external.reject(error),
        }
    };

    (external, trigger)
}
