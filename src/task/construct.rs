use super::Task;
use crate::fork::{CancelHandle, Settle};
use crate::promise::MaybePromise;
use crate::time;

use std::rc::Rc;
use std::time::Duration;

impl<E: 'static, S: 'static> Task<E, S> {
    /// A task that resolves with `value` as soon as it is forked.
    pub fn succeed(value: S) -> Self
    where
        S: Clone,
    {
        Task::new(move |settle| {
            settle.resolve(value.clone());
            CancelHandle::noop()
        })
    }

    /// A task that rejects with `error` as soon as it is forked.
    pub fn fail(error: E) -> Self
    where
        E: Clone,
    {
        Task::new(move |settle| {
            settle.reject(error.clone());
            CancelHandle::noop()
        })
    }

    /// Resolves with `value` once `delay` has elapsed.
    ///
    /// Cancelling the fork cancels the timer.
    pub fn succeed_in(delay: Duration, value: S) -> Self
    where
        S: Clone,
    {
        Task::new(move |settle: Settle<E, S>| {
            let value = value.clone();
            let timer = time::set_timeout(delay, move || settle.resolve(value));
            CancelHandle::from_fn(move || timer.cancel())
        })
    }

    /// Rejects with `error` once `delay` has elapsed.
    pub fn fail_in(delay: Duration, error: E) -> Self
    where
        E: Clone,
    {
        Task::new(move |settle: Settle<E, S>| {
            let error = error.clone();
            let timer = time::set_timeout(delay, move || settle.reject(error));
            CancelHandle::from_fn(move || timer.cancel())
        })
    }

    /// Runs `thunk` on every fork and settles with its result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::Task;
    ///
    /// let parse = Task::succeed_by(|| "42".parse::<u32>());
    ///
    /// parse.fork(|e| panic!("{e}"), |n| assert_eq!(n, 42));
    /// ```
    pub fn succeed_by<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<S, E> + 'static,
    {
        Task::new(move |settle| {
            settle.complete(thunk());
            CancelHandle::noop()
        })
    }

    /// A task that never settles.
    pub fn never() -> Self {
        Task::new(|_| CancelHandle::noop())
    }

    /// Wraps an eager promise, or a plain value.
    ///
    /// The promise has already started; forking only attaches a
    /// continuation, and cancelling the fork detaches it again.
    pub fn from_promise(promise: impl Into<MaybePromise<E, S>>) -> Self
    where
        E: Clone,
        S: Clone,
    {
        match promise.into() {
            MaybePromise::Value(value) => Task::succeed(value),
            MaybePromise::Promise(promise) => Task::new(move |settle: Settle<E, S>| {
                match promise.subscribe(settle.rejecter(), settle.resolver()) {
                    Some(key) => {
                        let promise = promise.clone();
                        CancelHandle::from_fn(move || promise.unsubscribe(key))
                    }
                    None => CancelHandle::noop(),
                }
            }),
        }
    }

    /// Calls `factory` on every fork and adapts what it returns.
    ///
    /// Unlike [`from_promise`](Self::from_promise), nothing starts before
    /// the task is forked.
    pub fn from_lazy_promise<F, P>(factory: F) -> Self
    where
        F: Fn() -> P + 'static,
        P: Into<MaybePromise<E, S>>,
        E: Clone,
        S: Clone,
    {
        Task::new(move |settle| {
            let task = Task::from_promise(factory());
            task.fork(settle.rejecter(), settle.resolver())
        })
    }
}

impl<E: Clone + 'static, S: Clone + 'static> Task<E, S> {
    /// Turns a promise-returning function into a task-returning one.
    ///
    /// Each task built by the returned function calls `creator` with its
    /// arguments when forked, as [`from_lazy_promise`](Self::from_lazy_promise)
    /// does.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::{Promise, Task};
    ///
    /// let lookup = Task::wrap_promise_creator(|(name, id): (&str, u32)| {
    ///     Promise::<(), String>::resolved(format!("{name}#{id}"))
    /// });
    ///
    /// lookup(("user", 7)).fork(|_| {}, |v| assert_eq!(v, "user#7"));
    /// ```
    pub fn wrap_promise_creator<A, F, P>(creator: F) -> impl Fn(A) -> Task<E, S>
    where
        A: Clone + 'static,
        F: Fn(A) -> P + 'static,
        P: Into<MaybePromise<E, S>>,
    {
        let creator = Rc::new(creator);

        move |args: A| {
            let creator = creator.clone();
            Task::from_lazy_promise(move || creator(args.clone()))
        }
    }
}

impl<E: 'static> Task<E, ()> {
    /// A task that resolves with `()` as soon as it is forked.
    pub fn empty() -> Self {
        Task::succeed(())
    }
}
