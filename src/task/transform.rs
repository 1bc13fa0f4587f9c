use super::{IntoTask, Task};
use crate::fork::{CancelHandle, Settle};

use std::rc::Rc;

impl<E: 'static, S: 'static> Task<E, S> {
    /// Transforms the success value.
    pub fn map<S2, F>(&self, f: F) -> Task<E, S2>
    where
        S2: 'static,
        F: Fn(S) -> S2 + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<E, S2>| {
            let f = f.clone();
            let resolve = settle.clone();
            task.fork(settle.rejecter(), move |value| resolve.resolve(f(value)))
        })
    }

    /// Transforms the error.
    pub fn map_err<E2, F>(&self, f: F) -> Task<E2, S>
    where
        E2: 'static,
        F: Fn(E) -> E2 + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<E2, S>| {
            let f = f.clone();
            let reject = settle.clone();
            task.fork(move |error| reject.reject(f(error)), settle.resolver())
        })
    }

    /// Transforms both channels at once.
    pub fn map_both<E2, S2, FE, FS>(&self, on_error: FE, on_value: FS) -> Task<E2, S2>
    where
        E2: 'static,
        S2: 'static,
        FE: Fn(E) -> E2 + 'static,
        FS: Fn(S) -> S2 + 'static,
    {
        self.map(on_value).map_err(on_error)
    }

    /// Collapses both channels into a success.
    ///
    /// The resulting task never rejects, so its error type is free.
    pub fn fold<E2, R, FE, FS>(&self, on_error: FE, on_value: FS) -> Task<E2, R>
    where
        E2: 'static,
        R: 'static,
        FE: Fn(E) -> R + 'static,
        FS: Fn(S) -> R + 'static,
    {
        let task = self.clone();
        let on_error = Rc::new(on_error);
        let on_value = Rc::new(on_value);

        Task::new(move |settle: Settle<E2, R>| {
            let (on_error, on_value) = (on_error.clone(), on_value.clone());
            let (failed, succeeded) = (settle.clone(), settle);
            task.fork(
                move |error| failed.resolve(on_error(error)),
                move |value| succeeded.resolve(on_value(value)),
            )
        })
    }

    /// Exchanges the two channels.
    pub fn swap(&self) -> Task<S, E> {
        let task = self.clone();

        Task::new(move |settle: Settle<S, E>| task.fork(settle.resolver(), settle.rejecter()))
    }

    /// Chains a dependent computation on success.
    ///
    /// `f` may return a [`Task`] or anything else implementing [`IntoTask`].
    /// Cancelling the fork cancels whichever of the two is running.
    pub fn and_then<T, F>(&self, f: F) -> Task<E, T::Output>
    where
        T: IntoTask<Error = E>,
        T::Output: 'static,
        F: Fn(S) -> T + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<E, T::Output>| {
            let f = f.clone();
            let next = settle.clone();
            task.fork(settle.rejecter(), move |value| {
                f(value).into_task().fork_into(&next);
            })
        })
    }

    /// Recovers from failure with another computation.
    ///
    /// Successes pass through untouched.
    pub fn or_else<T, F>(&self, f: F) -> Task<T::Error, S>
    where
        T: IntoTask<Output = S>,
        T::Error: 'static,
        F: Fn(E) -> T + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<T::Error, S>| {
            let f = f.clone();
            let recover = settle.clone();
            task.fork(
                move |error| {
                    f(error).into_task().fork_into(&recover);
                },
                settle.resolver(),
            )
        })
    }

    /// Runs `f` on the success value for its side effect.
    pub fn tap<F>(&self, f: F) -> Task<E, S>
    where
        F: Fn(&S) + 'static,
    {
        self.map(move |value| {
            f(&value);
            value
        })
    }

    /// Runs a side computation on success, then resolves with the original
    /// value.
    ///
    /// A failing side computation fails the whole task.
    pub fn tap_chain<T, F>(&self, f: F) -> Task<E, S>
    where
        T: IntoTask<Error = E>,
        T::Output: 'static,
        F: Fn(&S) -> T + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<E, S>| {
            let f = f.clone();
            let outer = settle.clone();
            task.fork(settle.rejecter(), move |value| {
                let side = f(&value).into_task();
                let resolve = outer.clone();
                let child = side.fork(outer.rejecter(), move |_| resolve.resolve(value));
                outer.link(child);
            })
        })
    }

    /// Checks the success value, possibly turning it into a failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use forked::Task;
    ///
    /// let port = Task::<String, _>::succeed("8080")
    ///     .validate(|raw| raw.parse::<u16>().map_err(|e| e.to_string()));
    ///
    /// port.fork(|e| panic!("{e}"), |p| assert_eq!(p, 8080));
    /// ```
    pub fn validate<S2, E2, F>(&self, f: F) -> Task<E, S2>
    where
        S2: 'static,
        E2: Into<E>,
        F: Fn(S) -> Result<S2, E2> + 'static,
    {
        let task = self.clone();
        let f = Rc::new(f);

        Task::new(move |settle: Settle<E, S2>| {
            let f = f.clone();
            let check = settle.clone();
            task.fork(settle.rejecter(), move |value| {
                check.complete(f(value).map_err(Into::into))
            })
        })
    }

    /// Fails with `to_error(value)` when `predicate` holds.
    pub fn fail_if<P, F>(&self, predicate: P, to_error: F) -> Task<E, S>
    where
        P: Fn(&S) -> bool + 'static,
        F: Fn(S) -> E + 'static,
    {
        self.validate(move |value| {
            if predicate(&value) {
                Err(to_error(value))
            } else {
                Ok(value)
            }
        })
    }

    /// Short-circuits with the value returned by `check`, if any.
    ///
    /// `check` runs on every fork before the task itself. When it yields a
    /// value the task is never started.
    pub fn succeed_if<F>(&self, check: F) -> Task<E, S>
    where
        F: Fn() -> Option<S> + 'static,
    {
        let task = self.clone();

        Task::new(move |settle: Settle<E, S>| match check() {
            Some(value) => {
                settle.resolve(value);
                CancelHandle::noop()
            }
            None => task.fork(settle.rejecter(), settle.resolver()),
        })
    }

    /// Replaces the success value with `value`.
    pub fn forward<V>(&self, value: V) -> Task<E, V>
    where
        V: Clone + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Pairs the success value with `extra`, on the right.
    pub fn append<A>(&self, extra: A) -> Task<E, (S, A)>
    where
        A: Clone + 'static,
    {
        self.map(move |value| (value, extra.clone()))
    }

    /// Pairs the success value with `extra`, on the left.
    pub fn prepend<A>(&self, extra: A) -> Task<E, (A, S)>
    where
        A: Clone + 'static,
    {
        self.map(move |value| (extra.clone(), value))
    }
}

impl<E: 'static, S: 'static> Task<E, Task<E, S>> {
    /// Removes one level of nesting.
    pub fn flatten(&self) -> Task<E, S> {
        self.and_then(|inner| inner)
    }
}
