use super::Promise;
use crate::task::{IntoTask, Task};

use std::future::IntoFuture;

/// A promise, or a value standing in for an already-resolved one.
///
/// Accepted by [`Task::from_promise`] and [`Task::from_lazy_promise`]. A
/// bare [`Promise`] converts with `into`; plain values are wrapped in
/// [`MaybePromise::Value`].
#[derive(Debug)]
pub enum MaybePromise<E, S> {
    Value(S),
    Promise(Promise<E, S>),
}

impl<E, S> From<Promise<E, S>> for MaybePromise<E, S> {
    fn from(promise: Promise<E, S>) -> Self {
        Self::Promise(promise)
    }
}

impl<E: Clone + 'static, S: Clone + 'static> IntoTask for Promise<E, S> {
    type Error = E;
    type Output = S;

    fn into_task(self) -> Task<E, S> {
        Task::from_promise(self)
    }
}

impl<E: Clone + 'static, S: Clone + 'static> Task<E, S> {
    /// Forks the task once and exposes its outcome as a [`Promise`].
    ///
    /// The fork starts immediately and is never cancelled.
    pub fn to_promise(&self) -> Promise<E, S> {
        let (promise, resolver) = Promise::new();
        let rejecter = resolver.clone();

        self.fork(move |error| rejecter.reject(error), move |value| resolver.resolve(value));

        promise
    }
}

/// Awaiting a task forks it.
///
/// ```rust
/// use forked::Task;
///
/// let answer = futures::executor::block_on(async { Task::<(), _>::succeed(42).await });
///
/// assert_eq!(answer, Ok(42));
/// ```
impl<E: Clone + 'static, S: Clone + 'static> IntoFuture for Task<E, S> {
    type Output = Result<S, E>;
    type IntoFuture = Promise<E, S>;

    fn into_future(self) -> Promise<E, S> {
        self.to_promise()
    }
}
